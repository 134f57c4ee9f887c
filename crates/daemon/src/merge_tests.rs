// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sources::{DaemonEvent, EventSource};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Source that emits a fixed list of payload numbers, then ends.
struct ListSource {
    id: String,
    values: Vec<u64>,
}

#[async_trait]
impl EventSource for ListSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(
        self: Box<Self>,
        tx: mpsc::Sender<DaemonEvent>,
        _stop: CancellationToken,
    ) {
        for value in &self.values {
            let event =
                DaemonEvent::new(self.id.clone(), serde_json::json!({ "n": value }), *value);
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

/// Source that never emits until stopped.
struct SilentSource {
    id: String,
}

#[async_trait]
impl EventSource for SilentSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(
        self: Box<Self>,
        _tx: mpsc::Sender<DaemonEvent>,
        stop: CancellationToken,
    ) {
        stop.cancelled().await;
    }
}

#[tokio::test]
async fn merges_in_arrival_order_per_source() {
    let sources: Vec<Box<dyn EventSource>> = vec![Box::new(ListSource {
        id: "a".to_string(),
        values: vec![1, 2, 3],
    })];
    let mut merged = merge_event_sources(sources, 100, CancellationToken::new());

    let mut got = Vec::new();
    while let Some(event) = merged.recv().await {
        got.push(event.timestamp_ms);
    }
    assert_eq!(got, vec![1, 2, 3]);
}

#[tokio::test]
async fn stream_ends_only_when_all_sources_end() {
    let stop = CancellationToken::new();
    let sources: Vec<Box<dyn EventSource>> = vec![
        Box::new(ListSource { id: "a".to_string(), values: vec![1] }),
        Box::new(SilentSource { id: "b".to_string() }),
    ];
    let mut merged = merge_event_sources(sources, 100, stop.clone());

    assert!(merged.recv().await.is_some());

    // The silent source is still live: recv must block, not end
    let pending = tokio::time::timeout(std::time::Duration::from_millis(100), merged.recv()).await;
    assert!(pending.is_err(), "stream ended while a source was live");

    // Stopping the silent source ends the stream
    stop.cancel();
    let end = tokio::time::timeout(std::time::Duration::from_secs(2), merged.recv())
        .await
        .expect("stream should end after all sources end");
    assert!(end.is_none());
}

#[tokio::test]
async fn overflow_drops_oldest() {
    let sources: Vec<Box<dyn EventSource>> = vec![Box::new(ListSource {
        id: "a".to_string(),
        values: (1..=10).collect(),
    })];
    let mut merged = merge_event_sources(sources, 3, CancellationToken::new());

    // Give the source time to overrun the bound
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let mut got = Vec::new();
    while let Some(event) = merged.recv().await {
        got.push(event.timestamp_ms);
    }
    // Oldest entries were dropped; the newest survive in order
    assert_eq!(got, vec![8, 9, 10]);
    assert!(merged.pending() == 0);
}

#[tokio::test]
async fn events_from_multiple_sources_all_arrive() {
    let sources: Vec<Box<dyn EventSource>> = vec![
        Box::new(ListSource { id: "a".to_string(), values: vec![1, 2] }),
        Box::new(ListSource { id: "b".to_string(), values: vec![3, 4] }),
    ];
    let mut merged = merge_event_sources(sources, 100, CancellationToken::new());

    let mut per_source: std::collections::HashMap<String, Vec<u64>> = Default::default();
    while let Some(event) = merged.recv().await {
        per_source.entry(event.source_id.clone()).or_default().push(event.timestamp_ms);
    }
    // Source-order is preserved within each source
    assert_eq!(per_source["a"], vec![1, 2]);
    assert_eq!(per_source["b"], vec![3, 4]);
}
