// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-period event source.

use super::{epoch_ms, DaemonEvent, EventSource};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct IntervalSource {
    id: String,
    every: Duration,
}

impl IntervalSource {
    pub fn new(id: impl Into<String>, every: Duration) -> Self {
        Self { id: id.into(), every }
    }
}

#[async_trait]
impl EventSource for IntervalSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(self.every);
        // The immediate first tick would fire the trigger at startup
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.cancelled() => return,
            }
            let payload = serde_json::json!({
                "kind": "interval",
                "every_ms": self.every.as_millis() as u64,
            });
            let event = DaemonEvent::new(self.id.clone(), payload, epoch_ms());
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}
