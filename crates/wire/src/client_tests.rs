// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::WireError;
use crate::framing::{encode, LineReader};
use crate::request::Request;
use crate::response::Response;
use roboppi_core::JobId;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Client wired to an in-memory peer. Returns (client, events, peer_reader,
/// peer_writer): what the peer receives and the handle it answers on.
fn harness() -> (
    IpcClient<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
    mpsc::Receiver<IpcEvent>,
    LineReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
    tokio::io::WriteHalf<tokio::io::DuplexStream>,
) {
    let (near, far) = tokio::io::duplex(64 * 1024);
    let (near_read, near_write) = tokio::io::split(near);
    let (far_read, far_write) = tokio::io::split(far);
    let (client, events) = IpcClient::new(near_read, near_write);
    (client, events, LineReader::new(far_read), far_write)
}

#[tokio::test]
async fn call_resolves_on_matching_request_id() {
    let (client, _events, mut peer_rx, mut peer_tx) = harness();

    let peer = tokio::spawn(async move {
        let request: Request = peer_rx.next_message().await.unwrap().unwrap();
        assert_eq!(request.request_id(), "hb-1");
        let ack = Response::HeartbeatAck { request_id: "hb-1".to_string(), sent_at_ms: 9 };
        peer_tx.write_all(&encode(&ack).unwrap()).await.unwrap();
    });

    let response = client
        .call(
            Request::Heartbeat { request_id: "hb-1".to_string(), sent_at_ms: 1 },
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(matches!(response, Response::HeartbeatAck { .. }));
    peer.await.unwrap();
}

#[tokio::test]
async fn call_times_out_without_answer() {
    let (client, _events, _peer_rx, _peer_tx) = harness();
    let err = client
        .call(
            Request::Heartbeat { request_id: "hb-2".to_string(), sent_at_ms: 1 },
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::Timeout));
}

#[tokio::test]
async fn unmatched_responses_are_dropped() {
    let (client, _events, _peer_rx, mut peer_tx) = harness();

    let stray = Response::Ack { request_id: "nobody-asked".to_string() };
    peer_tx.write_all(&encode(&stray).unwrap()).await.unwrap();

    // The stray response must not satisfy a later call with a different ID
    let err = client
        .call(
            Request::Heartbeat { request_id: "hb-3".to_string(), sent_at_ms: 1 },
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::Timeout));
}

#[tokio::test]
async fn completion_routes_by_job_id() {
    let (client, _events, _peer_rx, mut peer_tx) = harness();

    let job_id = JobId::from_string("job-42");
    let watcher = client.watch_job(&job_id);

    let done = Response::JobCancelled { request_id: "old-req".to_string(), job_id };
    peer_tx.write_all(&encode(&done).unwrap()).await.unwrap();

    let settled = watcher.await.unwrap();
    assert!(matches!(settled, Response::JobCancelled { .. }));
}

#[tokio::test]
async fn stop_rejects_pending_calls() {
    let (client, _events, _peer_rx, _peer_tx) = harness();
    let client = std::sync::Arc::new(client);

    let pending = {
        let client = std::sync::Arc::clone(&client);
        tokio::spawn(async move {
            client
                .call(
                    Request::Heartbeat { request_id: "hb-4".to_string(), sent_at_ms: 1 },
                    Duration::from_secs(5),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    client.stop();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, WireError::Stopped));
    assert!(client.is_stopped());

    // New calls fail fast once stopped
    let err = client
        .call(
            Request::Heartbeat { request_id: "hb-5".to_string(), sent_at_ms: 1 },
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::Stopped));
}

#[tokio::test]
async fn peer_disconnect_fails_pending_calls() {
    let (client, _events, peer_rx, peer_tx) = harness();
    let client = std::sync::Arc::new(client);

    let pending = {
        let client = std::sync::Arc::clone(&client);
        tokio::spawn(async move {
            client
                .call(
                    Request::Heartbeat { request_id: "hb-6".to_string(), sent_at_ms: 1 },
                    Duration::from_secs(5),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(peer_rx);
    drop(peer_tx);

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, WireError::Disconnect));
}

#[tokio::test]
async fn escalations_surface_as_events() {
    let (_client, mut events, _peer_rx, mut peer_tx) = harness();

    let escalation = Response::Escalation {
        job_id: JobId::from_string("job-7"),
        reason: "worker wedged".to_string(),
    };
    peer_tx.write_all(&encode(&escalation).unwrap()).await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        IpcEvent::Escalation { job_id: JobId::from_string("job-7"), reason: "worker wedged".to_string() }
    );
}
