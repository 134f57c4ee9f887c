// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core liveness checking.
//!
//! A heartbeat goes out every interval; if no ack has been observed within
//! the unhealthy threshold, the supervisor is told the Core hung.

use roboppi_wire::{IpcClient, Request, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    pub interval: Duration,
    pub unhealthy_threshold: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            unhealthy_threshold: Duration::from_secs(15),
        }
    }
}

/// Probe until the Core hangs or `stop` fires. Returns only on hang
/// detection (`true`) or stop (`false`).
pub async fn health_loop<W>(
    client: Arc<IpcClient<W>>,
    config: HealthConfig,
    stop: CancellationToken,
) -> bool
where
    W: tokio::io::AsyncWrite + Send + Sync + Unpin,
{
    let mut last_ack = Instant::now();
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.cancelled() => return false,
        }

        let request = Request::Heartbeat {
            request_id: uuid::Uuid::new_v4().to_string(),
            sent_at_ms: epoch_ms(),
        };
        match client.call(request, config.interval).await {
            Ok(Response::HeartbeatAck { .. }) => {
                last_ack = Instant::now();
            }
            Ok(other) => {
                tracing::warn!("unexpected heartbeat answer: {other:?}");
            }
            Err(e) => {
                tracing::debug!(error = %e, "heartbeat failed");
            }
        }

        if last_ack.elapsed() > config.unhealthy_threshold {
            tracing::error!(
                silent_for_ms = last_ack.elapsed().as_millis() as u64,
                "core is unresponsive"
            );
            return true;
        }
    }
}

fn epoch_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
