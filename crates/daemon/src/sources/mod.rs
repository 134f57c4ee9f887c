// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event sources.
//!
//! A source produces an async stream of [`DaemonEvent`]s until it drains or
//! is stopped. Sources never surface errors to the merge layer: a failing
//! source logs and ends.

mod command;
mod cron;
mod fswatch;
mod interval;
mod webhook;

pub use command::{CommandListener, CommandMessage, CommandSource};
pub use cron::{compute_next_fire, parse_cron, CronSource};
pub use fswatch::{glob_match, FsWatchSource};
pub use interval::IntervalSource;
pub use webhook::{WebhookServer, WebhookSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One event, in arrival order at the merge point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonEvent {
    /// ID of the producing source (the trigger ID).
    pub source_id: String,
    pub payload: serde_json::Value,
    pub timestamp_ms: u64,
}

impl DaemonEvent {
    pub fn new(source_id: impl Into<String>, payload: serde_json::Value, timestamp_ms: u64) -> Self {
        Self { source_id: source_id.into(), payload, timestamp_ms }
    }
}

/// An async producer of daemon events.
#[async_trait]
pub trait EventSource: Send {
    fn id(&self) -> &str;

    /// Produce events into `tx` until the source drains or `stop` fires.
    /// Returning is the source's end-of-stream signal.
    async fn run(self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken);
}

pub(crate) fn epoch_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
