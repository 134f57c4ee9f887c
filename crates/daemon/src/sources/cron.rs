// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron event source.
//!
//! Schedule expressions use the 5-field grammar (`min hour dom mon dow`)
//! parsed by `croner`; [`compute_next_fire`] is pure so firing times are
//! testable without a running clock.

use super::{epoch_ms, DaemonEvent, EventSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use croner::Cron;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Parse a 5-field cron expression.
pub fn parse_cron(expr: &str) -> Result<Cron, String> {
    Cron::new(expr)
        .parse()
        .map_err(|e| format!("invalid cron expression {expr:?}: {e}"))
}

/// Next fire time strictly after `now`. Pure: no clock access.
pub fn compute_next_fire(now: DateTime<Utc>, cron: &Cron) -> Option<DateTime<Utc>> {
    cron.find_next_occurrence(&now, false).ok()
}

pub struct CronSource {
    id: String,
    cron: Cron,
    expr: String,
}

impl CronSource {
    pub fn new(id: impl Into<String>, expr: &str) -> Result<Self, String> {
        Ok(Self { id: id.into(), cron: parse_cron(expr)?, expr: expr.to_string() })
    }
}

#[async_trait]
impl EventSource for CronSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken) {
        loop {
            let now = Utc::now();
            let Some(next) = compute_next_fire(now, &self.cron) else {
                tracing::warn!(source = %self.id, expr = %self.expr, "no next cron occurrence");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = stop.cancelled() => return,
            }

            let payload = serde_json::json!({
                "kind": "cron",
                "expr": self.expr,
                "scheduled_for": next.timestamp_millis(),
            });
            let event = DaemonEvent::new(self.id.clone(), payload, epoch_ms());
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
