// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-trigger persisted state and execution history records.

use crate::step::WorkflowStatus;
use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// Persisted per-trigger state, owned exclusively by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fired_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until_ms: Option<u64>,
    #[serde(default)]
    pub execution_count: u64,
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl Default for TriggerState {
    fn default() -> Self {
        Self {
            enabled: true,
            last_fired_at_ms: None,
            cooldown_until_ms: None,
            execution_count: 0,
            consecutive_failures: 0,
        }
    }
}

impl TriggerState {
    /// Whether the trigger may fire at `now_ms` (enabled and out of cooldown).
    pub fn may_fire(&self, now_ms: u64) -> bool {
        self.enabled && self.cooldown_until_ms.map_or(true, |until| now_ms >= until)
    }
}

/// One completed workflow execution, stored under
/// `<state>/triggers/<id>/history/<completed_at>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub trigger_id: String,
    pub started_at_ms: u64,
    pub completed_at_ms: u64,
    pub status: WorkflowStatus,
    pub workflow_id: String,
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
