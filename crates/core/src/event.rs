// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry events emitted by the workflow executor.
//!
//! Serializes with `{"type": "scope:name", ...fields}` format.

use crate::step::{StepState, WorkflowStatus};
use serde::{Deserialize, Serialize};

/// Phase marker for a step's current activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Worker attempt dispatched
    Attempt,
    /// Completion check dispatched
    Check,
    /// Waiting out retry backoff
    Backoff,
    /// Management hook invocation
    Hook,
}

crate::simple_display! {
    StepPhase {
        Attempt => "attempt",
        Check => "check",
        Backoff => "backoff",
        Hook => "hook",
    }
}

/// Events delivered to the telemetry sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "workflow:started")]
    WorkflowStarted { workflow: String, started_at_ms: u64 },

    /// Full step state after a transition.
    #[serde(rename = "step:state")]
    StepState { step_id: String, state: StepState },

    /// A step entered a new activity phase.
    #[serde(rename = "step:phase")]
    StepPhase {
        step_id: String,
        phase: StepPhase,
        iteration: u32,
    },

    #[serde(rename = "workflow:finished")]
    WorkflowFinished {
        workflow: String,
        status: WorkflowStatus,
        finished_at_ms: u64,
    },
}

impl Event {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkflowStarted { .. } => "workflow_started",
            Event::StepState { .. } => "step_state",
            Event::StepPhase { .. } => "step_phase",
            Event::WorkflowFinished { .. } => "workflow_finished",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
