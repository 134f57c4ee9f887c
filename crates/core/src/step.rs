// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step and workflow state machines.
//!
//! The workflow executor exclusively owns all step state for its run; these
//! types are plain data so they can cross the telemetry sink and the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a single step in the workflow DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Created when the workflow loads; dependencies not yet satisfied
    Pending,
    /// Every dependency succeeded; awaiting dispatch
    Ready,
    /// Worker attempt in flight
    Running,
    /// Completion check in flight
    Checking,
    Succeeded,
    Failed,
    /// Iterations exhausted without the completion check passing
    Incomplete,
    /// A transitive dependency failed or was cancelled under an abort policy
    Skipped,
    /// Workflow abort reached this step
    Cancelled,
}

impl StepStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded
                | StepStatus::Failed
                | StepStatus::Incomplete
                | StepStatus::Skipped
                | StepStatus::Cancelled
        )
    }
}

crate::simple_display! {
    StepStatus {
        Pending => "pending",
        Ready => "ready",
        Running => "running",
        Checking => "checking",
        Succeeded => "succeeded",
        Failed => "failed",
        Incomplete => "incomplete",
        Skipped => "skipped",
        Cancelled => "cancelled",
    }
}

/// Mutable per-step execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub status: StepStatus,
    /// Completed worker iterations (0 until the first re-dispatch)
    pub iteration: u32,
    pub max_iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_stall_count: Option<u32>,
    /// Failed attempts consumed by the retry loop (not iterations)
    #[serde(default)]
    pub attempt: u32,
    /// Consecutive completion-check infrastructure failures
    #[serde(default)]
    pub completion_infra_failures: u32,
}

impl StepState {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            status: StepStatus::Pending,
            iteration: 0,
            max_iterations: max_iterations.max(1),
            started_at_ms: None,
            completed_at_ms: None,
            error: None,
            convergence_stage: None,
            convergence_stall_count: None,
            attempt: 0,
            completion_infra_failures: 0,
        }
    }
}

/// Overall workflow outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Running)
    }
}

crate::simple_display! {
    WorkflowStatus {
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        TimedOut => "timed_out",
        Cancelled => "cancelled",
    }
}

/// Snapshot of a workflow run: overall status plus per-step state.
///
/// Steps are keyed by step ID in a `BTreeMap` so iteration order is
/// deterministic (lexicographic), matching dispatch tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow: String,
    pub status: WorkflowStatus,
    pub steps: BTreeMap<String, StepState>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

impl WorkflowState {
    pub fn new(workflow: impl Into<String>, started_at_ms: u64) -> Self {
        Self {
            workflow: workflow.into(),
            status: WorkflowStatus::Running,
            steps: BTreeMap::new(),
            started_at_ms,
            finished_at_ms: None,
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
