// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: the unit of work submitted to the scheduler.

use crate::id::JobId;
use crate::worker::{Capability, OutputMode, WorkerKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scheduling class. INTERACTIVE always beats BATCH regardless of the
/// numeric priority value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityClass {
    Interactive,
    Batch,
}

crate::simple_display! {
    PriorityClass {
        Interactive => "interactive",
        Batch => "batch",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub value: i64,
    pub class: PriorityClass,
}

impl Priority {
    pub fn interactive(value: i64) -> Self {
        Self { value, class: PriorityClass::Interactive }
    }

    pub fn batch(value: i64) -> Self {
        Self { value, class: PriorityClass::Batch }
    }
}

/// Policy applied when a submission's dedup key is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DedupPolicy {
    /// Keep the existing job; the new submission attaches to it
    Coalesce,
    /// Replace the existing job; the caller must cancel it
    LatestWins,
    /// Discard the new submission
    Reject,
}

crate::simple_display! {
    DedupPolicy {
        Coalesce => "coalesce",
        LatestWins => "latest_wins",
        Reject => "reject",
    }
}

/// Per-job execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLimits {
    pub timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self { timeout_ms: 600_000, max_attempts: 1 }
    }
}

/// Correlation metadata threaded through logs and the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub correlation_id: String,
}

/// Resource budget for a worker attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBudget {
    /// Epoch ms after which the attempt is cancelled
    pub deadline_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_command_time_ms: Option<u64>,
}

/// A worker-subprocess invocation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTask {
    pub worker_kind: WorkerKind,
    /// Workspace path the lock table keys on
    pub workspace_ref: String,
    pub instructions: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub output_mode: OutputMode,
    pub budget: TaskBudget,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// Payload variants, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    WorkerTask(WorkerTask),
}

impl JobPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::WorkerTask(_) => "worker_task",
        }
    }
}

/// The unit submitted to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub priority: Priority,
    pub payload: JobPayload,
    #[serde(default)]
    pub limits: JobLimits,
    #[serde(default)]
    pub context: JobContext,
}

impl Job {
    pub fn worker_task(&self) -> &WorkerTask {
        match &self.payload {
            JobPayload::WorkerTask(task) => task,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
