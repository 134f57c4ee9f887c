// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definition schema (v1).

use indexmap::IndexMap;
use roboppi_core::duration::serde_duration;
use roboppi_core::{Capability, WorkerKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default iteration bound when a step declares a completion check but no
/// explicit `max_iterations`.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1;

fn default_version() -> String {
    "1".to_string()
}

/// Failure policy for a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    #[default]
    Retry,
    Continue,
    Abort,
}

/// Policy when the iteration budget is exhausted without convergence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnIterationsExhausted {
    #[default]
    Abort,
    Continue,
}

/// Completion check: the same worker shape plus an optional decision file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionCheckDef {
    #[serde(default)]
    pub worker: Option<WorkerKind>,
    pub instructions: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default, with = "serde_duration::option")]
    pub timeout: Option<Duration>,
    /// Relative path (under the step context dir) the check writes its
    /// verdict to; stdout is the fallback channel.
    #[serde(default)]
    pub decision_file: Option<String>,
}

/// A single step of the DAG.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    #[serde(default)]
    pub worker: Option<WorkerKind>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output declarations: files the step promises to produce, relative to
    /// the workspace.
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, with = "serde_duration::option")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default, with = "serde_duration::option")]
    pub max_command_time: Option<Duration>,
    #[serde(default)]
    pub completion_check: Option<CompletionCheckDef>,
    #[serde(default)]
    pub on_iterations_exhausted: OnIterationsExhausted,
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Reference into the agent catalog; profile fields merge under the
    /// step's own.
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl StepDef {
    /// Effective iteration bound (≥ 1).
    pub fn effective_max_iterations(&self) -> u32 {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS).max(1)
    }
}

/// An immutable, validated workflow definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDef {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    /// Bound on concurrently running steps; absent means unbounded.
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub context_dir: Option<String>,
    /// Step definitions in authored order. Dispatch tie-breaking is
    /// lexicographic over IDs, not authored order.
    pub steps: IndexMap<String, StepDef>,
}

impl WorkflowDef {
    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.get(id)
    }
}

#[cfg(test)]
#[path = "def_tests.rs"]
mod tests;
