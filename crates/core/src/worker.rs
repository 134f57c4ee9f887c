// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker kinds, capabilities, and results.

use serde::{Deserialize, Serialize};

/// Which external worker binary executes a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerKind {
    CodexCli,
    ClaudeCode,
    Opencode,
    Custom,
}

crate::simple_display! {
    WorkerKind {
        CodexCli => "codex_cli",
        ClaudeCode => "claude_code",
        Opencode => "opencode",
        Custom => "custom",
    }
}

/// Capability grants advertised to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Read,
    Edit,
    RunTests,
    RunCommands,
}

/// Whether the worker mutates the workspace or only analyzes it.
///
/// Selects between run and analyze argv shapes for CLIs that distinguish
/// the two (codex, opencode).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    Run,
    Analyze,
}

/// Terminal status of a worker attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    WorkerStatus {
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Failure classification driving the retry loop.
///
/// Only `RETRYABLE_*` classes re-enter the retry loop; `NON_RETRYABLE_*`
/// skip it entirely; `FATAL` aborts the whole workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    RetryableTransient,
    RetryableRateLimit,
    RetryableNetwork,
    RetryableService,
    NonRetryable,
    NonRetryableLint,
    NonRetryableTest,
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClass::RetryableTransient
                | ErrorClass::RetryableRateLimit
                | ErrorClass::RetryableNetwork
                | ErrorClass::RetryableService
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClass::Fatal)
    }
}

crate::simple_display! {
    ErrorClass {
        RetryableTransient => "RETRYABLE_TRANSIENT",
        RetryableRateLimit => "RETRYABLE_RATE_LIMIT",
        RetryableNetwork => "RETRYABLE_NETWORK",
        RetryableService => "RETRYABLE_SERVICE",
        NonRetryable => "NON_RETRYABLE",
        NonRetryableLint => "NON_RETRYABLE_LINT",
        NonRetryableTest => "NON_RETRYABLE_TEST",
        Fatal => "FATAL",
    }
}

/// A file the worker produced or touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Free-form text the adapter extracted from worker output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
}

impl Observation {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Attempt cost accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
    pub wall_time_ms: u64,
}

/// Result of a single worker attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub status: WorkerStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    pub cost: CostInfo,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
}

impl WorkerResult {
    pub fn succeeded(&self) -> bool {
        self.status == WorkerStatus::Succeeded
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
