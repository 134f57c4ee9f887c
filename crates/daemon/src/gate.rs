// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The evaluate-gate.
//!
//! Decides per event whether a trigger actually fires. Every failure mode
//! (missing CLI, timeout, unparseable verdict) resolves to skip: a broken
//! gate must never fire workflows.
//!
//! Event context reaches CUSTOM gate commands only through `ROBOPPI_*`
//! environment variables, never by interpolating event data into the shell
//! command.

use crate::config::EvaluateConfig;
use regex::Regex;
use roboppi_adapters::{StepRunRequest, StepRunner};
use roboppi_core::{OutputMode, WorkerKind, WorkerStatus};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default gate timeout.
pub const GATE_TIMEOUT: Duration = Duration::from_secs(30);

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
static RUN_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brun\b").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static SKIP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bskip\b").expect("constant regex pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip,
}

/// Environment exposed to the gate worker.
pub struct GateContext {
    pub event_json: String,
    pub timestamp_ms: u64,
    pub trigger_id: String,
    pub execution_count: u64,
    pub workspace: String,
    pub last_result_json: String,
}

impl GateContext {
    fn to_env(&self) -> HashMap<String, String> {
        HashMap::from([
            ("ROBOPPI_EVENT".to_string(), self.event_json.clone()),
            ("ROBOPPI_TIMESTAMP".to_string(), self.timestamp_ms.to_string()),
            ("ROBOPPI_TRIGGER_ID".to_string(), self.trigger_id.clone()),
            (
                "ROBOPPI_EXECUTION_COUNT".to_string(),
                self.execution_count.to_string(),
            ),
            ("ROBOPPI_WORKSPACE".to_string(), self.workspace.clone()),
            ("ROBOPPI_LAST_RESULT".to_string(), self.last_result_json.clone()),
        ])
    }
}

/// Parse the verdict from an LLM gate's stdout: the last non-empty line,
/// `run` as a whole word means run, `skip` means skip, anything else (or
/// both) skips.
fn parse_llm_verdict(stdout: &str) -> GateDecision {
    let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) else {
        return GateDecision::Skip;
    };
    let has_run = RUN_TOKEN.is_match(line);
    let has_skip = SKIP_TOKEN.is_match(line);
    match (has_run, has_skip) {
        (true, false) => GateDecision::Run,
        _ => GateDecision::Skip,
    }
}

/// Run the evaluate-gate for one event.
pub async fn evaluate_gate(
    runner: &dyn StepRunner,
    config: &EvaluateConfig,
    context: &GateContext,
    workspace_dir: &Path,
    cancel: &CancellationToken,
) -> GateDecision {
    let timeout = config.timeout.unwrap_or(GATE_TIMEOUT);

    let request = StepRunRequest::new(
        format!("{}#evaluate", context.trigger_id),
        config.worker,
        config.instructions.clone(),
        workspace_dir,
    )
    .mode(OutputMode::Analyze)
    .env(context.to_env())
    .timeout(timeout);

    let result = runner.run_step(request, cancel, None).await;

    if result.error.as_deref() == Some("CLI not found") {
        tracing::warn!(trigger = %context.trigger_id, "gate CLI not found, skipping");
        return GateDecision::Skip;
    }
    if result.error.as_deref() == Some("worker timed out") {
        tracing::info!(trigger = %context.trigger_id, "gate timed out, skipping");
        return GateDecision::Skip;
    }

    match config.worker {
        WorkerKind::Custom => {
            // Exit 0 means run, anything else means skip
            if result.status == WorkerStatus::Succeeded {
                GateDecision::Run
            } else {
                GateDecision::Skip
            }
        }
        _ => {
            if result.status != WorkerStatus::Succeeded {
                return GateDecision::Skip;
            }
            parse_llm_verdict(&result.stdout)
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
