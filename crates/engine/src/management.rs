// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Management agent loop.
//!
//! Between step phases the executor may invoke a management hook: a worker
//! run whose only output channel is a decision file. Decisions that fail
//! any acceptance rule resolve to the deterministic PROCEED fallback; the
//! workflow never blocks on a broken management channel.

use roboppi_adapters::{StepRunRequest, StepRunner};
use roboppi_core::{
    DecisionSource, ManagementDecision, RawManagementDecision, WorkerKind, WorkerStatus,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Decision files older than the hook start (minus this slack) are stale.
const MTIME_SLACK_MS: u64 = 2000;

/// Where in the step lifecycle a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    PreStep,
    PostStep,
    OnStall,
}

roboppi_core::simple_display! {
    HookPoint {
        PreStep => "pre_step",
        PostStep => "post_step",
        OnStall => "on_stall",
    }
}

/// Hook configuration carried by the executor.
#[derive(Debug, Clone)]
pub struct ManagementConfig {
    pub worker: WorkerKind,
    pub instructions: String,
    pub timeout: Duration,
    pub hooks: Vec<HookPoint>,
}

impl ManagementConfig {
    pub fn enabled_for(&self, hook: HookPoint) -> bool {
        self.hooks.contains(&hook)
    }
}

#[derive(Serialize)]
struct HookInput<'a> {
    hook_id: &'a str,
    hook: HookPoint,
    step_id: &'a str,
    step_status: &'a str,
    iteration: u32,
}

/// Run one hook invocation and resolve its decision.
///
/// Worker timeout and abort both resolve to the PROCEED fallback; the
/// decision file is consulted only after the worker settles.
#[allow(clippy::too_many_arguments)]
pub async fn invoke_hook(
    runner: &dyn StepRunner,
    config: &ManagementConfig,
    hook: HookPoint,
    step_id: &str,
    step_status: &str,
    iteration: u32,
    context_dir: &Path,
    workspace_dir: &Path,
    cancel: &CancellationToken,
    now_ms: u64,
) -> ManagementDecision {
    let hook_id = uuid::Uuid::new_v4().to_string();
    let inv_dir = context_dir.join("_management").join("inv").join(&hook_id);
    let input_path = inv_dir.join("input.json");
    let decision_path = inv_dir.join("decision.json");

    let input = HookInput {
        hook_id: &hook_id,
        hook,
        step_id,
        step_status,
        iteration,
    };
    if let Err(e) = roboppi_store::write_json_atomic(&input_path, &input) {
        tracing::warn!(hook = %hook, error = %e, "hook input write failed");
        return ManagementDecision::fallback(DecisionSource::None, "hook input write failed");
    }

    let env = HashMap::from([
        ("ROBOPPI_MANAGEMENT_HOOK_ID".to_string(), hook_id.clone()),
        (
            "ROBOPPI_MANAGEMENT_INPUT_FILE".to_string(),
            input_path.display().to_string(),
        ),
        (
            "ROBOPPI_MANAGEMENT_DECISION_FILE".to_string(),
            decision_path.display().to_string(),
        ),
    ]);

    let request = StepRunRequest::new(
        format!("{step_id}#{hook}"),
        config.worker,
        config.instructions.clone(),
        workspace_dir,
    )
    .env(env)
    .timeout(config.timeout);

    let run = runner.run_step(request, cancel, None).await;
    match run.status {
        WorkerStatus::Cancelled => {
            let reason = if cancel.is_cancelled() { "hook aborted" } else { "hook cancelled" };
            return ManagementDecision::fallback(DecisionSource::Abort, reason);
        }
        WorkerStatus::Failed if run.error.as_deref() == Some("worker timed out") => {
            return ManagementDecision::fallback(DecisionSource::Timeout, "hook timed out");
        }
        _ => {}
    }

    resolve_decision(&decision_path, &hook_id, hook, step_id, now_ms)
}

/// Apply the decision-resolution rules in order; first match wins.
pub fn resolve_decision(
    path: &Path,
    expected_hook_id: &str,
    expected_hook: HookPoint,
    expected_step_id: &str,
    hook_started_at_ms: u64,
) -> ManagementDecision {
    // Rule 1: no file
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => {
            return ManagementDecision::fallback(DecisionSource::None, "decision file not found")
        }
    };

    // Rule 2: not a JSON object
    let raw: RawManagementDecision = match serde_json::from_str(&contents) {
        Ok(raw) => raw,
        Err(_) => {
            return ManagementDecision::fallback(
                DecisionSource::FileJson,
                "decision file is not a JSON object",
            )
        }
    };

    // Rule 3: explicit hook_id must match
    let hook_id_match = match &raw.hook_id {
        Some(hook_id) if hook_id != expected_hook_id => {
            return ManagementDecision::fallback(
                DecisionSource::FileJson,
                "stale decision: hook_id mismatch",
            )
        }
        Some(_) => true,
        None => false,
    };

    // Rule 4: without a hook_id, the file must be fresh
    if !hook_id_match {
        let fresh = file_mtime_ms(path)
            .map(|mtime| mtime + MTIME_SLACK_MS >= hook_started_at_ms)
            .unwrap_or(false);
        if !fresh {
            return ManagementDecision::fallback(DecisionSource::FileJson, "file mtime too old");
        }
    }

    // Rule 5: misattribution
    if let Some(hook) = &raw.hook {
        if hook != &expected_hook.to_string() {
            return ManagementDecision::fallback(DecisionSource::FileJson, "misattribution");
        }
    }
    if let Some(step_id) = &raw.step_id {
        if step_id != expected_step_id {
            return ManagementDecision::fallback(DecisionSource::FileJson, "misattribution");
        }
    }

    // Rule 6: directive shape
    let directive = match raw.validate_directive() {
        Ok(directive) => directive,
        Err(reason) => return ManagementDecision::fallback(DecisionSource::FileJson, reason),
    };

    // Rule 7: accept
    ManagementDecision {
        directive,
        source: DecisionSource::File,
        reason: None,
        reasoning: raw.reasoning,
        confidence: raw.confidence,
        hook_id_match,
    }
}

fn file_mtime_ms(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    Some(since_epoch.as_millis() as u64)
}

/// Invocation directory for a hook, for callers that need the layout.
pub fn invocation_dir(context_dir: &Path, hook_id: &str) -> PathBuf {
    context_dir.join("_management").join("inv").join(hook_id)
}

#[cfg(test)]
#[path = "management_tests.rs"]
mod tests;
