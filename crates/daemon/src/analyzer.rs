// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-workflow result analyzer.
//!
//! A second worker invocation observes the finished workflow (steps as
//! JSON) and may produce declared output files. Files the worker already
//! created are left alone; paths escaping the workspace are a hard error.

use crate::config::AnalyzerConfig;
use roboppi_adapters::{StepRunRequest, StepRunner};
use roboppi_core::{OutputMode, WorkflowState};
use roboppi_engine::{fill_outputs, ContextError};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ANALYZER_TIMEOUT: Duration = Duration::from_secs(120);

/// Run the analyzer for one finished workflow.
pub async fn analyze_result(
    runner: &dyn StepRunner,
    config: &AnalyzerConfig,
    trigger_id: &str,
    state: &WorkflowState,
    workspace_dir: &Path,
    context_dir: &Path,
    cancel: &CancellationToken,
) -> Result<(), ContextError> {
    let steps_json =
        serde_json::to_string(&state.steps).unwrap_or_else(|_| "{}".to_string());
    let vars = HashMap::from([
        ("workflow_status".to_string(), state.status.to_string()),
        ("steps".to_string(), steps_json),
        ("workspace".to_string(), workspace_dir.display().to_string()),
        ("context_dir".to_string(), context_dir.display().to_string()),
        ("trigger_id".to_string(), trigger_id.to_string()),
    ]);
    let instructions = roboppi_workflow::expand(&config.instructions, &vars);

    let request = StepRunRequest::new(
        format!("{trigger_id}#analyze"),
        config.worker,
        instructions,
        workspace_dir,
    )
    .mode(OutputMode::Analyze)
    .timeout(config.timeout.unwrap_or(ANALYZER_TIMEOUT));

    let result = runner.run_step(request, cancel, None).await;
    if !result.succeeded() {
        tracing::warn!(
            trigger = %trigger_id,
            error = result.error.as_deref().unwrap_or("unknown"),
            "result analyzer failed"
        );
        return Ok(());
    }

    // Declared outputs the analyzer did not create are filled from stdout;
    // escapes are hard errors.
    fill_outputs(workspace_dir, &config.outputs, &result.stdout)
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
