// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::AnalyzerConfig;
use roboppi_adapters::{FakeStepRunner, ScriptedOutcome};
use roboppi_core::{WorkflowState, WorkflowStatus};
use roboppi_engine::ContextError;
use tokio_util::sync::CancellationToken;

fn finished_state() -> WorkflowState {
    let mut state = WorkflowState::new("build", 100);
    state.status = WorkflowStatus::Succeeded;
    state.finished_at_ms = Some(200);
    state
}

fn config(outputs: Vec<&str>) -> AnalyzerConfig {
    AnalyzerConfig {
        worker: roboppi_core::WorkerKind::Custom,
        instructions: "Status was ${workflow_status}".to_string(),
        outputs: outputs.into_iter().map(String::from).collect(),
        timeout: None,
    }
}

#[tokio::test]
async fn analyzer_fills_declared_outputs() {
    let workspace = tempfile::tempdir().unwrap();
    let context = tempfile::tempdir().unwrap();
    let runner = FakeStepRunner::new();
    runner.enqueue("t1#analyze", ScriptedOutcome::success("analysis notes"));

    analyze_result(
        &runner,
        &config(vec!["notes.md"]),
        "t1",
        &finished_state(),
        workspace.path(),
        context.path(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let body = std::fs::read_to_string(workspace.path().join("notes.md")).unwrap();
    assert_eq!(body, "analysis notes");
}

#[tokio::test]
async fn analyzer_instructions_see_workflow_vars() {
    let workspace = tempfile::tempdir().unwrap();
    let context = tempfile::tempdir().unwrap();
    let runner = FakeStepRunner::new();

    analyze_result(
        &runner,
        &config(vec![]),
        "t1",
        &finished_state(),
        workspace.path(),
        context.path(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let requests = runner.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].instructions, "Status was succeeded");
}

#[tokio::test]
async fn analyzer_does_not_clobber_worker_files() {
    let workspace = tempfile::tempdir().unwrap();
    let context = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("notes.md"), "worker made this").unwrap();
    let runner = FakeStepRunner::new();
    runner.enqueue("t1#analyze", ScriptedOutcome::success("overwrite attempt"));

    analyze_result(
        &runner,
        &config(vec!["notes.md"]),
        "t1",
        &finished_state(),
        workspace.path(),
        context.path(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let body = std::fs::read_to_string(workspace.path().join("notes.md")).unwrap();
    assert_eq!(body, "worker made this");
}

#[tokio::test]
async fn escaping_output_is_a_hard_error() {
    let workspace = tempfile::tempdir().unwrap();
    let context = tempfile::tempdir().unwrap();
    let runner = FakeStepRunner::new();
    runner.enqueue("t1#analyze", ScriptedOutcome::success("payload"));

    let err = analyze_result(
        &runner,
        &config(vec!["../outside.md"]),
        "t1",
        &finished_state(),
        workspace.path(),
        context.path(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ContextError::PathEscape(_)));
}

#[tokio::test]
async fn failed_analyzer_is_swallowed() {
    let workspace = tempfile::tempdir().unwrap();
    let context = tempfile::tempdir().unwrap();
    let runner = FakeStepRunner::new();
    runner.enqueue(
        "t1#analyze",
        ScriptedOutcome::failure(roboppi_core::ErrorClass::NonRetryable),
    );

    // The daemon must not error out on a broken analyzer
    analyze_result(
        &runner,
        &config(vec!["notes.md"]),
        "t1",
        &finished_state(),
        workspace.path(),
        context.path(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(!workspace.path().join("notes.md").exists());
}
