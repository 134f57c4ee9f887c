// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{EvaluateConfig, SourceConfig, TriggerConfig};
use crate::sources::DaemonEvent;
use roboppi_adapters::{FakeStepRunner, ScriptedOutcome, StepRunner};
use roboppi_core::{FakeClock, TriggerState, WorkerKind, WorkflowStatus};
use roboppi_store::TriggerStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Fixture {
    dispatcher: Dispatcher<FakeClock>,
    runner: Arc<FakeStepRunner>,
    store: Arc<TriggerStore>,
    clock: FakeClock,
    _state: tempfile::TempDir,
    _workspace: tempfile::TempDir,
}

const WORKFLOW: &str = r#"
name: tiny
timeout: 1m
steps:
  only:
    worker: CUSTOM
    instructions: "do it"
"#;

fn fixture(mutate: impl FnOnce(&mut TriggerConfig)) -> Fixture {
    let state = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let workflow_path = workspace.path().join("wf.yaml");
    std::fs::write(&workflow_path, WORKFLOW).unwrap();

    let mut trigger = TriggerConfig {
        id: "t1".to_string(),
        enabled: true,
        source: SourceConfig::Command {},
        workflow: workflow_path,
        workspace: workspace.path().to_path_buf(),
        evaluate: None,
        cooldown: None,
        env: Default::default(),
        analyzer: None,
        agents: None,
    };
    mutate(&mut trigger);

    let runner = Arc::new(FakeStepRunner::new());
    let store = Arc::new(TriggerStore::new(state.path()));
    let clock = FakeClock::new();
    let dispatcher = Dispatcher::new(
        runner.clone() as Arc<dyn StepRunner>,
        runner.clone() as Arc<dyn StepRunner>,
        Arc::clone(&store),
        vec![trigger],
        clock.clone(),
    );
    Fixture { dispatcher, runner, store, clock, _state: state, _workspace: workspace }
}

fn event() -> DaemonEvent {
    DaemonEvent::new("t1", serde_json::json!({"kind": "manual"}), 42)
}

#[tokio::test]
async fn accepted_event_runs_and_records() {
    let f = fixture(|_| {});
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;

    // The workflow step ran
    assert_eq!(f.runner.request_count("only"), 1);

    // Trigger state advanced
    let state = f.store.load_state("t1").unwrap();
    assert_eq!(state.execution_count, 1);
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_fired_at_ms.is_some());

    // One history record with the outcome
    let history = f.store.list_history("t1").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, WorkflowStatus::Succeeded);
    assert_eq!(history[0].workflow_id, "tiny");

    // Last result is readable for the next firing
    let last: serde_json::Value = f.store.load_last_result("t1").unwrap().unwrap();
    assert_eq!(last["status"], "succeeded");
}

#[tokio::test]
async fn disabled_trigger_is_skipped() {
    let f = fixture(|_| {});
    let mut state = TriggerState::default();
    state.enabled = false;
    f.store.save_state("t1", &state).unwrap();

    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("only"), 0);
}

#[tokio::test]
async fn cooldown_blocks_until_elapsed() {
    let f = fixture(|_| {});
    let now = f.clock.epoch_ms();
    let state = TriggerState { cooldown_until_ms: Some(now + 60_000), ..Default::default() };
    f.store.save_state("t1", &state).unwrap();

    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("only"), 0);

    // Past the cooldown the trigger fires
    f.clock.advance(std::time::Duration::from_secs(61));
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("only"), 1);
}

#[tokio::test]
async fn gate_skip_prevents_execution() {
    let f = fixture(|t| {
        t.evaluate = Some(EvaluateConfig {
            worker: WorkerKind::Custom,
            instructions: "check".to_string(),
            timeout: None,
        });
    });
    f.runner.enqueue(
        "t1#evaluate",
        ScriptedOutcome::failure(roboppi_core::ErrorClass::NonRetryable),
    );

    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("t1#evaluate"), 1);
    assert_eq!(f.runner.request_count("only"), 0);
}

#[tokio::test]
async fn gate_accept_runs_the_workflow() {
    let f = fixture(|t| {
        t.evaluate = Some(EvaluateConfig {
            worker: WorkerKind::Custom,
            instructions: "check".to_string(),
            timeout: None,
        });
    });
    // Custom gate: exit 0 means run (scripted success)
    f.runner.enqueue("t1#evaluate", ScriptedOutcome::success(""));

    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("only"), 1);
}

#[tokio::test]
async fn cooldown_is_applied_after_a_run() {
    let f = fixture(|t| {
        t.cooldown = Some(std::time::Duration::from_secs(300));
    });
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;

    let state = f.store.load_state("t1").unwrap();
    let until = state.cooldown_until_ms.unwrap();
    assert!(until > f.clock.epoch_ms());

    // A second event during cooldown is ignored
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    assert_eq!(f.runner.request_count("only"), 1);
}

#[tokio::test]
async fn failed_workflow_bumps_consecutive_failures() {
    let f = fixture(|_| {});
    f.runner
        .enqueue("only", ScriptedOutcome::failure(roboppi_core::ErrorClass::NonRetryable));
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;

    let state = f.store.load_state("t1").unwrap();
    assert_eq!(state.consecutive_failures, 1);
    let history = f.store.list_history("t1").unwrap();
    assert_eq!(history[0].status, WorkflowStatus::Failed);

    // A later success resets the counter
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;
    let state = f.store.load_state("t1").unwrap();
    assert_eq!(state.consecutive_failures, 0);
}

#[tokio::test]
async fn context_artifacts_are_written() {
    let f = fixture(|t| {
        t.env.insert("CI".to_string(), "1".to_string());
    });
    f.dispatcher.handle_event(event(), &CancellationToken::new()).await;

    let context_dir = f.store.state_dir().join("triggers/t1/context");
    let event_doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(context_dir.join("event.json")).unwrap())
            .unwrap();
    assert_eq!(event_doc["kind"], "manual");
    assert!(context_dir.join("env.json").exists());
}

#[tokio::test]
async fn unknown_source_is_ignored() {
    let f = fixture(|_| {});
    let stray = DaemonEvent::new("nobody", serde_json::json!({}), 1);
    f.dispatcher.handle_event(stray, &CancellationToken::new()).await;
    assert!(f.runner.requests.lock().is_empty());
}
