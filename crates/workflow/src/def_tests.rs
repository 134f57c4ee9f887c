// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::WorkerKind;
use std::time::Duration;

const MINIMAL: &str = r#"
name: build
version: "1"
timeout: 30m
steps:
  compile:
    worker: CUSTOM
    instructions: make all
"#;

#[test]
fn parses_minimal_workflow() {
    let def: WorkflowDef = serde_yaml::from_str(MINIMAL).unwrap();
    assert_eq!(def.name, "build");
    assert_eq!(def.version, "1");
    assert_eq!(def.timeout, Duration::from_secs(1800));
    assert_eq!(def.concurrency, None);
    let step = def.step("compile").unwrap();
    assert_eq!(step.worker, Some(WorkerKind::Custom));
    assert_eq!(step.instructions, "make all");
    assert_eq!(step.on_failure, OnFailure::Retry);
    assert_eq!(step.on_iterations_exhausted, OnIterationsExhausted::Abort);
    assert_eq!(step.max_retries, 0);
}

#[test]
fn version_defaults_to_one() {
    let yaml = r#"
name: build
timeout: 5m
steps:
  a:
    worker: CUSTOM
    instructions: "true"
"#;
    let def: WorkflowDef = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(def.version, "1");
}

#[test]
fn parses_full_step() {
    let yaml = r#"
name: ship
timeout: 1h
concurrency: 2
context_dir: .roboppi/ctx
steps:
  review:
    worker: CLAUDE_CODE
    instructions: "Review ${workspace}"
    capabilities: [READ, EDIT, RUN_TESTS]
    depends_on: [compile]
    outputs: [review.md]
    timeout: 10m
    max_retries: 2
    max_iterations: 3
    max_steps: 50
    max_command_time: 2m
    on_failure: continue
    on_iterations_exhausted: continue
    completion_check:
      worker: CLAUDE_CODE
      instructions: Check whether the review is done.
      decision_file: decision.json
  compile:
    worker: CUSTOM
    instructions: make
"#;
    let def: WorkflowDef = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(def.concurrency, Some(2));
    assert_eq!(def.context_dir.as_deref(), Some(".roboppi/ctx"));

    let step = def.step("review").unwrap();
    assert_eq!(step.capabilities.len(), 3);
    assert_eq!(step.depends_on, vec!["compile"]);
    assert_eq!(step.timeout, Some(Duration::from_secs(600)));
    assert_eq!(step.max_retries, 2);
    assert_eq!(step.max_iterations, Some(3));
    assert_eq!(step.max_command_time, Some(Duration::from_secs(120)));
    assert_eq!(step.on_failure, OnFailure::Continue);
    assert_eq!(step.on_iterations_exhausted, OnIterationsExhausted::Continue);

    let check = step.completion_check.as_ref().unwrap();
    assert_eq!(check.decision_file.as_deref(), Some("decision.json"));
}

#[test]
fn rejects_invalid_duration() {
    let yaml = r#"
name: build
timeout: 5d
steps:
  a:
    worker: CUSTOM
    instructions: "true"
"#;
    assert!(serde_yaml::from_str::<WorkflowDef>(yaml).is_err());
}

#[test]
fn rejects_unknown_step_fields() {
    let yaml = r#"
name: build
timeout: 5m
steps:
  a:
    worker: CUSTOM
    instructions: "true"
    retries: 3
"#;
    assert!(serde_yaml::from_str::<WorkflowDef>(yaml).is_err());
}

#[test]
fn effective_max_iterations_floors_at_one() {
    let def: WorkflowDef = serde_yaml::from_str(MINIMAL).unwrap();
    let step = def.step("compile").unwrap();
    assert_eq!(step.effective_max_iterations(), 1);

    let mut step = step.clone();
    step.max_iterations = Some(0);
    assert_eq!(step.effective_max_iterations(), 1);
    step.max_iterations = Some(4);
    assert_eq!(step.effective_max_iterations(), 4);
}

#[test]
fn steps_preserve_authored_order() {
    let yaml = r#"
name: ordered
timeout: 5m
steps:
  zeta:
    worker: CUSTOM
    instructions: "true"
  alpha:
    worker: CUSTOM
    instructions: "true"
"#;
    let def: WorkflowDef = serde_yaml::from_str(yaml).unwrap();
    let keys: Vec<&str> = def.steps.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
}
