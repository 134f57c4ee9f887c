// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::{Capability, WorkerKind};

fn resolved(step_id: &str) -> ResolvedStep {
    ResolvedStep {
        step_id: step_id.to_string(),
        worker: WorkerKind::Custom,
        instructions: "echo hi".to_string(),
        capabilities: vec![Capability::Read],
        agent: None,
        max_iterations: 1,
        max_retries: 0,
    }
}

#[test]
fn writes_resolved_json_under_step_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_resolved_instructions(dir.path(), &resolved("compile")).unwrap();

    let path = dir.path().join("compile/_resolved.json");
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc["step_id"], "compile");
    assert_eq!(doc["worker"], "CUSTOM");
    assert_eq!(doc["instructions"], "echo hi");
}

#[test]
fn long_step_ids_get_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let long_id = "step-".repeat(40);
    write_resolved_instructions(dir.path(), &resolved(&long_id)).unwrap();
    assert!(dir.path().join(&long_id).join("_resolved.json").exists());
}

#[test]
fn fills_missing_outputs_from_stdout() {
    let dir = tempfile::tempdir().unwrap();
    fill_outputs(dir.path(), &["report.md".to_string()], "  the report body \n").unwrap();
    let body = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
    assert_eq!(body, "the report body");
}

#[test]
fn existing_outputs_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report.md"), "worker wrote this").unwrap();
    fill_outputs(dir.path(), &["report.md".to_string()], "stdout fallback").unwrap();
    let body = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
    assert_eq!(body, "worker wrote this");
}

#[test]
fn nested_outputs_create_parents() {
    let dir = tempfile::tempdir().unwrap();
    fill_outputs(dir.path(), &["reports/daily/summary.txt".to_string()], "body").unwrap();
    assert!(dir.path().join("reports/daily/summary.txt").exists());
}

#[test]
fn traversal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = fill_outputs(dir.path(), &["../escape.txt".to_string()], "body").unwrap_err();
    assert!(matches!(err, ContextError::PathEscape(_)));

    let err =
        fill_outputs(dir.path(), &["a/../../escape.txt".to_string()], "body").unwrap_err();
    assert!(matches!(err, ContextError::PathEscape(_)));
}

#[test]
fn absolute_outputs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = fill_outputs(dir.path(), &["/etc/passwd".to_string()], "body").unwrap_err();
    assert!(matches!(err, ContextError::PathEscape(_)));
}

#[test]
fn internal_dotdot_within_workspace_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    // a/b/../c stays inside the workspace
    fill_outputs(dir.path(), &["a/b/../c.txt".to_string()], "body").unwrap();
    assert!(dir.path().join("a/c.txt").exists());
}
