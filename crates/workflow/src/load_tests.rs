// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn loads_valid_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "wf.yaml",
        r#"
name: build
timeout: 10m
steps:
  compile:
    worker: CUSTOM
    instructions: make
  test:
    worker: CUSTOM
    instructions: make test
    depends_on: [compile]
"#,
    );
    let def = load_workflow(&path).unwrap();
    assert_eq!(def.name, "build");
    assert_eq!(def.steps.len(), 2);
}

#[test]
fn load_rejects_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "wf.yaml",
        r#"
name: cyclic
timeout: 10m
steps:
  a:
    worker: CUSTOM
    instructions: "true"
    depends_on: [b]
  b:
    worker: CUSTOM
    instructions: "true"
    depends_on: [a]
"#,
    );
    assert!(matches!(load_workflow(&path), Err(LoadError::Validation(_))));
}

#[test]
fn load_missing_workflow_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_workflow(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn missing_catalog_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = load_agent_catalog(&dir.path().join("agents.yaml")).unwrap();
    assert!(catalog.is_none());
}

#[test]
fn malformed_catalog_is_yaml_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "agents.yaml", "version: [not, a, string]");
    assert!(matches!(load_agent_catalog(&path), Err(LoadError::Yaml { .. })));
}
