// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::{Capability, WorkerKind};

const CATALOG: &str = r#"
version: "1"
agents:
  reviewer:
    worker: CLAUDE_CODE
    model: large
    base_instructions: You are a careful reviewer.
    capabilities: [READ]
    timeout: 15m
    max_steps: 40
  builder:
    worker: CUSTOM
"#;

fn catalog() -> AgentCatalog {
    serde_yaml::from_str(CATALOG).unwrap()
}

fn bare_step() -> StepDef {
    serde_yaml::from_str(
        r#"
agent: reviewer
instructions: Review the diff.
"#,
    )
    .unwrap()
}

#[test]
fn parses_catalog() {
    let catalog = catalog();
    assert_eq!(catalog.version, "1");
    assert_eq!(catalog.agents.len(), 2);
    let reviewer = catalog.get("reviewer").unwrap();
    assert_eq!(reviewer.worker, Some(WorkerKind::ClaudeCode));
    assert_eq!(reviewer.model.as_deref(), Some("large"));
    assert_eq!(reviewer.max_steps, Some(40));
}

#[test]
fn merge_fills_missing_fields() {
    let catalog = catalog();
    let profile = catalog.get("reviewer").unwrap();
    let merged = AgentCatalog::merge_into(profile, &bare_step());

    assert_eq!(merged.worker, Some(WorkerKind::ClaudeCode));
    assert_eq!(merged.capabilities, vec![Capability::Read]);
    assert_eq!(merged.timeout, Some(std::time::Duration::from_secs(900)));
    assert_eq!(merged.max_steps, Some(40));
}

#[test]
fn merge_prefers_step_fields() {
    let catalog = catalog();
    let profile = catalog.get("reviewer").unwrap();
    let mut step = bare_step();
    step.worker = Some(WorkerKind::Opencode);
    step.capabilities = vec![Capability::Edit];
    step.max_steps = Some(5);

    let merged = AgentCatalog::merge_into(profile, &step);
    assert_eq!(merged.worker, Some(WorkerKind::Opencode));
    assert_eq!(merged.capabilities, vec![Capability::Edit]);
    assert_eq!(merged.max_steps, Some(5));
}

#[test]
fn merge_prepends_base_instructions() {
    let catalog = catalog();
    let profile = catalog.get("reviewer").unwrap();
    let merged = AgentCatalog::merge_into(profile, &bare_step());
    assert_eq!(merged.instructions, "You are a careful reviewer.\n\nReview the diff.");
}

#[test]
fn merge_uses_base_when_step_has_no_instructions() {
    let catalog = catalog();
    let profile = catalog.get("reviewer").unwrap();
    let mut step = bare_step();
    step.instructions = String::new();
    let merged = AgentCatalog::merge_into(profile, &step);
    assert_eq!(merged.instructions, "You are a careful reviewer.");
}
