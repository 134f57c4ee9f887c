// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::step::WorkflowStatus;

#[test]
fn events_tag_with_scoped_names() {
    let event = Event::WorkflowStarted { workflow: "build".to_string(), started_at_ms: 1 };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "workflow:started");

    let event = Event::StepPhase {
        step_id: "compile".to_string(),
        phase: StepPhase::Check,
        iteration: 1,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "step:phase");
    assert_eq!(json["phase"], "check");
}

#[test]
fn event_round_trip() {
    let event = Event::WorkflowFinished {
        workflow: "build".to_string(),
        status: WorkflowStatus::TimedOut,
        finished_at_ms: 42,
    };
    let json = serde_json::to_string(&event).unwrap();
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn event_names() {
    let event = Event::WorkflowStarted { workflow: "w".to_string(), started_at_ms: 0 };
    assert_eq!(event.name(), "workflow_started");
}
