// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::{DedupPolicy, JobId};

fn job(id: &str) -> JobId {
    JobId::from_string(id)
}

#[test]
fn empty_key_proceeds_and_registers() {
    let mut registry = InFlightRegistry::new();
    let action = registry.admit("k", &job("j1"), DedupPolicy::Coalesce);
    assert_eq!(action, AdmissionAction::Proceed { cancel_job_id: None });
    assert_eq!(registry.lookup("k"), Some(&job("j1")));
}

#[test]
fn coalesce_keeps_existing_holder() {
    let mut registry = InFlightRegistry::new();
    registry.admit("k", &job("j1"), DedupPolicy::Coalesce);
    let action = registry.admit("k", &job("j2"), DedupPolicy::Coalesce);

    assert_eq!(action, AdmissionAction::Coalesce { existing_job_id: job("j1") });
    // Holder is unchanged
    assert_eq!(registry.lookup("k"), Some(&job("j1")));
}

#[test]
fn latest_wins_replaces_and_hands_back_previous() {
    let mut registry = InFlightRegistry::new();
    registry.admit("k", &job("j1"), DedupPolicy::LatestWins);
    let action = registry.admit("k", &job("j2"), DedupPolicy::LatestWins);

    assert_eq!(action, AdmissionAction::Proceed { cancel_job_id: Some(job("j1")) });
    assert_eq!(registry.lookup("k"), Some(&job("j2")));
}

#[test]
fn reject_discards_new_submission() {
    let mut registry = InFlightRegistry::new();
    registry.admit("k", &job("j1"), DedupPolicy::Reject);
    let action = registry.admit("k", &job("j2"), DedupPolicy::Reject);

    assert_eq!(action, AdmissionAction::Reject { existing_job_id: job("j1") });
    assert_eq!(registry.lookup("k"), Some(&job("j1")));
}

#[test]
fn remove_job_clears_only_its_keys() {
    let mut registry = InFlightRegistry::new();
    registry.admit("a", &job("j1"), DedupPolicy::Coalesce);
    registry.admit("b", &job("j2"), DedupPolicy::Coalesce);

    registry.remove_job(&job("j1"));
    assert_eq!(registry.lookup("a"), None);
    assert_eq!(registry.lookup("b"), Some(&job("j2")));
    assert_eq!(registry.len(), 1);
}

#[test]
fn stale_completion_does_not_clear_replacement() {
    let mut registry = InFlightRegistry::new();
    registry.admit("k", &job("j1"), DedupPolicy::LatestWins);
    registry.admit("k", &job("j2"), DedupPolicy::LatestWins);

    // j1 finishes after being replaced; the key still belongs to j2
    registry.remove_job(&job("j1"));
    assert_eq!(registry.lookup("k"), Some(&job("j2")));
}

#[test]
fn keys_are_independent() {
    let mut registry = InFlightRegistry::new();
    registry.admit("a", &job("j1"), DedupPolicy::Reject);
    let action = registry.admit("b", &job("j2"), DedupPolicy::Reject);
    assert_eq!(action, AdmissionAction::Proceed { cancel_job_id: None });
}
