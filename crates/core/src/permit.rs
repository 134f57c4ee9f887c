// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution permits granted by the Core on admission.

use crate::id::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a granted permit.
    pub struct PermitId;
}

/// Circuit-breaker state observed at grant time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    HalfOpen,
    Open,
}

crate::simple_display! {
    CircuitState {
        Closed => "closed",
        HalfOpen => "half_open",
        Open => "open",
    }
}

/// Grant of execution rights for one job attempt.
///
/// The grant itself is plain data; the cancellable token that lets the
/// scheduler abort the attempt lives with the Core's permit registry, keyed
/// by `permit_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub permit_id: PermitId,
    pub job_id: JobId,
    pub deadline_at_ms: u64,
    pub attempt_index: u32,
    pub tokens_granted: u32,
    pub circuit_state_snapshot: CircuitState,
}

#[cfg(test)]
#[path = "permit_tests.rs"]
mod tests;
