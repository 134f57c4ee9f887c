// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound messages: Core → Scheduler.

use roboppi_core::{JobId, Permit, WorkerResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ack {
        request_id: String,
    },
    PermitGranted {
        request_id: String,
        permit: Permit,
    },
    PermitRejected {
        request_id: String,
        reason: String,
    },
    /// Answers the originating submit; also routed by `job_id` for callers
    /// that resolved the ack first.
    JobCompleted {
        request_id: String,
        job_id: JobId,
        result: WorkerResult,
    },
    JobCancelled {
        request_id: String,
        job_id: JobId,
    },
    /// Unsolicited: the Core wants operator attention.
    Escalation {
        job_id: JobId,
        reason: String,
    },
    /// Core-initiated liveness probe.
    Heartbeat {
        request_id: String,
        sent_at_ms: u64,
    },
    HeartbeatAck {
        request_id: String,
        sent_at_ms: u64,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        message: String,
    },
}

impl Response {
    /// The request this message answers, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Response::Ack { request_id }
            | Response::PermitGranted { request_id, .. }
            | Response::PermitRejected { request_id, .. }
            | Response::JobCompleted { request_id, .. }
            | Response::JobCancelled { request_id, .. }
            | Response::Heartbeat { request_id, .. }
            | Response::HeartbeatAck { request_id, .. } => Some(request_id),
            Response::Escalation { .. } => None,
            Response::Error { request_id, .. } => request_id.as_deref(),
        }
    }

    /// The job a completion-style message settles, if any.
    pub fn settled_job_id(&self) -> Option<&JobId> {
        match self {
            Response::JobCompleted { job_id, .. } | Response::JobCancelled { job_id, .. } => {
                Some(job_id)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
