// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound messages: Scheduler → Core.

use roboppi_core::{DedupPolicy, Job, JobId};
use serde::{Deserialize, Serialize};

/// Every inbound message carries a `request_id` the answer echoes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    SubmitJob {
        request_id: String,
        job: Job,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dedup_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dedup_policy: Option<DedupPolicy>,
    },
    CancelJob {
        request_id: String,
        job_id: JobId,
    },
    RequestPermit {
        request_id: String,
        job_id: JobId,
    },
    ReportQueueMetrics {
        request_id: String,
        active_permits: u32,
        queue_depth: u32,
        avg_latency_ms: u64,
    },
    Heartbeat {
        request_id: String,
        sent_at_ms: u64,
    },
}

impl Request {
    pub fn request_id(&self) -> &str {
        match self {
            Request::SubmitJob { request_id, .. }
            | Request::CancelJob { request_id, .. }
            | Request::RequestPermit { request_id, .. }
            | Request::ReportQueueMetrics { request_id, .. }
            | Request::Heartbeat { request_id, .. } => request_id,
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
