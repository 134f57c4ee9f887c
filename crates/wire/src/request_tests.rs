// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::{
    DedupPolicy, Job, JobContext, JobId, JobLimits, JobPayload, OutputMode, Priority, TaskBudget,
    WorkerKind, WorkerTask,
};
use std::collections::HashMap;

fn sample_job() -> Job {
    Job {
        job_id: JobId::from_string("job-1"),
        priority: Priority::interactive(3),
        payload: JobPayload::WorkerTask(WorkerTask {
            worker_kind: WorkerKind::ClaudeCode,
            workspace_ref: "/ws".to_string(),
            instructions: "fix the tests".to_string(),
            capabilities: vec![],
            output_mode: OutputMode::Run,
            budget: TaskBudget::default(),
            env: HashMap::new(),
        }),
        limits: JobLimits::default(),
        context: JobContext::default(),
    }
}

#[test]
fn submit_job_wire_shape() {
    let request = Request::SubmitJob {
        request_id: "r-1".to_string(),
        job: sample_job(),
        dedup_key: Some("ws:/ws".to_string()),
        dedup_policy: Some(DedupPolicy::Coalesce),
    };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["type"], "submit_job");
    assert_eq!(json["request_id"], "r-1");
    assert_eq!(json["dedup_policy"], "COALESCE");
}

#[test]
fn every_request_exposes_its_id() {
    let requests = vec![
        Request::SubmitJob {
            request_id: "a".to_string(),
            job: sample_job(),
            dedup_key: None,
            dedup_policy: None,
        },
        Request::CancelJob { request_id: "b".to_string(), job_id: JobId::from_string("j") },
        Request::RequestPermit { request_id: "c".to_string(), job_id: JobId::from_string("j") },
        Request::ReportQueueMetrics {
            request_id: "d".to_string(),
            active_permits: 1,
            queue_depth: 2,
            avg_latency_ms: 3,
        },
        Request::Heartbeat { request_id: "e".to_string(), sent_at_ms: 4 },
    ];
    let ids: Vec<&str> = requests.iter().map(Request::request_id).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn request_round_trip() {
    let request = Request::Heartbeat { request_id: "hb-1".to_string(), sent_at_ms: 123 };
    let json = serde_json::to_string(&request).unwrap();
    let parsed: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}
