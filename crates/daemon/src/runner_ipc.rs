// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step runner backed by the Core process.
//!
//! Submits each attempt as a job over the wire, then awaits the completion
//! routed back by job ID. Cancellation sends `cancel_job` and waits for
//! the Core to settle the attempt.

use async_trait::async_trait;
use roboppi_adapters::{StepRunRequest, StepRunResult, StepRunner, WorkerEvent};
use roboppi_core::{
    DedupPolicy, ErrorClass, Job, JobContext, JobId, JobLimits, JobPayload, Priority, TaskBudget,
    WorkerStatus, WorkerTask,
};
use roboppi_wire::{IpcClient, Request, Response, WireError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Extra wall-clock slack past the job timeout before the runner gives up
/// on the Core answering.
const COMPLETION_SLACK: Duration = Duration::from_secs(30);

pub struct IpcStepRunner<W> {
    client: Arc<IpcClient<W>>,
    call_timeout: Duration,
    default_attempt_timeout: Duration,
}

impl<W: tokio::io::AsyncWrite + Send + Unpin> IpcStepRunner<W> {
    pub fn new(client: Arc<IpcClient<W>>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
            default_attempt_timeout: Duration::from_secs(600),
        }
    }

    fn failed(error: impl Into<String>, error_class: ErrorClass) -> StepRunResult {
        StepRunResult {
            status: WorkerStatus::Failed,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            observations: Vec::new(),
            duration_ms: 0,
            error_class: Some(error_class),
            error: Some(error.into()),
        }
    }
}

fn epoch_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[async_trait]
impl<W: tokio::io::AsyncWrite + Send + Sync + Unpin> StepRunner for IpcStepRunner<W> {
    async fn run_step(
        &self,
        request: StepRunRequest,
        cancel: &CancellationToken,
        _sink: Option<mpsc::Sender<WorkerEvent>>,
    ) -> StepRunResult {
        let job_id = JobId::new();
        let timeout = request.timeout.unwrap_or(self.default_attempt_timeout);

        let job = Job {
            job_id: job_id.clone(),
            priority: Priority::batch(0),
            payload: JobPayload::WorkerTask(WorkerTask {
                worker_kind: request.worker,
                workspace_ref: request.workspace_dir.display().to_string(),
                instructions: request.instructions.clone(),
                capabilities: request.capabilities.clone(),
                output_mode: request.mode,
                budget: TaskBudget {
                    deadline_at_ms: epoch_ms() + timeout.as_millis() as u64,
                    max_steps: None,
                    max_command_time_ms: None,
                },
                env: request.env.clone(),
            }),
            limits: JobLimits { timeout_ms: timeout.as_millis() as u64, max_attempts: 1 },
            context: JobContext {
                trace_id: uuid::Uuid::new_v4().to_string(),
                correlation_id: request.step_id.clone(),
            },
        };

        let watcher = self.client.watch_job(&job_id);
        let submit = Request::SubmitJob {
            request_id: uuid::Uuid::new_v4().to_string(),
            job,
            dedup_key: Some(format!("step:{}", request.step_id)),
            dedup_policy: Some(DedupPolicy::LatestWins),
        };

        match self.client.call(submit, self.call_timeout).await {
            Ok(Response::Ack { .. }) => {}
            Ok(Response::Error { message, .. }) => {
                return Self::failed(
                    format!("core rejected submission: {message}"),
                    ErrorClass::RetryableService,
                );
            }
            Ok(other) => {
                tracing::warn!(step = %request.step_id, "unexpected submit answer: {other:?}");
                return Self::failed("unexpected core answer", ErrorClass::RetryableService);
            }
            Err(WireError::Stopped) => {
                return Self::failed("core connection stopped", ErrorClass::RetryableService)
            }
            Err(e) => {
                return Self::failed(
                    format!("core submit failed: {e}"),
                    ErrorClass::RetryableService,
                )
            }
        }

        let settle = tokio::time::timeout(timeout + COMPLETION_SLACK, watcher);
        tokio::select! {
            settled = settle => match settled {
                Ok(Ok(Response::JobCompleted { result, .. })) => StepRunResult {
                    status: result.status,
                    exit_code: None,
                    stdout: result
                        .observations
                        .first()
                        .map(|o| o.text.clone())
                        .unwrap_or_default(),
                    stderr: String::new(),
                    observations: result.observations,
                    duration_ms: result.duration_ms,
                    error_class: result.error_class,
                    error: result.error_class.map(|c| c.to_string()),
                },
                Ok(Ok(Response::JobCancelled { .. })) => StepRunResult {
                    status: WorkerStatus::Cancelled,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    observations: Vec::new(),
                    duration_ms: 0,
                    error_class: None,
                    error: Some("cancelled".to_string()),
                },
                Ok(Ok(other)) => {
                    tracing::warn!(step = %request.step_id, "unexpected settlement: {other:?}");
                    Self::failed("unexpected core answer", ErrorClass::RetryableService)
                }
                Ok(Err(_)) => {
                    Self::failed("core connection lost", ErrorClass::RetryableService)
                }
                Err(_) => Self::failed("worker timed out", ErrorClass::RetryableTransient),
            },
            _ = cancel.cancelled() => {
                let cancel_request = Request::CancelJob {
                    request_id: uuid::Uuid::new_v4().to_string(),
                    job_id,
                };
                if let Err(e) = self.client.call(cancel_request, self.call_timeout).await {
                    tracing::warn!(error = %e, "cancel_job failed");
                }
                StepRunResult {
                    status: WorkerStatus::Cancelled,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    observations: Vec::new(),
                    duration_ms: 0,
                    error_class: None,
                    error: Some("cancelled".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_ipc_tests.rs"]
mod tests;
