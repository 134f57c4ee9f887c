// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Core service loop.
//!
//! Reads requests from the transport, admits jobs through dedup and
//! backpressure, dispatches them under the permit cap with the workspace
//! lock held, and reports completions. EOF on the inbound stream means the
//! Scheduler is gone: running attempts are cancelled and the loop drains.

use crate::backpressure::{BackpressureController, LoadMetrics, LoadResponse};
use crate::inflight::{AdmissionAction, InFlightRegistry};
use crate::lock::{WorkspaceLockTable, DEFAULT_WAIT_TIMEOUT};
use crate::queue::PriorityQueue;
use parking_lot::Mutex;
use roboppi_adapters::{StepRunRequest, StepRunner};
use roboppi_core::{
    CircuitState, CostInfo, DedupPolicy, ErrorClass, Job, JobId, Permit, PermitId, WorkerResult,
    WorkerStatus,
};
use roboppi_wire::{LineReader, Request, Response, WireError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Concurrent attempts the Core will run.
    pub max_permits: u32,
    /// Attempt timeout when the job's limits carry none.
    pub default_attempt_timeout: Duration,
    /// How long a job waits for its workspace lock.
    pub lock_wait: Duration,
    /// Tokens granted per permit (cost accounting).
    pub tokens_per_permit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_permits: 4,
            default_attempt_timeout: Duration::from_secs(600),
            lock_wait: DEFAULT_WAIT_TIMEOUT,
            tokens_per_permit: 1,
        }
    }
}

struct QueuedJob {
    job: Job,
    /// Request that submitted the job; completions echo it.
    request_id: String,
}

struct RunningJob {
    cancel: CancellationToken,
}

#[derive(Default)]
struct LatencyStats {
    completed: u64,
    total_ms: u64,
}

impl LatencyStats {
    fn avg_ms(&self) -> u64 {
        if self.completed == 0 {
            0
        } else {
            self.total_ms / self.completed
        }
    }
}

struct Shared {
    config: CoreConfig,
    queue: Mutex<PriorityQueue<QueuedJob>>,
    inflight: Mutex<InFlightRegistry>,
    running: Mutex<HashMap<JobId, RunningJob>>,
    latency: Mutex<LatencyStats>,
    backpressure: BackpressureController,
    locks: WorkspaceLockTable,
    runner: Arc<dyn StepRunner>,
    out_tx: mpsc::Sender<Response>,
    wake: Notify,
    shutdown: CancellationToken,
    now_ms: fn() -> u64,
}

impl Shared {
    fn active_permits(&self) -> u32 {
        self.running.lock().len() as u32
    }

    /// Fold the Core's own signals into the latest reported metrics.
    fn refresh_load(&self) {
        let reported = self.backpressure.metrics();
        self.backpressure.update_metrics(LoadMetrics {
            active_permits: self.active_permits().max(reported.active_permits),
            queue_depth: self.queue.lock().len() as u32,
            avg_latency_ms: self.latency.lock().avg_ms().max(reported.avg_latency_ms),
        });
    }

    async fn send(&self, response: Response) {
        if self.out_tx.send(response).await.is_err() {
            tracing::debug!("response channel closed");
        }
    }
}

fn epoch_ms_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// The Core process service.
pub struct CoreService;

impl CoreService {
    /// Run the service over the given transport until the inbound stream
    /// ends.
    pub async fn run<R, W>(
        runner: Arc<dyn StepRunner>,
        config: CoreConfig,
        reader: R,
        mut writer: W,
    ) -> Result<(), WireError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (out_tx, mut out_rx) = mpsc::channel::<Response>(256);

        let shared = Arc::new(Shared {
            config,
            queue: Mutex::new(PriorityQueue::new()),
            inflight: Mutex::new(InFlightRegistry::new()),
            running: Mutex::new(HashMap::new()),
            latency: Mutex::new(LatencyStats::default()),
            backpressure: BackpressureController::default(),
            locks: WorkspaceLockTable::new(),
            runner,
            out_tx,
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            now_ms: epoch_ms_now,
        });

        let writer_task = tokio::spawn(async move {
            while let Some(response) = out_rx.recv().await {
                if let Err(e) = roboppi_wire::write_message(&mut writer, &response).await {
                    tracing::warn!(error = %e, "failed to write response");
                    break;
                }
            }
        });

        let dispatcher = tokio::spawn(dispatch_loop(Arc::clone(&shared)));

        let mut lines = LineReader::new(reader);
        loop {
            match lines.next_message::<Request>().await {
                Ok(Some(request)) => handle_request(&shared, request).await,
                Ok(None) => break,
                Err(WireError::Parse { snippet }) => {
                    tracing::warn!(snippet = %snippet, "dropping unparseable request");
                    shared
                        .send(Response::Error {
                            request_id: None,
                            message: "unparseable request".to_string(),
                        })
                        .await;
                }
                Err(WireError::BufferOverflow { limit }) => {
                    tracing::error!(limit, "request overflow, closing transport");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport read failed");
                    break;
                }
            }
        }

        // Scheduler is gone: cancel running attempts and drain.
        shared.shutdown.cancel();
        shared.wake.notify_waiters();
        for (_, running) in shared.running.lock().iter() {
            running.cancel.cancel();
        }
        let _ = dispatcher.await;
        drop(shared);
        let _ = writer_task.await;
        Ok(())
    }
}

async fn handle_request(shared: &Arc<Shared>, request: Request) {
    match request {
        Request::SubmitJob { request_id, job, dedup_key, dedup_policy } => {
            submit_job(shared, request_id, job, dedup_key, dedup_policy).await;
        }

        Request::CancelJob { request_id, job_id } => {
            // Queued jobs are dropped outright; running jobs get their
            // permit token cancelled and settle through the normal path.
            let dropped =
                shared.queue.lock().drain_matching(|queued| queued.job.job_id == job_id);
            shared.send(Response::Ack { request_id }).await;
            if !dropped.is_empty() {
                shared.inflight.lock().remove_job(&job_id);
                for queued in dropped {
                    shared
                        .send(Response::JobCancelled {
                            request_id: queued.request_id,
                            job_id: queued.job.job_id,
                        })
                        .await;
                }
                return;
            }
            if let Some(running) = shared.running.lock().get(&job_id) {
                running.cancel.cancel();
            }
        }

        Request::RequestPermit { request_id, job_id } => {
            shared.refresh_load();
            match shared.backpressure.classify() {
                LoadResponse::Reject | LoadResponse::Defer => {
                    shared
                        .send(Response::PermitRejected {
                            request_id,
                            reason: format!("load {:.2}", shared.backpressure.load()),
                        })
                        .await;
                }
                LoadResponse::Accept | LoadResponse::Degrade => {
                    let permit = Permit {
                        permit_id: PermitId::new(),
                        job_id,
                        deadline_at_ms: (shared.now_ms)()
                            + shared.config.default_attempt_timeout.as_millis() as u64,
                        attempt_index: 0,
                        tokens_granted: shared.config.tokens_per_permit,
                        circuit_state_snapshot: CircuitState::Closed,
                    };
                    shared.send(Response::PermitGranted { request_id, permit }).await;
                }
            }
        }

        Request::ReportQueueMetrics { request_id, active_permits, queue_depth, avg_latency_ms } => {
            shared.backpressure.update_metrics(LoadMetrics {
                active_permits,
                queue_depth,
                avg_latency_ms,
            });
            shared.send(Response::Ack { request_id }).await;
            shared.wake.notify_waiters();
        }

        Request::Heartbeat { request_id, sent_at_ms: _ } => {
            shared
                .send(Response::HeartbeatAck { request_id, sent_at_ms: (shared.now_ms)() })
                .await;
        }
    }
}

async fn submit_job(
    shared: &Arc<Shared>,
    request_id: String,
    job: Job,
    dedup_key: Option<String>,
    dedup_policy: Option<DedupPolicy>,
) {
    shared.refresh_load();
    if shared.backpressure.classify() == LoadResponse::Reject {
        shared
            .send(Response::Error {
                request_id: Some(request_id),
                message: "backpressure: submission rejected".to_string(),
            })
            .await;
        return;
    }

    if let Some(key) = dedup_key {
        let policy = dedup_policy.unwrap_or(DedupPolicy::Coalesce);
        let action = shared.inflight.lock().admit(&key, &job.job_id, policy);
        match action {
            AdmissionAction::Coalesce { existing_job_id } => {
                tracing::info!(
                    key = %key,
                    existing = %existing_job_id,
                    "coalescing onto running job"
                );
                shared.send(Response::Ack { request_id }).await;
                return;
            }
            AdmissionAction::Reject { existing_job_id } => {
                shared
                    .send(Response::Error {
                        request_id: Some(request_id),
                        message: format!("duplicate in flight: {}", existing_job_id),
                    })
                    .await;
                return;
            }
            AdmissionAction::Proceed { cancel_job_id } => {
                if let Some(previous) = cancel_job_id {
                    tracing::info!(key = %key, previous = %previous, "latest wins, cancelling");
                    if let Some(running) = shared.running.lock().get(&previous) {
                        running.cancel.cancel();
                    }
                    let dropped =
                        shared.queue.lock().drain_matching(|queued| queued.job.job_id == previous);
                    for queued in dropped {
                        shared
                            .send(Response::JobCancelled {
                                request_id: queued.request_id,
                                job_id: queued.job.job_id,
                            })
                            .await;
                    }
                }
            }
        }
    }

    let priority = job.priority;
    shared.queue.lock().enqueue(priority, QueuedJob { job, request_id: request_id.clone() });
    shared.send(Response::Ack { request_id }).await;
    shared.wake.notify_waiters();
}

async fn dispatch_loop(shared: Arc<Shared>) {
    loop {
        if shared.shutdown.is_cancelled() {
            break;
        }

        let can_dispatch = {
            shared.refresh_load();
            let under_cap = shared.active_permits() < shared.config.max_permits;
            let load_ok = !matches!(
                shared.backpressure.classify(),
                LoadResponse::Defer | LoadResponse::Reject
            );
            under_cap && load_ok && !shared.queue.lock().is_empty()
        };

        if !can_dispatch {
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = shared.shutdown.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            continue;
        }

        let Some(queued) = shared.queue.lock().dequeue() else {
            continue;
        };

        let cancel = CancellationToken::new();
        shared
            .running
            .lock()
            .insert(queued.job.job_id.clone(), RunningJob { cancel: cancel.clone() });

        tokio::spawn(run_job(Arc::clone(&shared), queued, cancel));
    }
}

async fn run_job(shared: Arc<Shared>, queued: QueuedJob, cancel: CancellationToken) {
    let QueuedJob { job, request_id } = queued;
    let job_id = job.job_id.clone();
    let task = job.worker_task().clone();
    let started = std::time::Instant::now();

    let locked = shared
        .locks
        .wait_for_lock(&task.workspace_ref, job_id.as_str(), shared.config.lock_wait)
        .await;

    let result = if !locked {
        WorkerResult {
            status: WorkerStatus::Failed,
            artifacts: vec![],
            observations: vec![],
            cost: CostInfo { estimated_tokens: None, wall_time_ms: 0 },
            duration_ms: started.elapsed().as_millis() as u64,
            error_class: Some(ErrorClass::RetryableService),
        }
    } else {
        let now = (shared.now_ms)();
        let budget_remaining = task.budget.deadline_at_ms.saturating_sub(now);
        let timeout_ms = if job.limits.timeout_ms > 0 {
            if budget_remaining > 0 {
                job.limits.timeout_ms.min(budget_remaining)
            } else {
                job.limits.timeout_ms
            }
        } else {
            shared.config.default_attempt_timeout.as_millis() as u64
        };

        let request = StepRunRequest::new(
            job_id.as_str(),
            task.worker_kind,
            task.instructions.clone(),
            task.workspace_ref.clone(),
        )
        .mode(task.output_mode)
        .capabilities(task.capabilities.clone())
        .env(task.env.clone())
        .timeout(Duration::from_millis(timeout_ms));

        let run = shared.runner.run_step(request, &cancel, None).await;
        shared.locks.release(&task.workspace_ref, job_id.as_str());

        WorkerResult {
            status: run.status,
            artifacts: vec![],
            observations: run.observations,
            cost: CostInfo { estimated_tokens: None, wall_time_ms: run.duration_ms },
            duration_ms: run.duration_ms,
            error_class: run.error_class,
        }
    };

    shared.running.lock().remove(&job_id);
    shared.inflight.lock().remove_job(&job_id);
    {
        let mut latency = shared.latency.lock();
        latency.completed += 1;
        latency.total_ms += started.elapsed().as_millis() as u64;
    }
    shared.wake.notify_waiters();

    let response = if result.status == WorkerStatus::Cancelled {
        Response::JobCancelled { request_id, job_id }
    } else {
        Response::JobCompleted { request_id, job_id, result }
    };
    shared.send(response).await;
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
