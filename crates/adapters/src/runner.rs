// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step runner: one worker attempt, in-process.

use crate::process::{ProcessManager, SpawnError, SpawnSpec};
use crate::subprocess::{run_streaming, Termination, WorkerEvent};
use crate::worker::{command_for, synthesize_observations};
use async_trait::async_trait;
use roboppi_core::{Capability, ErrorClass, Observation, OutputMode, WorkerKind, WorkerStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One worker attempt to execute.
#[derive(Debug, Clone)]
pub struct StepRunRequest {
    pub step_id: String,
    pub worker: WorkerKind,
    pub mode: OutputMode,
    pub instructions: String,
    pub workspace_dir: PathBuf,
    pub capabilities: Vec<Capability>,
    pub env: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl StepRunRequest {
    pub fn new(
        step_id: impl Into<String>,
        worker: WorkerKind,
        instructions: impl Into<String>,
        workspace_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            worker,
            mode: OutputMode::Run,
            instructions: instructions.into(),
            workspace_dir: workspace_dir.into(),
            capabilities: Vec::new(),
            env: HashMap::new(),
            timeout: None,
        }
    }

    roboppi_core::setters! {
        set {
            mode: OutputMode,
            capabilities: Vec<Capability>,
            env: HashMap<String, String>,
        }
        option {
            timeout: Duration,
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRunResult {
    pub status: WorkerStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub observations: Vec<Observation>,
    pub duration_ms: u64,
    pub error_class: Option<ErrorClass>,
    pub error: Option<String>,
}

impl StepRunResult {
    pub fn succeeded(&self) -> bool {
        self.status == WorkerStatus::Succeeded
    }
}

/// Executes one step attempt. The engine depends on this seam so tests can
/// script outcomes without spawning processes.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(
        &self,
        request: StepRunRequest,
        cancel: &CancellationToken,
        sink: Option<mpsc::Sender<WorkerEvent>>,
    ) -> StepRunResult;
}

/// Runs workers as local subprocesses through the process manager.
#[derive(Clone, Default)]
pub struct LocalStepRunner {
    manager: ProcessManager,
}

impl LocalStepRunner {
    pub fn new(manager: ProcessManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ProcessManager {
        &self.manager
    }
}

#[async_trait]
impl StepRunner for LocalStepRunner {
    async fn run_step(
        &self,
        request: StepRunRequest,
        cancel: &CancellationToken,
        sink: Option<mpsc::Sender<WorkerEvent>>,
    ) -> StepRunResult {
        let start = Instant::now();
        let (program, args) = command_for(request.worker, request.mode, &request.instructions);

        let spec = SpawnSpec::new(program, args, request.workspace_dir.clone())
            .env(request.env.clone().into_iter().collect())
            .label(format!("step:{}", request.step_id));

        tracing::info!(
            step = %request.step_id,
            worker = %request.worker,
            cwd = %request.workspace_dir.display(),
            "launching worker"
        );

        let output =
            match run_streaming(&self.manager, spec, cancel, request.timeout, sink).await {
                Ok(output) => output,
                Err(SpawnError::NotFound { program }) => {
                    tracing::warn!(step = %request.step_id, program = %program, "CLI not found");
                    return StepRunResult {
                        status: WorkerStatus::Failed,
                        exit_code: None,
                        stdout: String::new(),
                        stderr: String::new(),
                        observations: Vec::new(),
                        duration_ms: start.elapsed().as_millis() as u64,
                        error_class: Some(ErrorClass::NonRetryable),
                        error: Some("CLI not found".to_string()),
                    };
                }
                Err(e) => {
                    return StepRunResult {
                        status: WorkerStatus::Failed,
                        exit_code: None,
                        stdout: String::new(),
                        stderr: String::new(),
                        observations: Vec::new(),
                        duration_ms: start.elapsed().as_millis() as u64,
                        error_class: Some(ErrorClass::RetryableTransient),
                        error: Some(e.to_string()),
                    };
                }
            };

        let duration_ms = start.elapsed().as_millis() as u64;
        let observations = synthesize_observations(&output.stdout);

        let (status, error_class, error) = match output.termination {
            Termination::Cancelled => (WorkerStatus::Cancelled, None, Some("cancelled".to_string())),
            Termination::TimedOut => (
                WorkerStatus::Failed,
                Some(ErrorClass::RetryableTransient),
                Some("worker timed out".to_string()),
            ),
            Termination::Exited => match output.exit_code {
                Some(0) => (WorkerStatus::Succeeded, None, None),
                Some(code) => (
                    WorkerStatus::Failed,
                    Some(ErrorClass::RetryableTransient),
                    Some(format!("worker exited with status {}", code)),
                ),
                // Signal-killed without our cancel firing
                None => (WorkerStatus::Cancelled, None, Some("worker was signal-killed".to_string())),
            },
        };

        StepRunResult {
            status,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            observations,
            duration_ms,
            error_class,
            error,
        }
    }
}

/// Scripted outcome for the fake runner.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    pub status: WorkerStatus,
    pub stdout: String,
    pub error_class: Option<ErrorClass>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { status: WorkerStatus::Succeeded, stdout: stdout.into(), error_class: None }
    }

    pub fn failure(error_class: ErrorClass) -> Self {
        Self { status: WorkerStatus::Failed, stdout: String::new(), error_class: Some(error_class) }
    }

    fn into_result(self) -> StepRunResult {
        let observations = synthesize_observations(&self.stdout);
        let error = match self.status {
            WorkerStatus::Succeeded => None,
            WorkerStatus::Failed => Some("scripted failure".to_string()),
            WorkerStatus::Cancelled => Some("cancelled".to_string()),
        };
        StepRunResult {
            status: self.status,
            exit_code: Some(if error.is_none() { 0 } else { 1 }),
            stdout: self.stdout,
            stderr: String::new(),
            observations,
            duration_ms: 1,
            error_class: self.error_class,
            error,
        }
    }
}

/// Replays scripted outcomes per step ID, recording every request.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeStepRunner {
    script: parking_lot::Mutex<HashMap<String, std::collections::VecDeque<ScriptedOutcome>>>,
    pub requests: parking_lot::Mutex<Vec<StepRunRequest>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeStepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the given step ID. Outcomes replay in order;
    /// when the queue is empty the runner reports success with no output.
    pub fn enqueue(&self, step_id: &str, outcome: ScriptedOutcome) {
        self.script.lock().entry(step_id.to_string()).or_default().push_back(outcome);
    }

    pub fn request_count(&self, step_id: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.step_id == step_id).count()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl StepRunner for FakeStepRunner {
    async fn run_step(
        &self,
        request: StepRunRequest,
        cancel: &CancellationToken,
        _sink: Option<mpsc::Sender<WorkerEvent>>,
    ) -> StepRunResult {
        self.requests.lock().push(request.clone());
        if cancel.is_cancelled() {
            return ScriptedOutcome {
                status: WorkerStatus::Cancelled,
                stdout: String::new(),
                error_class: None,
            }
            .into_result();
        }
        let outcome = self
            .script
            .lock()
            .get_mut(&request.step_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| ScriptedOutcome::success(""));
        outcome.into_result()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
