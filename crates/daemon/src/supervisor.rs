// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core subprocess supervision.
//!
//! Spawns the Core, wires its stdio to the IPC client, watches liveness,
//! and restarts on crash or hang with exponential backoff. `kill_core`
//! follows the process manager's TERM→KILL contract.

use crate::env::ipc_timeout;
use crate::health::{health_loop, HealthConfig};
use crate::runner_ipc::IpcStepRunner;
use parking_lot::Mutex;
use roboppi_adapters::{ProcessManager, SpawnSpec, StepRunner};
use roboppi_wire::IpcClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::ChildStdin;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("core argv is empty")]
    EmptyArgv,
    #[error("core spawn failed: {0}")]
    Spawn(#[from] roboppi_adapters::SpawnError),
    #[error("core has no stdio pipes")]
    MissingPipes,
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub core_argv: Vec<String>,
    pub cwd: PathBuf,
    pub health: HealthConfig,
    pub restart_backoff_base: Duration,
    pub restart_backoff_cap: Duration,
}

impl SupervisorConfig {
    pub fn new(core_argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            core_argv,
            cwd: cwd.into(),
            health: HealthConfig::default(),
            restart_backoff_base: Duration::from_secs(1),
            restart_backoff_cap: Duration::from_secs(60),
        }
    }
}

struct CoreHandle {
    pid: u32,
    client: Arc<IpcClient<ChildStdin>>,
}

pub struct Supervisor {
    config: SupervisorConfig,
    manager: ProcessManager,
    current: Arc<Mutex<Option<Arc<CoreHandle>>>>,
    stop: CancellationToken,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, manager: ProcessManager) -> Self {
        Self {
            config,
            manager,
            current: Arc::new(Mutex::new(None)),
            stop: CancellationToken::new(),
        }
    }

    /// A step runner backed by whichever Core generation is current.
    pub fn step_runner(&self) -> Arc<dyn StepRunner> {
        Arc::new(SupervisedRunner { current: Arc::clone(&self.current) })
    }

    fn spawn_core(&self) -> Result<(CoreHandle, roboppi_adapters::RunningChild), SupervisorError> {
        let Some((program, args)) = self.config.core_argv.split_first() else {
            return Err(SupervisorError::EmptyArgv);
        };
        let spec = SpawnSpec::new(program.clone(), args.to_vec(), self.config.cwd.clone())
            .pipe_stdin(true)
            .label("core");
        let mut running = self.manager.spawn(spec)?;

        let stdin = running.child.stdin.take().ok_or(SupervisorError::MissingPipes)?;
        let stdout = running.child.stdout.take().ok_or(SupervisorError::MissingPipes)?;
        let (client, _events) = IpcClient::new(stdout, stdin);

        tracing::info!(pid = running.pid, "core spawned");
        Ok((CoreHandle { pid: running.pid, client: Arc::new(client) }, running))
    }

    /// Run the supervision loop until stopped. Restarts the Core on crash
    /// or hang with exponential backoff.
    pub async fn run(self: Arc<Self>) {
        let mut backoff = self.config.restart_backoff_base;
        loop {
            if self.stop.is_cancelled() {
                return;
            }

            let (handle, mut running) = match self.spawn_core() {
                Ok(spawned) => spawned,
                Err(e) => {
                    tracing::error!(error = %e, "core spawn failed");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.stop.cancelled() => return,
                    }
                    backoff = (backoff * 2).min(self.config.restart_backoff_cap);
                    continue;
                }
            };
            let handle = Arc::new(handle);
            *self.current.lock() = Some(Arc::clone(&handle));

            let generation_stop = self.stop.child_token();
            let health = tokio::spawn(health_loop(
                Arc::clone(&handle.client),
                self.config.health,
                generation_stop.clone(),
            ));

            let started = std::time::Instant::now();
            let hung = tokio::select! {
                status = running.child.wait() => {
                    tracing::warn!(status = ?status.ok(), "core exited");
                    false
                }
                hung = health => hung.unwrap_or(false),
                _ = self.stop.cancelled() => {
                    generation_stop.cancel();
                    self.shutdown_core(&handle, &mut running).await;
                    return;
                }
            };
            generation_stop.cancel();

            // Hang or crash: this generation is done
            self.current.lock().take();
            handle.client.stop();
            if hung {
                tracing::error!(pid = handle.pid, "killing hung core");
                self.shutdown_core(&handle, &mut running).await;
            } else {
                let _ = running.child.wait().await;
            }

            // A generation that lived a while earns a fresh backoff
            if started.elapsed() > Duration::from_secs(30) {
                backoff = self.config.restart_backoff_base;
            }
            tracing::info!(backoff_ms = backoff.as_millis() as u64, "restarting core");
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.stop.cancelled() => return,
            }
            backoff = (backoff * 2).min(self.config.restart_backoff_cap);
        }
    }

    /// TERM, wait out the drain timeout, then KILL.
    async fn shutdown_core(&self, handle: &CoreHandle, running: &mut roboppi_adapters::RunningChild) {
        handle.client.stop();
        let grace = crate::env::drain_timeout();
        self.manager.sigterm(handle.pid);
        match tokio::time::timeout(grace, running.child.wait()).await {
            Ok(status) => {
                tracing::info!(pid = handle.pid, status = ?status.ok(), "core shut down");
            }
            Err(_) => {
                tracing::warn!(pid = handle.pid, "core ignored SIGTERM, killing");
                self.manager.sigkill(handle.pid);
                let _ = tokio::time::timeout(grace, running.child.wait()).await;
            }
        }
    }

    /// Stop supervision and bring the Core down.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

/// Step runner that forwards to the current Core generation.
struct SupervisedRunner {
    current: Arc<Mutex<Option<Arc<CoreHandle>>>>,
}

#[async_trait::async_trait]
impl StepRunner for SupervisedRunner {
    async fn run_step(
        &self,
        request: roboppi_adapters::StepRunRequest,
        cancel: &CancellationToken,
        sink: Option<tokio::sync::mpsc::Sender<roboppi_adapters::WorkerEvent>>,
    ) -> roboppi_adapters::StepRunResult {
        let handle = self.current.lock().clone();
        match handle {
            Some(handle) => {
                let runner = IpcStepRunner::new(Arc::clone(&handle.client), ipc_timeout());
                runner.run_step(request, cancel, sink).await
            }
            None => roboppi_adapters::StepRunResult {
                status: roboppi_core::WorkerStatus::Failed,
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                observations: Vec::new(),
                duration_ms: 0,
                error_class: Some(roboppi_core::ErrorClass::RetryableService),
                error: Some("core unavailable".to_string()),
            },
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
