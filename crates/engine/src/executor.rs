// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DAG executor.
//!
//! Drives every step of a validated workflow through its state machine:
//! PENDING → READY → RUNNING → (CHECKING →)* terminal. Dispatch respects
//! `depends_on`, bounded concurrency, and lexicographic tie-breaking so
//! runs are reproducible. One workflow-wide deadline bounds the run; abort
//! propagates through a cancellation token into every live worker.

use crate::context::{self, ResolvedStep};
use crate::management::{invoke_hook, HookPoint, ManagementConfig};
use crate::retry::backoff_delay;
use crate::telemetry::TelemetrySink;
use roboppi_adapters::{StepRunRequest, StepRunResult, StepRunner};
use roboppi_core::{
    parse_decision_file, parse_decision_stdout, Clock, CompletionDecision, ErrorClass, Event,
    ManagementDirective, StepPhase, StepState, StepStatus, SystemClock, WorkerKind, WorkerStatus,
    WorkflowState, WorkflowStatus,
};
use roboppi_workflow::{transitive_dependents, AgentCatalog, OnFailure, OnIterationsExhausted, StepDef, WorkflowDef};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Consecutive completion-check infrastructure failures tolerated before
/// the step is failed outright.
const MAX_CHECK_INFRA_FAILURES: u32 = 3;

/// Consecutive incomplete iterations before the on_stall hook fires.
const STALL_AFTER_INCOMPLETE: u32 = 2;

/// Everything one `execute` call needs.
pub struct ExecuteParams {
    pub def: WorkflowDef,
    pub workspace_dir: PathBuf,
    pub context_dir: PathBuf,
    pub catalog: Option<AgentCatalog>,
    /// Template variables for `${name}` expansion in instructions.
    pub vars: HashMap<String, String>,
    pub cancel: CancellationToken,
    pub sink: Arc<dyn TelemetrySink>,
}

pub struct Executor<C: Clock = SystemClock> {
    runner: Arc<dyn StepRunner>,
    clock: C,
    management: Option<ManagementConfig>,
}

enum Outcome {
    /// Worker attempt settled (or was skipped by the pre-step hook).
    Attempt {
        result: StepRunResult,
        skipped_by_hook: bool,
        retry_requested: bool,
    },
    /// Completion check settled.
    Check { decision: CompletionDecision, cancelled: bool },
    /// Retry backoff elapsed.
    Backoff,
}

struct StepMsg {
    step_id: String,
    outcome: Outcome,
}

/// Per-step runtime bookkeeping alongside the public [`StepState`].
struct StepRt {
    resolved: StepDef,
    worker: Option<WorkerKind>,
    last_stdout: String,
    consecutive_incomplete: u32,
}

struct Run<'a, C: Clock> {
    executor: &'a Executor<C>,
    params: &'a ExecuteParams,
    state: WorkflowState,
    rt: HashMap<String, StepRt>,
    running: usize,
    workflow_failed: bool,
    /// A FATAL error class aborted the run: the workflow ends FAILED even
    /// though abort rides the cancellation token.
    fatal_abort: bool,
    tx: mpsc::UnboundedSender<StepMsg>,
}

impl Executor<SystemClock> {
    pub fn new(runner: Arc<dyn StepRunner>) -> Self {
        Self { runner, clock: SystemClock, management: None }
    }
}

impl<C: Clock> Executor<C> {
    pub fn with_clock(runner: Arc<dyn StepRunner>, clock: C) -> Self {
        Self { runner, clock, management: None }
    }

    pub fn management(mut self, config: ManagementConfig) -> Self {
        self.management = Some(config);
        self
    }

    /// Run the workflow to completion, timeout, or abort.
    pub async fn execute(&self, params: ExecuteParams) -> WorkflowState {
        let started_at_ms = self.clock.epoch_ms();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut run = Run {
            executor: self,
            params: &params,
            state: WorkflowState::new(params.def.name.clone(), started_at_ms),
            rt: HashMap::new(),
            running: 0,
            workflow_failed: false,
            fatal_abort: false,
            tx,
        };

        params.sink.emit(Event::WorkflowStarted {
            workflow: params.def.name.clone(),
            started_at_ms,
        });

        run.resolve_steps();

        let deadline = tokio::time::sleep(params.def.timeout);
        tokio::pin!(deadline);
        let mut ended_by = None;

        loop {
            run.dispatch_ready();
            if run.running == 0 && !run.has_dispatchable() {
                break;
            }
            tokio::select! {
                Some(msg) = rx.recv() => run.handle(msg),
                _ = &mut deadline => {
                    ended_by = Some(WorkflowStatus::TimedOut);
                    break;
                }
                _ = params.cancel.cancelled() => {
                    ended_by = Some(if run.fatal_abort {
                        WorkflowStatus::Failed
                    } else {
                        WorkflowStatus::Cancelled
                    });
                    break;
                }
            }
        }

        run.finalize(ended_by).await
    }
}

impl<'a, C: Clock> Run<'a, C> {
    fn resolve_steps(&mut self) {
        for (id, raw) in &self.params.def.steps {
            let merged = match (&raw.agent, &self.params.catalog) {
                (Some(agent), Some(catalog)) => match catalog.get(agent) {
                    Some(profile) => AgentCatalog::merge_into(profile, raw),
                    None => {
                        tracing::warn!(step = %id, agent = %agent, "unknown agent reference");
                        raw.clone()
                    }
                },
                _ => raw.clone(),
            };

            let mut vars = self.params.vars.clone();
            vars.insert("step_id".to_string(), id.clone());
            vars.insert(
                "workspace".to_string(),
                self.params.workspace_dir.display().to_string(),
            );
            vars.insert(
                "context_dir".to_string(),
                self.params.context_dir.display().to_string(),
            );

            let mut resolved = merged.clone();
            resolved.instructions = roboppi_workflow::expand(&merged.instructions, &vars);

            let state = StepState::new(resolved.effective_max_iterations());
            self.state.steps.insert(id.clone(), state);
            self.rt.insert(
                id.clone(),
                StepRt {
                    worker: resolved.worker,
                    resolved,
                    last_stdout: String::new(),
                    consecutive_incomplete: 0,
                },
            );
        }
    }

    fn emit_state(&self, step_id: &str) {
        if let Some(state) = self.state.steps.get(step_id) {
            self.params.sink.emit(Event::StepState {
                step_id: step_id.to_string(),
                state: state.clone(),
            });
        }
    }

    fn emit_phase(&self, step_id: &str, phase: StepPhase) {
        let iteration = self.state.steps.get(step_id).map(|s| s.iteration).unwrap_or(0);
        self.params.sink.emit(Event::StepPhase {
            step_id: step_id.to_string(),
            phase,
            iteration,
        });
    }

    /// A dependency counts as satisfied when it succeeded, or when it failed
    /// under `on_failure: continue`.
    fn dep_satisfied(&self, dep: &str) -> Option<bool> {
        let status = self.state.steps.get(dep)?.status;
        let policy = self.rt.get(dep).map(|rt| rt.resolved.on_failure)?;
        match status {
            StepStatus::Succeeded => Some(true),
            StepStatus::Failed if policy == OnFailure::Continue => Some(true),
            _ => Some(false),
        }
    }

    fn has_dispatchable(&self) -> bool {
        self.state
            .steps
            .values()
            .any(|s| matches!(s.status, StepStatus::Ready | StepStatus::Running | StepStatus::Checking))
            || self.state.steps.values().any(|s| s.status == StepStatus::Pending)
    }

    /// Promote satisfied PENDING steps to READY, then dispatch READY steps
    /// in lexicographic order up to the concurrency bound.
    fn dispatch_ready(&mut self) {
        let ids: Vec<String> = self.state.steps.keys().cloned().collect();

        for id in &ids {
            if self.state.steps.get(id).map(|s| s.status) != Some(StepStatus::Pending) {
                continue;
            }
            let deps = self
                .rt
                .get(id)
                .map(|rt| rt.resolved.depends_on.clone())
                .unwrap_or_default();
            let mut satisfied = true;
            let mut dead = false;
            for dep in &deps {
                match self.dep_satisfied(dep) {
                    Some(true) => {}
                    Some(false) => {
                        satisfied = false;
                        // A terminal unsatisfied dependency means this step
                        // can never run.
                        if self
                            .state
                            .steps
                            .get(dep)
                            .map(|s| s.status.is_terminal())
                            .unwrap_or(false)
                        {
                            dead = true;
                        }
                    }
                    None => {
                        satisfied = false;
                        dead = true;
                    }
                }
            }
            if dead {
                self.set_status(id, StepStatus::Skipped);
            } else if satisfied {
                self.set_status(id, StepStatus::Ready);
            }
        }

        // BTreeMap iteration is lexicographic: the required tie-break.
        let ready: Vec<String> = self
            .state
            .steps
            .iter()
            .filter(|(_, s)| s.status == StepStatus::Ready)
            .map(|(id, _)| id.clone())
            .collect();

        // A zero bound would deadlock the dispatch loop
        let limit = self.params.def.concurrency.unwrap_or(usize::MAX).max(1);
        for id in ready {
            if self.running >= limit {
                break;
            }
            self.start_attempt(&id);
        }
    }

    fn set_status(&mut self, step_id: &str, status: StepStatus) {
        let now = self.executor.clock.epoch_ms();
        if let Some(state) = self.state.steps.get_mut(step_id) {
            state.status = status;
            if status == StepStatus::Running && state.started_at_ms.is_none() {
                state.started_at_ms = Some(now);
            }
            if status.is_terminal() {
                state.completed_at_ms = Some(now);
            }
            self.emit_state(step_id);
        }
    }

    fn start_attempt(&mut self, step_id: &str) {
        let Some(rt) = self.rt.get(step_id) else { return };
        let Some(worker) = rt.worker else {
            let error = "no worker resolved for step".to_string();
            self.fail_step(step_id, error);
            return;
        };
        let resolved = rt.resolved.clone();

        let first_attempt = self
            .state
            .steps
            .get(step_id)
            .map(|s| s.attempt == 0 && s.iteration == 0)
            .unwrap_or(false);
        if first_attempt {
            let doc = ResolvedStep {
                step_id: step_id.to_string(),
                worker,
                instructions: resolved.instructions.clone(),
                capabilities: resolved.capabilities.clone(),
                agent: resolved.agent.clone(),
                max_iterations: resolved.effective_max_iterations(),
                max_retries: resolved.max_retries,
            };
            if let Err(e) = context::write_resolved_instructions(&self.params.context_dir, &doc) {
                tracing::warn!(step = %step_id, error = %e, "context materialization failed");
            }
        }

        self.set_status(step_id, StepStatus::Running);
        self.emit_phase(step_id, StepPhase::Attempt);
        self.running += 1;

        let runner = Arc::clone(&self.executor.runner);
        let management = self.executor.management.clone();
        let cancel = self.params.cancel.clone();
        let workspace_dir = self.params.workspace_dir.clone();
        let context_dir = self.params.context_dir.clone();
        let tx = self.tx.clone();
        let id = step_id.to_string();
        let iteration = self.state.steps.get(step_id).map(|s| s.iteration).unwrap_or(0);
        let now_ms = self.executor.clock.epoch_ms();

        tokio::spawn(async move {
            if let Some(config) = management
                .as_ref()
                .filter(|c| c.enabled_for(HookPoint::PreStep))
            {
                let decision = invoke_hook(
                    runner.as_ref(),
                    config,
                    HookPoint::PreStep,
                    &id,
                    "running",
                    iteration,
                    &context_dir,
                    &workspace_dir,
                    &cancel,
                    now_ms,
                )
                .await;
                match decision.directive {
                    ManagementDirective::Skip => {
                        let _ = tx.send(StepMsg {
                            step_id: id,
                            outcome: Outcome::Attempt {
                                result: empty_result(WorkerStatus::Succeeded),
                                skipped_by_hook: true,
                                retry_requested: false,
                            },
                        });
                        return;
                    }
                    ManagementDirective::Abort => cancel.cancel(),
                    _ => {}
                }
            }

            let request = StepRunRequest::new(&id, worker, resolved.instructions.clone(), &workspace_dir)
                .capabilities(resolved.capabilities.clone())
                .env(resolved.env.clone());
            let request = match resolved.timeout {
                Some(timeout) => request.timeout(timeout),
                None => request,
            };

            let result = runner.run_step(request, &cancel, None).await;

            let mut retry_requested = false;
            if let Some(config) = management
                .as_ref()
                .filter(|c| c.enabled_for(HookPoint::PostStep))
            {
                let status = result.status.to_string();
                let decision = invoke_hook(
                    runner.as_ref(),
                    config,
                    HookPoint::PostStep,
                    &id,
                    &status,
                    iteration,
                    &context_dir,
                    &workspace_dir,
                    &cancel,
                    now_ms,
                )
                .await;
                match decision.directive {
                    ManagementDirective::Retry => retry_requested = true,
                    ManagementDirective::Abort => cancel.cancel(),
                    _ => {}
                }
            }

            let _ = tx.send(StepMsg {
                step_id: id,
                outcome: Outcome::Attempt { result, skipped_by_hook: false, retry_requested },
            });
        });
    }

    fn start_check(&mut self, step_id: &str) {
        let Some(rt) = self.rt.get(step_id) else { return };
        let Some(check) = rt.resolved.completion_check.clone() else { return };
        let step_worker = rt.worker;

        self.set_status(step_id, StepStatus::Checking);
        self.emit_phase(step_id, StepPhase::Check);
        self.running += 1;

        let runner = Arc::clone(&self.executor.runner);
        let cancel = self.params.cancel.clone();
        let workspace_dir = self.params.workspace_dir.clone();
        let decision_path = context::step_context_dir(&self.params.context_dir, step_id)
            .join(check.decision_file.as_deref().unwrap_or("decision.json"));
        let tx = self.tx.clone();
        let id = step_id.to_string();
        let iteration = self.state.steps.get(step_id).map(|s| s.iteration).unwrap_or(0);
        let vars = {
            let mut vars = self.params.vars.clone();
            vars.insert("step_id".to_string(), id.clone());
            vars.insert("workspace".to_string(), workspace_dir.display().to_string());
            vars.insert("iteration".to_string(), iteration.to_string());
            vars.insert("decision_file".to_string(), decision_path.display().to_string());
            vars
        };

        tokio::spawn(async move {
            // A stale verdict from the previous iteration must not count.
            let _ = std::fs::remove_file(&decision_path);

            // Same worker family unless the check overrides it.
            let worker = check.worker.or(step_worker).unwrap_or(WorkerKind::Custom);
            let instructions = roboppi_workflow::expand(&check.instructions, &vars);

            let request = StepRunRequest::new(format!("{id}#check"), worker, instructions, &workspace_dir)
                .mode(roboppi_core::OutputMode::Analyze)
                .env(HashMap::from([(
                    "ROBOPPI_DECISION_FILE".to_string(),
                    decision_path.display().to_string(),
                )]));
            let request = match check.timeout {
                Some(timeout) => request.timeout(timeout),
                None => request,
            };

            let run = runner.run_step(request, &cancel, None).await;

            if run.status == WorkerStatus::Cancelled {
                let _ = tx.send(StepMsg {
                    step_id: id,
                    outcome: Outcome::Check {
                        decision: CompletionDecision::Fail,
                        cancelled: true,
                    },
                });
                return;
            }

            let decision = std::fs::read_to_string(&decision_path)
                .ok()
                .and_then(|contents| parse_decision_file(&contents))
                .or_else(|| parse_decision_stdout(&run.stdout))
                .unwrap_or(CompletionDecision::Fail);

            let _ = tx.send(StepMsg {
                step_id: id,
                outcome: Outcome::Check { decision, cancelled: false },
            });
        });
    }

    fn handle(&mut self, msg: StepMsg) {
        let StepMsg { step_id, outcome } = msg;
        match outcome {
            Outcome::Attempt { result, skipped_by_hook, retry_requested } => {
                self.running -= 1;
                self.handle_attempt(&step_id, result, skipped_by_hook, retry_requested);
            }
            Outcome::Check { decision, cancelled } => {
                self.running -= 1;
                self.handle_check(&step_id, decision, cancelled);
            }
            Outcome::Backoff => {
                self.start_attempt(&step_id);
            }
        }
    }

    fn handle_attempt(
        &mut self,
        step_id: &str,
        result: StepRunResult,
        skipped_by_hook: bool,
        retry_requested: bool,
    ) {
        if skipped_by_hook {
            tracing::info!(step = %step_id, "step skipped by management hook");
            self.set_status(step_id, StepStatus::Skipped);
            return;
        }

        if let Some(rt) = self.rt.get_mut(step_id) {
            rt.last_stdout = result.stdout.clone();
        }

        match result.status {
            WorkerStatus::Succeeded => {
                if retry_requested && self.retry_budget_left(step_id) {
                    tracing::info!(step = %step_id, "management hook requested retry");
                    self.consume_retry(step_id);
                    self.begin_backoff(step_id);
                    return;
                }
                let wants_check = self
                    .rt
                    .get(step_id)
                    .map(|rt| rt.resolved.completion_check.is_some())
                    .unwrap_or(false);
                let iterations_left = self
                    .state
                    .steps
                    .get(step_id)
                    .map(|s| s.iteration < s.max_iterations)
                    .unwrap_or(false);
                if wants_check && iterations_left {
                    self.start_check(step_id);
                } else {
                    self.succeed_step(step_id);
                }
            }
            WorkerStatus::Cancelled => {
                self.set_status(step_id, StepStatus::Cancelled);
            }
            WorkerStatus::Failed => {
                let error_class = result.error_class.unwrap_or(ErrorClass::RetryableTransient);
                let error = result.error.unwrap_or_else(|| "worker failed".to_string());

                if error_class.is_fatal() {
                    tracing::error!(step = %step_id, error = %error, "fatal worker failure");
                    self.fatal_abort = true;
                    self.fail_step(step_id, error);
                    self.params.cancel.cancel();
                    return;
                }

                let policy = self
                    .rt
                    .get(step_id)
                    .map(|rt| rt.resolved.on_failure)
                    .unwrap_or_default();
                let retryable = error_class.is_retryable();

                if policy == OnFailure::Retry && retryable && self.retry_budget_left(step_id) {
                    self.consume_retry(step_id);
                    self.begin_backoff(step_id);
                } else {
                    self.fail_step(step_id, error);
                }
            }
        }
    }

    fn handle_check(&mut self, step_id: &str, decision: CompletionDecision, cancelled: bool) {
        if cancelled {
            self.set_status(step_id, StepStatus::Cancelled);
            return;
        }

        match decision {
            CompletionDecision::Complete => {
                if let Some(state) = self.state.steps.get_mut(step_id) {
                    state.completion_infra_failures = 0;
                    state.convergence_stage = Some("converged".to_string());
                }
                if let Some(rt) = self.rt.get_mut(step_id) {
                    rt.consecutive_incomplete = 0;
                }
                self.succeed_step(step_id);
            }
            CompletionDecision::Incomplete => {
                let (iteration, max_iterations) = {
                    let Some(state) = self.state.steps.get_mut(step_id) else { return };
                    state.completion_infra_failures = 0;
                    state.iteration += 1;
                    (state.iteration, state.max_iterations)
                };
                let stalls = {
                    let Some(rt) = self.rt.get_mut(step_id) else { return };
                    rt.consecutive_incomplete += 1;
                    rt.consecutive_incomplete
                };
                if let Some(state) = self.state.steps.get_mut(step_id) {
                    state.convergence_stall_count = Some(stalls);
                    state.convergence_stage = Some("iterating".to_string());
                }

                if iteration < max_iterations {
                    if stalls >= STALL_AFTER_INCOMPLETE {
                        self.fire_stall_hook(step_id, iteration);
                    }
                    // Another pass of the same worker
                    self.start_attempt(step_id);
                } else {
                    let policy = self
                        .rt
                        .get(step_id)
                        .map(|rt| rt.resolved.on_iterations_exhausted)
                        .unwrap_or_default();
                    match policy {
                        OnIterationsExhausted::Continue => self.succeed_step(step_id),
                        OnIterationsExhausted::Abort => {
                            tracing::warn!(step = %step_id, "iterations exhausted");
                            self.set_status(step_id, StepStatus::Incomplete);
                            self.propagate_skips(step_id);
                            self.workflow_failed = true;
                        }
                    }
                }
            }
            CompletionDecision::Fail => {
                let failures = {
                    let Some(state) = self.state.steps.get_mut(step_id) else { return };
                    state.completion_infra_failures += 1;
                    state.completion_infra_failures
                };
                if failures >= MAX_CHECK_INFRA_FAILURES {
                    self.fail_step(step_id, "completion check channel broken".to_string());
                } else {
                    tracing::warn!(
                        step = %step_id,
                        failures,
                        "completion check infrastructure failure, retrying check"
                    );
                    self.start_check(step_id);
                }
            }
        }
    }

    fn fire_stall_hook(&self, step_id: &str, iteration: u32) {
        let Some(config) = self
            .executor
            .management
            .as_ref()
            .filter(|c| c.enabled_for(HookPoint::OnStall))
            .cloned()
        else {
            return;
        };
        let runner = Arc::clone(&self.executor.runner);
        let cancel = self.params.cancel.clone();
        let context_dir = self.params.context_dir.clone();
        let workspace_dir = self.params.workspace_dir.clone();
        let id = step_id.to_string();
        let now_ms = self.executor.clock.epoch_ms();

        tokio::spawn(async move {
            let decision = invoke_hook(
                runner.as_ref(),
                &config,
                HookPoint::OnStall,
                &id,
                "checking",
                iteration,
                &context_dir,
                &workspace_dir,
                &cancel,
                now_ms,
            )
            .await;
            if decision.directive == ManagementDirective::Abort {
                cancel.cancel();
            }
        });
    }

    fn retry_budget_left(&self, step_id: &str) -> bool {
        let max_retries = self
            .rt
            .get(step_id)
            .map(|rt| rt.resolved.max_retries)
            .unwrap_or(0);
        let used = self.state.steps.get(step_id).map(|s| s.attempt).unwrap_or(0);
        used < max_retries
    }

    fn consume_retry(&mut self, step_id: &str) {
        if let Some(state) = self.state.steps.get_mut(step_id) {
            state.attempt += 1;
        }
    }

    fn begin_backoff(&mut self, step_id: &str) {
        let attempt = self.state.steps.get(step_id).map(|s| s.attempt).unwrap_or(1);
        self.emit_phase(step_id, StepPhase::Backoff);
        self.running += 1;

        let delay = backoff_delay(attempt.saturating_sub(1));
        let tx = self.tx.clone();
        let cancel = self.params.cancel.clone();
        let id = step_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
            let _ = tx.send(StepMsg { step_id: id, outcome: Outcome::Backoff });
        });
    }

    fn succeed_step(&mut self, step_id: &str) {
        let outputs = self
            .rt
            .get(step_id)
            .map(|rt| rt.resolved.outputs.clone())
            .unwrap_or_default();
        if !outputs.is_empty() {
            let stdout = self
                .rt
                .get(step_id)
                .map(|rt| rt.last_stdout.clone())
                .unwrap_or_default();
            if let Err(e) = context::fill_outputs(&self.params.workspace_dir, &outputs, &stdout) {
                tracing::warn!(step = %step_id, error = %e, "output materialization failed");
                self.fail_step(step_id, e.to_string());
                return;
            }
        }
        self.set_status(step_id, StepStatus::Succeeded);
    }

    /// Fail a step and apply its failure policy to the rest of the graph.
    fn fail_step(&mut self, step_id: &str, error: String) {
        let now = self.executor.clock.epoch_ms();
        if let Some(state) = self.state.steps.get_mut(step_id) {
            state.status = StepStatus::Failed;
            state.error = Some(error);
            state.completed_at_ms = Some(now);
        }
        self.emit_state(step_id);

        let policy = self
            .rt
            .get(step_id)
            .map(|rt| rt.resolved.on_failure)
            .unwrap_or_default();
        if policy == OnFailure::Continue {
            tracing::info!(step = %step_id, "step failed, continuing per policy");
            return;
        }
        self.propagate_skips(step_id);
        self.workflow_failed = true;
    }

    /// Mark every transitive dependent of `origin` SKIPPED.
    fn propagate_skips(&mut self, origin: &str) {
        for id in transitive_dependents(&self.params.def, origin) {
            let status = self.state.steps.get(&id).map(|s| s.status);
            if matches!(status, Some(s) if !s.is_terminal()) {
                self.set_status(&id, StepStatus::Skipped);
            }
        }
    }

    async fn finalize(mut self, ended_by: Option<WorkflowStatus>) -> WorkflowState {
        if let Some(status) = ended_by {
            // Cancel outstanding work and mark non-terminal steps
            self.params.cancel.cancel();
            let ids: Vec<String> = self.state.steps.keys().cloned().collect();
            for id in ids {
                let current = self.state.steps.get(&id).map(|s| s.status);
                match current {
                    Some(StepStatus::Running) | Some(StepStatus::Checking) => {
                        self.set_status(&id, StepStatus::Cancelled);
                    }
                    Some(s) if !s.is_terminal() => {
                        self.set_status(&id, StepStatus::Skipped);
                    }
                    _ => {}
                }
            }
            self.state.status = status;
        } else if self.params.cancel.is_cancelled() && !self.fatal_abort {
            self.state.status = WorkflowStatus::Cancelled;
        } else if self.workflow_failed {
            self.state.status = WorkflowStatus::Failed;
        } else {
            self.state.status = WorkflowStatus::Succeeded;
        }

        self.state.finished_at_ms = Some(self.executor.clock.epoch_ms());
        self.params.sink.emit(Event::WorkflowFinished {
            workflow: self.state.workflow.clone(),
            status: self.state.status,
            finished_at_ms: self.state.finished_at_ms.unwrap_or_default(),
        });
        self.state
    }
}

fn empty_result(status: WorkerStatus) -> StepRunResult {
    StepRunResult {
        status,
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        observations: Vec::new(),
        duration_ms: 0,
        error_class: None,
        error: None,
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
