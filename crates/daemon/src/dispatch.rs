// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger dispatch.
//!
//! One event in, at most one workflow run out: per-trigger state gate
//! (enabled, cooldown), evaluate-gate, context artifacts, executor run,
//! execution record, cooldown and failure accounting, optional analyzer.

use crate::analyzer::analyze_result;
use crate::config::TriggerConfig;
use crate::gate::{evaluate_gate, GateContext, GateDecision};
use crate::sources::DaemonEvent;
use roboppi_adapters::StepRunner;
use roboppi_core::{Clock, ExecutionRecord, WorkflowStatus};
use roboppi_engine::{
    EventLogSink, ExecuteParams, Executor, MultiSink, StateFileSink, TelemetrySink,
};
use roboppi_store::TriggerStore;
use roboppi_workflow::{load_agent_catalog, load_workflow};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Dispatcher<C: Clock> {
    /// Runs workflow steps (Core-backed or in-process).
    step_runner: Arc<dyn StepRunner>,
    /// Runs gates and analyzers, always in-process.
    local_runner: Arc<dyn StepRunner>,
    store: Arc<TriggerStore>,
    triggers: HashMap<String, TriggerConfig>,
    clock: C,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(
        step_runner: Arc<dyn StepRunner>,
        local_runner: Arc<dyn StepRunner>,
        store: Arc<TriggerStore>,
        triggers: Vec<TriggerConfig>,
        clock: C,
    ) -> Self {
        Self {
            step_runner,
            local_runner,
            store,
            triggers: triggers.into_iter().map(|t| (t.id.clone(), t)).collect(),
            clock,
        }
    }

    /// Handle one merged event end to end.
    pub async fn handle_event(&self, event: DaemonEvent, cancel: &CancellationToken) {
        let Some(trigger) = self.triggers.get(&event.source_id) else {
            tracing::warn!(source = %event.source_id, "event for unknown trigger");
            return;
        };

        let now_ms = self.clock.epoch_ms();
        let mut state = match self.store.load_state(&trigger.id) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(trigger = %trigger.id, error = %e, "trigger state load failed");
                return;
            }
        };

        if !trigger.enabled || !state.enabled {
            tracing::debug!(trigger = %trigger.id, "trigger disabled, skipping");
            return;
        }
        if let Some(until) = state.cooldown_until_ms {
            if now_ms < until {
                tracing::debug!(trigger = %trigger.id, until, "in cooldown, skipping");
                return;
            }
        }

        let event_json =
            serde_json::to_string(&event.payload).unwrap_or_else(|_| "null".to_string());
        let last_result_json = self
            .store
            .load_last_result::<serde_json::Value>(&trigger.id)
            .ok()
            .flatten()
            .and_then(|v| serde_json::to_string(&v).ok())
            .unwrap_or_else(|| "null".to_string());

        // Evaluate-gate
        if let Some(evaluate) = &trigger.evaluate {
            let context = GateContext {
                event_json: event_json.clone(),
                timestamp_ms: event.timestamp_ms,
                trigger_id: trigger.id.clone(),
                execution_count: state.execution_count,
                workspace: trigger.workspace.display().to_string(),
                last_result_json: last_result_json.clone(),
            };
            let decision = evaluate_gate(
                self.local_runner.as_ref(),
                evaluate,
                &context,
                &trigger.workspace,
                cancel,
            )
            .await;
            if decision == GateDecision::Skip {
                tracing::info!(trigger = %trigger.id, "evaluate gate skipped event");
                return;
            }
        }

        // Load the workflow fresh: edits take effect on the next firing
        let def = match load_workflow(&trigger.workflow) {
            Ok(def) => def,
            Err(e) => {
                tracing::error!(trigger = %trigger.id, error = %e, "workflow load failed");
                state.consecutive_failures += 1;
                let _ = self.store.save_state(&trigger.id, &state);
                return;
            }
        };
        let catalog = trigger
            .agents
            .as_ref()
            .and_then(|path| match load_agent_catalog(path) {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::warn!(trigger = %trigger.id, error = %e, "agent catalog load failed");
                    None
                }
            });

        let context_dir = def
            .context_dir
            .as_ref()
            .map(|dir| trigger.workspace.join(dir))
            .unwrap_or_else(|| {
                self.store.state_dir().join("triggers").join(&trigger.id).join("context")
            });

        // Context artifacts for workers and the analyzer
        if let Err(e) = std::fs::create_dir_all(&context_dir) {
            tracing::error!(error = %e, "context dir creation failed");
            return;
        }
        let _ = roboppi_store::write_json_atomic(&context_dir.join("event.json"), &event.payload);
        if let Ok(Some(last)) = self.store.load_last_result::<serde_json::Value>(&trigger.id) {
            let _ = roboppi_store::write_json_atomic(&context_dir.join("last-result.json"), &last);
        }
        if !trigger.env.is_empty() {
            let _ = roboppi_store::write_json_atomic(&context_dir.join("env.json"), &trigger.env);
        }

        let vars = HashMap::from([
            ("event".to_string(), event_json),
            ("last_result".to_string(), last_result_json),
            ("timestamp".to_string(), event.timestamp_ms.to_string()),
            ("workspace".to_string(), trigger.workspace.display().to_string()),
            ("trigger_id".to_string(), trigger.id.clone()),
            ("execution_count".to_string(), state.execution_count.to_string()),
        ]);

        let trigger_dir = self.store.state_dir().join("triggers").join(&trigger.id);
        let state_sink = Arc::new(StateFileSink::new(trigger_dir.join("state-live.json")));
        let log_sink = Arc::new(EventLogSink::new(trigger_dir.join("events.jsonl")));
        let sink: Arc<dyn TelemetrySink> =
            Arc::new(MultiSink::new(vec![state_sink.clone() as Arc<dyn TelemetrySink>, log_sink]));

        let started_at_ms = self.clock.epoch_ms();
        tracing::info!(trigger = %trigger.id, workflow = %def.name, "workflow starting");

        let executor = Executor::new(Arc::clone(&self.step_runner));
        let run_cancel = cancel.child_token();
        let result = executor
            .execute(ExecuteParams {
                def,
                workspace_dir: trigger.workspace.clone(),
                context_dir: context_dir.clone(),
                catalog,
                vars,
                cancel: run_cancel,
                sink,
            })
            .await;

        state_sink.flush().await;
        let completed_at_ms = self.clock.epoch_ms();
        tracing::info!(
            trigger = %trigger.id,
            status = %result.status,
            elapsed_ms = completed_at_ms - started_at_ms,
            "workflow finished"
        );

        // Bookkeeping: record, last result, trigger state
        let record = ExecutionRecord {
            trigger_id: trigger.id.clone(),
            started_at_ms,
            completed_at_ms,
            status: result.status,
            workflow_id: result.workflow.clone(),
        };
        if let Err(e) = self.store.record_execution(&record) {
            tracing::error!(trigger = %trigger.id, error = %e, "execution record failed");
        }
        if let Err(e) = self.store.save_last_result(&trigger.id, &result) {
            tracing::error!(trigger = %trigger.id, error = %e, "last result write failed");
        }

        state.last_fired_at_ms = Some(started_at_ms);
        state.execution_count += 1;
        if result.status == WorkflowStatus::Succeeded {
            state.consecutive_failures = 0;
        } else {
            state.consecutive_failures += 1;
        }
        if let Some(cooldown) = trigger.cooldown {
            state.cooldown_until_ms = Some(completed_at_ms + cooldown.as_millis() as u64);
        }
        if let Err(e) = self.store.save_state(&trigger.id, &state) {
            tracing::error!(trigger = %trigger.id, error = %e, "trigger state save failed");
        }

        // Analyzer runs after bookkeeping so a crash there loses nothing
        if let Some(analyzer) = &trigger.analyzer {
            if let Err(e) = analyze_result(
                self.local_runner.as_ref(),
                analyzer,
                &trigger.id,
                &result,
                &trigger.workspace,
                &context_dir,
                cancel,
            )
            .await
            {
                tracing::error!(trigger = %trigger.id, error = %e, "analyzer output rejected");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
