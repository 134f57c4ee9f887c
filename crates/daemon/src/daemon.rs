// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: assemble sources, merge, dispatch until shutdown.

use crate::config::{DaemonConfig, SourceConfig};
use crate::dispatch::Dispatcher;
use crate::env;
use crate::merge::{merge_event_sources, DEFAULT_MERGE_BUFFER};
use crate::sources::{
    CommandListener, CommandSource, CronSource, EventSource, FsWatchSource, IntervalSource,
    WebhookServer, WebhookSource,
};
use crate::supervisor::{Supervisor, SupervisorConfig};
use roboppi_adapters::{LocalStepRunner, ProcessManager, StepRunner};
use roboppi_core::SystemClock;
use roboppi_store::TriggerStore;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("no state directory could be resolved")]
    NoStateDir,
    #[error("trigger {trigger}: {message}")]
    BadTrigger { trigger: String, message: String },
    #[error(
        "webhook trigger {0:?} configured but no webhook_addr is set"
    )]
    NoWebhookAddr(String),
}

/// Run the daemon until `shutdown` fires.
///
/// Per-workflow failures never exit the daemon; they are recorded in the
/// trigger's `consecutive_failures`.
pub async fn run_daemon(config: DaemonConfig, shutdown: CancellationToken) -> Result<(), DaemonError> {
    env::apply_env_prefix_aliases();

    let state_dir = config
        .state_dir
        .clone()
        .or_else(env::state_dir)
        .ok_or(DaemonError::NoStateDir)?;
    let mut store = TriggerStore::new(&state_dir);
    if let Some(max_history) = config.max_history {
        store = store.with_max_history(max_history);
    }
    let store = Arc::new(store);

    let manager = ProcessManager::new();
    let local_runner: Arc<dyn StepRunner> = Arc::new(LocalStepRunner::new(manager.clone()));

    // Worker attempts go through the Core when one is configured
    let mut supervisor_handle = None;
    let step_runner: Arc<dyn StepRunner> = if config.core.argv.is_empty() {
        tracing::info!("no core configured, running workers in-process");
        Arc::clone(&local_runner)
    } else {
        let supervisor = Arc::new(Supervisor::new(
            SupervisorConfig::new(config.core.argv.clone(), std::env::current_dir().unwrap_or_default()),
            manager.clone(),
        ));
        let runner = supervisor.step_runner();
        tokio::spawn(Arc::clone(&supervisor).run());
        supervisor_handle = Some(supervisor);
        runner
    };

    // Shared servers for webhook and command triggers
    let webhook_server = config.webhook_addr.as_ref().map(|addr| WebhookServer::new(addr.clone()));
    let command_listener = CommandListener::new(state_dir.join("command.sock"));
    let mut needs_command_listener = false;

    let mut sources: Vec<Box<dyn EventSource>> = Vec::new();
    for trigger in &config.triggers {
        let source: Box<dyn EventSource> = match &trigger.source {
            SourceConfig::Cron { expr } => Box::new(
                CronSource::new(&trigger.id, expr).map_err(|message| DaemonError::BadTrigger {
                    trigger: trigger.id.clone(),
                    message,
                })?,
            ),
            SourceConfig::Interval { every } => {
                Box::new(IntervalSource::new(&trigger.id, *every))
            }
            SourceConfig::Fswatch { path, patterns } => {
                Box::new(FsWatchSource::new(&trigger.id, path.clone(), patterns.clone()))
            }
            SourceConfig::Webhook { path } => {
                let server = webhook_server
                    .as_ref()
                    .ok_or_else(|| DaemonError::NoWebhookAddr(trigger.id.clone()))?;
                let name = path.clone().unwrap_or_else(|| trigger.id.clone());
                Box::new(WebhookSource::new(&trigger.id, server.register(&name)))
            }
            SourceConfig::Command {} => {
                needs_command_listener = true;
                Box::new(CommandSource::new(
                    &trigger.id,
                    command_listener.register(&trigger.id),
                ))
            }
        };
        sources.push(source);
    }

    if let Some(server) = webhook_server {
        tokio::spawn(server.serve(shutdown.child_token()));
    }
    if needs_command_listener {
        tokio::spawn(command_listener.clone().serve(shutdown.child_token()));
    }

    let dispatcher = Dispatcher::new(
        step_runner,
        local_runner,
        Arc::clone(&store),
        config.triggers.clone(),
        SystemClock,
    );

    tracing::info!(
        triggers = config.triggers.len(),
        state_dir = %state_dir.display(),
        "daemon started"
    );

    let mut events = merge_event_sources(sources, DEFAULT_MERGE_BUFFER, shutdown.child_token());
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.cancelled() => break,
        };
        let Some(event) = event else {
            tracing::info!("all event sources ended");
            break;
        };
        tracing::debug!(source = %event.source_id, "event received");
        dispatcher.handle_event(event, &shutdown).await;
    }

    if let Some(supervisor) = supervisor_handle {
        supervisor.stop();
    }
    manager.kill_all().await;
    tracing::info!("daemon stopped");
    Ok(())
}
