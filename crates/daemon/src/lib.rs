// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roboppi-daemon: the trigger engine.
//!
//! Merges event sources (cron, interval, filesystem watch, webhook, manual
//! command), gates each event through per-trigger state and the
//! evaluate-gate, and drives the workflow executor. Worker attempts go
//! through the supervised Core subprocess over JSON-lines IPC, or run
//! in-process when no Core is configured.

pub mod analyzer;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod env;
pub mod gate;
pub mod health;
pub mod merge;
pub mod runner_ipc;
pub mod sources;
pub mod supervisor;

pub use config::{
    AnalyzerConfig, ConfigError, CoreProcessConfig, DaemonConfig, EvaluateConfig, SourceConfig,
    TriggerConfig,
};
pub use daemon::{run_daemon, DaemonError};
pub use dispatch::Dispatcher;
pub use gate::{evaluate_gate, GateDecision};
pub use merge::{merge_event_sources, MergedEvents, DEFAULT_MERGE_BUFFER};
pub use runner_ipc::IpcStepRunner;
pub use sources::{DaemonEvent, EventSource};
pub use supervisor::{Supervisor, SupervisorConfig};
