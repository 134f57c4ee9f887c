// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roboppi-engine: the workflow executor.
//!
//! Drives a validated workflow DAG through its step state machine: bounded
//! concurrency, per-step iteration loops with completion checks, failure
//! policies with backoff, context materialization, and management hooks.

pub mod context;
pub mod executor;
pub mod management;
pub mod retry;
pub mod telemetry;

pub use context::{fill_outputs, write_resolved_instructions, ContextError, ResolvedStep};
pub use executor::{ExecuteParams, Executor};
pub use management::{resolve_decision, HookPoint, ManagementConfig};
pub use retry::backoff_delay;
pub use telemetry::{EventLogSink, MemorySink, MultiSink, NullSink, StateFileSink, TelemetrySink};
