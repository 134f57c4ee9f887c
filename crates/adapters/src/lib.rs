// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roboppi-adapters: the host side of worker execution.
//!
//! The process manager owns child lifecycle (spawn, TERM→KILL shutdown,
//! tracking); the subprocess layer streams line-buffered output; worker
//! adapters map a [`roboppi_core::WorkerKind`] to the concrete CLI argv.

pub mod process;
pub mod runner;
pub mod subprocess;
pub mod worker;

pub use process::{ProcessManager, RunningChild, ShutdownOutcome, SpawnError, SpawnSpec};
pub use runner::{LocalStepRunner, StepRunRequest, StepRunResult, StepRunner};
#[cfg(any(test, feature = "test-support"))]
pub use runner::{FakeStepRunner, ScriptedOutcome};
pub use subprocess::{run_streaming, CommandOutput, OutputStream, Termination, WorkerEvent};
pub use worker::{command_for, synthesize_observations, OBSERVATION_FULL_LIMIT};
