// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roboppi-sched: the Core process.
//!
//! Owns the priority queue, in-flight registry, workspace-lock table, and
//! backpressure controller. The service loop speaks the wire protocol on
//! stdin/stdout and drives worker attempts through the adapter layer.

pub mod backpressure;
pub mod inflight;
pub mod lock;
pub mod queue;
pub mod service;

pub use backpressure::{BackpressureController, Ceilings, LoadMetrics, LoadResponse, Thresholds};
pub use inflight::{AdmissionAction, InFlightRegistry};
pub use lock::{WorkspaceLockTable, DEFAULT_MAX_LOCK_HOLD, DEFAULT_WAIT_TIMEOUT};
pub use queue::PriorityQueue;
pub use service::{CoreConfig, CoreService};
