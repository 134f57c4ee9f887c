// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load classification for admission control.
//!
//! Load is the max of three normalized pressure signals; the response is
//! the most severe threshold the load reaches.

use parking_lot::Mutex;

/// Response, from healthiest to most loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResponse {
    Accept,
    /// Shed optional work (smaller budgets, fewer tokens)
    Degrade,
    /// Queue but do not start new work
    Defer,
    /// Refuse new submissions outright
    Reject,
}

/// Classification thresholds, each in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub reject: f64,
    pub defer: f64,
    pub degrade: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { reject: 0.9, defer: 0.75, degrade: 0.5 }
    }
}

/// Normalization ceilings for the raw signals.
#[derive(Debug, Clone, Copy)]
pub struct Ceilings {
    pub active_permits: f64,
    pub queue_depth: f64,
    pub avg_latency_ms: f64,
}

impl Default for Ceilings {
    fn default() -> Self {
        Self { active_permits: 100.0, queue_depth: 1000.0, avg_latency_ms: 10_000.0 }
    }
}

/// One snapshot of the raw load signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadMetrics {
    pub active_permits: u32,
    pub queue_depth: u32,
    pub avg_latency_ms: u64,
}

pub struct BackpressureController {
    thresholds: Thresholds,
    ceilings: Ceilings,
    metrics: Mutex<LoadMetrics>,
}

impl Default for BackpressureController {
    fn default() -> Self {
        Self::new(Thresholds::default(), Ceilings::default())
    }
}

impl BackpressureController {
    pub fn new(thresholds: Thresholds, ceilings: Ceilings) -> Self {
        Self { thresholds, ceilings, metrics: Mutex::new(LoadMetrics::default()) }
    }

    /// Replace the current snapshot atomically.
    pub fn update_metrics(&self, metrics: LoadMetrics) {
        *self.metrics.lock() = metrics;
    }

    pub fn metrics(&self) -> LoadMetrics {
        *self.metrics.lock()
    }

    /// `L = max(permits/ceilA, depth/ceilQ, latency/ceilL)`.
    pub fn load(&self) -> f64 {
        let m = self.metrics();
        let permits = f64::from(m.active_permits) / self.ceilings.active_permits;
        let depth = f64::from(m.queue_depth) / self.ceilings.queue_depth;
        let latency = m.avg_latency_ms as f64 / self.ceilings.avg_latency_ms;
        permits.max(depth).max(latency)
    }

    pub fn classify(&self) -> LoadResponse {
        let load = self.load();
        if load >= self.thresholds.reject {
            LoadResponse::Reject
        } else if load >= self.thresholds.defer {
            LoadResponse::Defer
        } else if load >= self.thresholds.degrade {
            LoadResponse::Degrade
        } else {
            LoadResponse::Accept
        }
    }
}

#[cfg(test)]
#[path = "backpressure_tests.rs"]
mod tests;
