// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry backoff: exponential from 1s, doubling, capped at 60s, jittered
//! ±25%.

use rand::Rng;
use std::time::Duration;

const BASE: Duration = Duration::from_secs(1);
const CAP: Duration = Duration::from_secs(60);
const JITTER: f64 = 0.25;

/// Delay before re-dispatching attempt `attempt` (0-based count of failures
/// so far: the first retry waits ~1s).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.min(6); // 2^6 = 64 > cap, further doubling is moot
    let raw = BASE.saturating_mul(1u32 << exp).min(CAP);
    let jitter = rand::thread_rng().gen_range(-JITTER..=JITTER);
    raw.mul_f64(1.0 + jitter)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
