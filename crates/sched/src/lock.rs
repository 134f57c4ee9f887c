// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory workspace lock.
//!
//! Mutual exclusion keyed by workspace path, with a FIFO waiter queue per
//! key. Holds expire: a holder past its maximum hold duration is released
//! on next access and its waiters are notified. At any instant at most one
//! non-expired holder exists per workspace.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Default maximum hold before a lock is considered expired.
pub const DEFAULT_MAX_LOCK_HOLD: Duration = Duration::from_secs(5 * 60);

/// Default time a waiter is willing to queue.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Expiry is also detected while queued, on this poll cadence.
const WAITER_RECHECK: Duration = Duration::from_millis(100);

struct Holder {
    task_id: String,
    acquired_at: Instant,
    max_hold: Duration,
}

impl Holder {
    fn expired(&self, now: Instant) -> bool {
        now > self.acquired_at + self.max_hold
    }
}

#[derive(Default)]
struct LockState {
    holder: Option<Holder>,
    waiters: VecDeque<oneshot::Sender<()>>,
}

#[derive(Clone, Default)]
pub struct WorkspaceLockTable {
    inner: Arc<Mutex<HashMap<String, LockState>>>,
    max_hold: Option<Duration>,
}

impl WorkspaceLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default maximum hold for all acquisitions.
    pub fn with_max_hold(mut self, max_hold: Duration) -> Self {
        self.max_hold = Some(max_hold);
        self
    }

    fn effective_max_hold(&self) -> Duration {
        self.max_hold.unwrap_or(DEFAULT_MAX_LOCK_HOLD)
    }

    /// Drop an expired holder and wake the head waiter.
    fn sweep(state: &mut LockState, now: Instant) {
        let expired = state.holder.as_ref().is_some_and(|h| h.expired(now));
        if expired {
            if let Some(holder) = state.holder.take() {
                tracing::warn!(task = %holder.task_id, "workspace lock expired, auto-releasing");
            }
            Self::wake_head(state);
        }
    }

    fn wake_head(state: &mut LockState) {
        while let Some(tx) = state.waiters.pop_front() {
            // A waiter whose receiver is gone (timed out) is skipped
            if tx.send(()).is_ok() {
                break;
            }
        }
    }

    /// Non-blocking acquire. Returns true when the lock was taken.
    pub fn try_acquire(&self, workspace: &str, task_id: &str) -> bool {
        let now = Instant::now();
        let mut table = self.inner.lock();
        let state = table.entry(workspace.to_string()).or_default();
        Self::sweep(state, now);
        if state.holder.is_some() {
            return false;
        }
        state.holder = Some(Holder {
            task_id: task_id.to_string(),
            acquired_at: now,
            max_hold: self.effective_max_hold(),
        });
        true
    }

    /// Queue until the lock can be taken, up to `timeout`. A waiter woken by
    /// a release races for the acquire; losing the race re-enqueues it.
    pub async fn wait_for_lock(&self, workspace: &str, task_id: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_acquire(workspace, task_id) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            let (tx, rx) = oneshot::channel();
            {
                let mut table = self.inner.lock();
                let state = table.entry(workspace.to_string()).or_default();
                state.waiters.push_back(tx);
            }

            // Wake on release, or recheck for expiry, or give up at deadline
            let recheck = WAITER_RECHECK.min(deadline - now);
            let _ = tokio::time::timeout(recheck, rx).await;
        }
    }

    /// Release by the holder. Returns false when `task_id` does not hold
    /// the lock.
    pub fn release(&self, workspace: &str, task_id: &str) -> bool {
        let mut table = self.inner.lock();
        let Some(state) = table.get_mut(workspace) else {
            return false;
        };
        match &state.holder {
            Some(holder) if holder.task_id == task_id => {
                state.holder = None;
                Self::wake_head(state);
                true
            }
            _ => false,
        }
    }

    /// Administrative release regardless of holder.
    pub fn force_release(&self, workspace: &str) {
        let mut table = self.inner.lock();
        if let Some(state) = table.get_mut(workspace) {
            state.holder = None;
            Self::wake_head(state);
        }
    }

    /// Current non-expired holder for a workspace.
    pub fn holder(&self, workspace: &str) -> Option<String> {
        let now = Instant::now();
        let mut table = self.inner.lock();
        let state = table.get_mut(workspace)?;
        Self::sweep(state, now);
        state.holder.as_ref().map(|h| h.task_id.clone())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
