// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-source merge.
//!
//! Merges any number of sources into one stream in arrival order. The
//! buffer is bounded: on overflow the oldest event is dropped; the first
//! overflow logs a warning, subsequent ones drop silently. The merged
//! stream ends when every source has ended. A source that fails simply
//! ends; the merge keeps going.

use crate::sources::{DaemonEvent, EventSource};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Default merged-buffer bound.
pub const DEFAULT_MERGE_BUFFER: usize = 10_000;

struct MergeInner {
    queue: Mutex<VecDeque<DaemonEvent>>,
    notify: Notify,
    live_sources: AtomicUsize,
    max_buffer: usize,
    overflow_warned: AtomicBool,
}

impl MergeInner {
    fn push(&self, event: DaemonEvent) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.max_buffer {
                queue.pop_front();
                if !self.overflow_warned.swap(true, Ordering::SeqCst) {
                    tracing::warn!(
                        max_buffer = self.max_buffer,
                        "merged event buffer overflow, dropping oldest"
                    );
                }
            }
            queue.push_back(event);
        }
        self.notify.notify_waiters();
    }

    fn source_ended(&self) {
        self.live_sources.fetch_sub(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// The merged stream.
pub struct MergedEvents {
    inner: Arc<MergeInner>,
}

impl MergedEvents {
    /// Next event in arrival order; `None` once every source has ended and
    /// the buffer is drained.
    pub async fn recv(&mut self) -> Option<DaemonEvent> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // await cannot be lost.
            notified.as_mut().enable();

            if let Some(event) = self.inner.queue.lock().pop_front() {
                return Some(event);
            }
            if self.inner.live_sources.load(Ordering::SeqCst) == 0 {
                // Drain anything that raced in after the first check
                return self.inner.queue.lock().pop_front();
            }
            notified.await;
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

/// Start every source and return the merged stream.
pub fn merge_event_sources(
    sources: Vec<Box<dyn EventSource>>,
    max_buffer: usize,
    stop: CancellationToken,
) -> MergedEvents {
    let inner = Arc::new(MergeInner {
        queue: Mutex::new(VecDeque::new()),
        notify: Notify::new(),
        live_sources: AtomicUsize::new(sources.len()),
        max_buffer,
        overflow_warned: AtomicBool::new(false),
    });

    for source in sources {
        let id = source.id().to_string();
        let inner = Arc::clone(&inner);
        let stop = stop.clone();
        tokio::spawn(async move {
            // Small per-source channel; the merge buffer does the real
            // bounding.
            let (tx, mut rx) = mpsc::channel::<DaemonEvent>(32);
            let pump = {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        inner.push(event);
                    }
                })
            };
            source.run(tx, stop).await;
            let _ = pump.await;
            tracing::debug!(source = %id, "event source ended");
            inner.source_ended();
        });
    }

    MergedEvents { inner }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
