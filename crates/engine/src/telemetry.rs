// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry sinks.
//!
//! The executor emits [`Event`]s; sinks fan them out. The state-file sink
//! keeps a live `state.json` through a single-writer chain debounced to
//! 500 ms, with a final flush on [`StateFileSink::flush`]. The event log is
//! an append-only JSON-lines file.

use parking_lot::Mutex;
use roboppi_core::{Event, WorkflowState};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Debounce window for state.json writes.
pub const STATE_WRITE_DEBOUNCE: Duration = Duration::from_millis(500);

pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Discards everything.
#[derive(Default, Clone)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Collects events in memory (tests, analyzers).
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Appends each event as one JSON line.
pub struct EventLogSink {
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl EventLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: Mutex::new(None) }
    }
}

impl TelemetrySink for EventLogSink {
    fn emit(&self, event: Event) {
        let mut guard = self.file.lock();
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match std::fs::OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "event log open failed");
                    return;
                }
            }
        }
        if let Some(file) = guard.as_mut() {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    if let Err(e) = writeln!(file, "{line}") {
                        tracing::warn!(error = %e, "event log write failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "event serialize failed"),
            }
        }
    }
}

struct StateDoc {
    state: Option<WorkflowState>,
}

impl StateDoc {
    fn apply(&mut self, event: &Event) {
        match event {
            Event::WorkflowStarted { workflow, started_at_ms } => {
                self.state = Some(WorkflowState::new(workflow.clone(), *started_at_ms));
            }
            Event::StepState { step_id, state } => {
                if let Some(doc) = &mut self.state {
                    doc.steps.insert(step_id.clone(), state.clone());
                }
            }
            Event::StepPhase { .. } => {}
            Event::WorkflowFinished { status, finished_at_ms, .. } => {
                if let Some(doc) = &mut self.state {
                    doc.status = *status;
                    doc.finished_at_ms = Some(*finished_at_ms);
                }
            }
        }
    }
}

/// Maintains `state.json` from the event stream.
///
/// Writes go through one writer task; bursts collapse into a single write
/// 500 ms after the first dirty event.
pub struct StateFileSink {
    doc: Arc<Mutex<StateDoc>>,
    path: PathBuf,
    dirty_tx: mpsc::Sender<()>,
    writer: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl StateFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = Arc::new(Mutex::new(StateDoc { state: None }));
        let (dirty_tx, mut dirty_rx) = mpsc::channel::<()>(1);

        let writer_doc = Arc::clone(&doc);
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            while dirty_rx.recv().await.is_some() {
                tokio::time::sleep(STATE_WRITE_DEBOUNCE).await;
                // Collapse any dirtiness signalled during the sleep
                while dirty_rx.try_recv().is_ok() {}
                write_state(&writer_path, &writer_doc);
            }
        });

        Self { doc, path, dirty_tx, writer: Mutex::new(Some(writer)) }
    }

    /// Write any pending state immediately and stop the writer chain.
    pub async fn flush(&self) {
        let handle = self.writer.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        write_state(&self.path, &self.doc);
    }
}

fn write_state(path: &Path, doc: &Arc<Mutex<StateDoc>>) {
    let snapshot = doc.lock().state.clone();
    if let Some(state) = snapshot {
        if let Err(e) = roboppi_store::write_json_atomic(path, &state) {
            tracing::warn!(path = %path.display(), error = %e, "state.json write failed");
        }
    }
}

impl TelemetrySink for StateFileSink {
    fn emit(&self, event: Event) {
        self.doc.lock().apply(&event);
        // A full channel means a write is already scheduled
        let _ = self.dirty_tx.try_send(());
    }
}

/// Fan out to several sinks.
pub struct MultiSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for MultiSink {
    fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
