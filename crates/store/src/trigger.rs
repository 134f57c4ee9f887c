// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-trigger state, last results, and bounded execution history.
//!
//! Layout under the state directory:
//!
//! ```text
//! <state>/daemon.json
//! <state>/triggers/<id>/state.json
//! <state>/triggers/<id>/last-result.json
//! <state>/triggers/<id>/history/<completed_at>.json
//! ```
//!
//! History filenames are zero-padded 13-digit epoch milliseconds so
//! lexicographic order is chronological order (13 digits cover epoch ms
//! until the year 2286).

use crate::atomic::{read_json, write_json_atomic, StoreError};
use roboppi_core::{ExecutionRecord, TriggerState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// History entries kept per trigger; the oldest beyond this are pruned.
pub const DEFAULT_MAX_HISTORY: usize = 100;

pub struct TriggerStore {
    state_dir: PathBuf,
    max_history: usize,
}

impl TriggerStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into(), max_history: DEFAULT_MAX_HISTORY }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn trigger_dir(&self, trigger_id: &str) -> PathBuf {
        self.state_dir.join("triggers").join(trigger_id)
    }

    fn history_dir(&self, trigger_id: &str) -> PathBuf {
        self.trigger_dir(trigger_id).join("history")
    }

    pub fn daemon_state_path(&self) -> PathBuf {
        self.state_dir.join("daemon.json")
    }

    /// Load per-trigger state; a missing file is the default state.
    pub fn load_state(&self, trigger_id: &str) -> Result<TriggerState, StoreError> {
        let path = self.trigger_dir(trigger_id).join("state.json");
        Ok(read_json(&path)?.unwrap_or_default())
    }

    pub fn save_state(&self, trigger_id: &str, state: &TriggerState) -> Result<(), StoreError> {
        let path = self.trigger_dir(trigger_id).join("state.json");
        write_json_atomic(&path, state)
    }

    /// Load the last workflow result artifact for a trigger, if any.
    pub fn load_last_result<T: DeserializeOwned>(
        &self,
        trigger_id: &str,
    ) -> Result<Option<T>, StoreError> {
        read_json(&self.trigger_dir(trigger_id).join("last-result.json"))
    }

    pub fn save_last_result<T: Serialize>(
        &self,
        trigger_id: &str,
        result: &T,
    ) -> Result<(), StoreError> {
        write_json_atomic(&self.trigger_dir(trigger_id).join("last-result.json"), result)
    }

    /// Record one execution and prune history beyond the retention bound.
    pub fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let dir = self.history_dir(&record.trigger_id);
        let name = format!("{:013}.json", record.completed_at_ms);
        write_json_atomic(&dir.join(name), record)?;
        self.prune_history(&record.trigger_id)?;
        Ok(())
    }

    /// List history records, oldest first.
    pub fn list_history(&self, trigger_id: &str) -> Result<Vec<ExecutionRecord>, StoreError> {
        let mut records = Vec::new();
        for name in self.history_file_names(trigger_id)? {
            let path = self.history_dir(trigger_id).join(&name);
            if let Some(record) = read_json::<ExecutionRecord>(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Sorted (lexicographic ≡ chronological) history file names.
    fn history_file_names(&self, trigger_id: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.history_dir(trigger_id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io { path: dir.display().to_string(), source })
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort();
        Ok(names)
    }

    fn prune_history(&self, trigger_id: &str) -> Result<(), StoreError> {
        let names = self.history_file_names(trigger_id)?;
        if names.len() <= self.max_history {
            return Ok(());
        }
        let excess = names.len() - self.max_history;
        let dir = self.history_dir(trigger_id);
        for name in &names[..excess] {
            let path = dir.join(name);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "history prune failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
