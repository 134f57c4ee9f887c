// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file (YAML).

use roboppi_core::duration::serde_duration;
use roboppi_core::WorkerKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("trigger {0:?} is defined twice")]
    DuplicateTrigger(String),
}

/// One event source definition, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Cron {
        expr: String,
    },
    Interval {
        #[serde(with = "serde_duration")]
        every: Duration,
    },
    Fswatch {
        path: PathBuf,
        #[serde(default)]
        patterns: Vec<String>,
    },
    Webhook {
        /// Hook path under the shared webhook server; defaults to the
        /// trigger ID.
        #[serde(default)]
        path: Option<String>,
    },
    /// Manual events injected through the control socket.
    Command {},
}

/// Evaluate-gate configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluateConfig {
    pub worker: WorkerKind,
    pub instructions: String,
    #[serde(default, with = "serde_duration::option")]
    pub timeout: Option<Duration>,
}

/// Result-analyzer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub worker: WorkerKind,
    pub instructions: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, with = "serde_duration::option")]
    pub timeout: Option<Duration>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source: SourceConfig,
    /// Workflow YAML to execute on accept.
    pub workflow: PathBuf,
    pub workspace: PathBuf,
    #[serde(default)]
    pub evaluate: Option<EvaluateConfig>,
    #[serde(default, with = "serde_duration::option")]
    pub cooldown: Option<Duration>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub analyzer: Option<AnalyzerConfig>,
    /// Optional agent catalog merged into the workflow's steps.
    #[serde(default)]
    pub agents: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreProcessConfig {
    /// Argv for the Core subprocess. Empty means run worker attempts
    /// in-process.
    #[serde(default)]
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Bind address for the shared webhook server; unset disables it.
    #[serde(default)]
    pub webhook_addr: Option<String>,
    #[serde(default)]
    pub max_history: Option<usize>,
    #[serde(default)]
    pub core: CoreProcessConfig,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

impl DaemonConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        let config: DaemonConfig = serde_yaml::from_str(&contents)
            .map_err(|source| ConfigError::Yaml { path: display, source })?;
        config.check_unique_triggers()?;
        Ok(config)
    }

    fn check_unique_triggers(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for trigger in &self.triggers {
            if !seen.insert(trigger.id.as_str()) {
                return Err(ConfigError::DuplicateTrigger(trigger.id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
