// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent catalog: reusable worker profiles a step can reference.

use crate::def::StepDef;
use indexmap::IndexMap;
use roboppi_core::duration::serde_duration;
use roboppi_core::{Capability, WorkerKind};
use serde::Deserialize;
use std::time::Duration;

/// One reusable agent profile from `agents.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentProfile {
    #[serde(default)]
    pub worker: Option<WorkerKind>,
    #[serde(default)]
    pub model: Option<String>,
    /// Prepended to the step's own instructions, separated by a blank line.
    #[serde(default)]
    pub base_instructions: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Vec<Capability>>,
    #[serde(default, with = "serde_duration::option")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default, with = "serde_duration::option")]
    pub max_command_time: Option<Duration>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The optional `agents.yaml` catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentCatalog {
    pub version: String,
    #[serde(default)]
    pub agents: IndexMap<String, AgentProfile>,
}

impl AgentCatalog {
    pub fn get(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.get(id)
    }

    /// Merge a profile under a step definition: the step's own fields win,
    /// profile fields fill the gaps, and base instructions are prepended.
    pub fn merge_into(profile: &AgentProfile, step: &StepDef) -> StepDef {
        let mut merged = step.clone();
        if merged.worker.is_none() {
            merged.worker = profile.worker;
        }
        if merged.capabilities.is_empty() {
            if let Some(caps) = &profile.capabilities {
                merged.capabilities = caps.clone();
            }
        }
        if merged.timeout.is_none() {
            merged.timeout = profile.timeout;
        }
        if merged.max_steps.is_none() {
            merged.max_steps = profile.max_steps;
        }
        if merged.max_command_time.is_none() {
            merged.max_command_time = profile.max_command_time;
        }
        if let Some(base) = &profile.base_instructions {
            merged.instructions = if merged.instructions.is_empty() {
                base.clone()
            } else {
                format!("{}\n\n{}", base, merged.instructions)
            };
        }
        merged
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
