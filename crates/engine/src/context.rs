// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context materialization.
//!
//! Each step gets `<context_dir>/<step_id>/` as a scratch area. Resolved
//! instructions land in `_resolved.json` before the first attempt; declared
//! outputs the worker did not create are filled from its trimmed stdout.

use roboppi_core::{Capability, WorkerKind};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("output path {0:?} escapes the workspace")]
    PathEscape(String),
    #[error(transparent)]
    Store(#[from] roboppi_store::StoreError),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The step definition after placeholder expansion and agent-profile merge,
/// as persisted to `_resolved.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedStep {
    pub step_id: String,
    pub worker: WorkerKind,
    pub instructions: String,
    pub capabilities: Vec<Capability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub max_iterations: u32,
    pub max_retries: u32,
}

/// Directory for one step's scratch artifacts; created on demand.
pub fn step_context_dir(context_dir: &Path, step_id: &str) -> PathBuf {
    context_dir.join(step_id)
}

/// Write `_resolved.json` into the step's context directory.
pub fn write_resolved_instructions(
    context_dir: &Path,
    resolved: &ResolvedStep,
) -> Result<(), ContextError> {
    let dir = step_context_dir(context_dir, &resolved.step_id);
    std::fs::create_dir_all(&dir)
        .map_err(|source| ContextError::Io { path: dir.display().to_string(), source })?;
    roboppi_store::write_json_atomic(&dir.join("_resolved.json"), resolved)?;
    Ok(())
}

/// Resolve a declared output path against the workspace, rejecting absolute
/// paths and any traversal that escapes it.
pub fn resolve_output_path(workspace_dir: &Path, declared: &str) -> Result<PathBuf, ContextError> {
    let relative = Path::new(declared);
    if relative.is_absolute() {
        return Err(ContextError::PathEscape(declared.to_string()));
    }
    let mut depth: i32 = 0;
    for component in relative.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(ContextError::PathEscape(declared.to_string()));
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(ContextError::PathEscape(declared.to_string()));
            }
        }
    }
    Ok(workspace_dir.join(relative))
}

/// Fill declared outputs the worker did not itself create with the trimmed
/// stdout of the attempt.
pub fn fill_outputs(
    workspace_dir: &Path,
    outputs: &[String],
    stdout: &str,
) -> Result<(), ContextError> {
    let body = stdout.trim();
    for declared in outputs {
        let target = resolve_output_path(workspace_dir, declared)?;
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ContextError::Io { path: parent.display().to_string(), source })?;
        }
        std::fs::write(&target, body)
            .map_err(|source| ContextError::Io { path: target.display().to_string(), source })?;
        tracing::debug!(output = %declared, "filled declared output from stdout");
    }
    Ok(())
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
