// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load and validate definitions from disk.

use crate::catalog::AgentCatalog;
use crate::def::WorkflowDef;
use crate::validate::{validate, ValidationError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
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
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Load a workflow definition and prove it valid.
pub fn load_workflow(path: &Path) -> Result<WorkflowDef, LoadError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: display.clone(), source })?;
    let def: WorkflowDef = serde_yaml::from_str(&contents)
        .map_err(|source| LoadError::Yaml { path: display, source })?;
    validate(&def)?;
    Ok(def)
}

/// Load the optional agent catalog; a missing file is not an error.
pub fn load_agent_catalog(path: &Path) -> Result<Option<AgentCatalog>, LoadError> {
    let display = path.display().to_string();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(LoadError::Io { path: display, source }),
    };
    let catalog: AgentCatalog = serde_yaml::from_str(&contents)
        .map_err(|source| LoadError::Yaml { path: display, source })?;
    Ok(Some(catalog))
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
