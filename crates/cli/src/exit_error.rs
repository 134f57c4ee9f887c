// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI error with an exit code.
//!
//! Exit 0 is success, 1 is a runtime failure, 2 is reserved for
//! configuration errors (bad flags, unloadable config, unknown worker).

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;

#[derive(Debug)]
pub struct ExitError {
    pub error: anyhow::Error,
    pub code: u8,
}

impl ExitError {
    pub fn config(error: impl Into<anyhow::Error>) -> Self {
        Self { error: error.into(), code: EXIT_CONFIG }
    }
}

impl From<anyhow::Error> for ExitError {
    fn from(error: anyhow::Error) -> Self {
        Self { error, code: EXIT_FAILURE }
    }
}

/// Parse a worker name as spelled in workflow YAML.
pub fn parse_worker(name: &str) -> Result<roboppi_core::WorkerKind, ExitError> {
    match name {
        "CUSTOM" => Ok(roboppi_core::WorkerKind::Custom),
        "CLAUDE_CODE" => Ok(roboppi_core::WorkerKind::ClaudeCode),
        "CODEX_CLI" => Ok(roboppi_core::WorkerKind::CodexCli),
        "OPENCODE" => Ok(roboppi_core::WorkerKind::Opencode),
        other => Err(ExitError::config(anyhow::anyhow!("unknown worker {other:?}"))),
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
