// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker adapters: map a worker kind to concrete CLI argv.

use roboppi_core::{Observation, OutputMode, WorkerKind};

/// Trimmed stdout at or below this many bytes becomes a single full-text
/// observation; larger output is condensed to head + tail excerpts.
pub const OBSERVATION_FULL_LIMIT: usize = 4000;

const EXCERPT_BYTES: usize = 1000;

/// The argv for a worker invocation.
///
/// `CUSTOM` runs the instructions through `bash -e`; the LLM CLIs receive
/// the instructions as a prompt argument.
pub fn command_for(kind: WorkerKind, mode: OutputMode, instructions: &str) -> (String, Vec<String>) {
    let instructions = instructions.to_string();
    match kind {
        WorkerKind::Custom => {
            ("bash".to_string(), vec!["-e".to_string(), "-c".to_string(), instructions])
        }
        WorkerKind::ClaudeCode => (
            "claude".to_string(),
            vec![
                "-p".to_string(),
                instructions,
                "--output-format".to_string(),
                "text".to_string(),
            ],
        ),
        WorkerKind::CodexCli => match mode {
            OutputMode::Run => {
                ("codex".to_string(), vec!["--quiet".to_string(), instructions])
            }
            OutputMode::Analyze => ("codex".to_string(), vec!["-p".to_string(), instructions]),
        },
        WorkerKind::Opencode => match mode {
            OutputMode::Run => {
                ("opencode".to_string(), vec!["run".to_string(), instructions])
            }
            OutputMode::Analyze => {
                ("opencode".to_string(), vec!["-p".to_string(), instructions])
            }
        },
    }
}

/// Largest prefix of `s` at most `max` bytes that ends on a char boundary.
fn head(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Largest suffix of `s` at most `max` bytes that starts on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Synthesize observations from a worker's stdout.
pub fn synthesize_observations(stdout: &str) -> Vec<Observation> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.len() <= OBSERVATION_FULL_LIMIT {
        return vec![Observation::new(trimmed)];
    }
    vec![Observation::new(format!(
        "{}\n...\n{}",
        head(trimmed, EXCERPT_BYTES),
        tail(trimmed, EXCERPT_BYTES)
    ))]
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
