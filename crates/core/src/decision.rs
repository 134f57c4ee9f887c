// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decision artifacts: completion-check verdicts and management directives.
//!
//! Both are communicated from a worker to the executor through a file (or a
//! stdout fallback for completion checks). Parsing is pure; file staleness
//! checks live with the executor, which owns the filesystem context.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
static STDOUT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(INCOMPLETE|COMPLETE)\b").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static LINE_COMPLETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(PASS|COMPLETE)$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static LINE_INCOMPLETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(FAIL|INCOMPLETE)$").expect("constant regex pattern is valid")
});

/// Verdict of a completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionDecision {
    Complete,
    Incomplete,
    /// The check itself could not run (infrastructure failure)
    Fail,
}

crate::simple_display! {
    CompletionDecision {
        Complete => "complete",
        Incomplete => "incomplete",
        Fail => "fail",
    }
}

/// Structured decision-file payload for completion checks.
#[derive(Debug, Clone, Deserialize)]
struct CompletionFile {
    decision: CompletionDecision,
    #[serde(default)]
    #[allow(dead_code)]
    check_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    reasons: Option<Vec<String>>,
    #[serde(default)]
    #[allow(dead_code)]
    fingerprints: Option<Vec<String>>,
}

/// Parse a completion-check decision file.
///
/// Accepts either structured JSON (`{"decision": "complete"|"incomplete"|"fail"}`)
/// or a single trimmed line of text: `PASS`/`COMPLETE` map to complete,
/// `FAIL`/`INCOMPLETE` map to incomplete (case-insensitive).
pub fn parse_decision_file(contents: &str) -> Option<CompletionDecision> {
    if let Ok(file) = serde_json::from_str::<CompletionFile>(contents) {
        return Some(file.decision);
    }
    let line = contents.trim();
    if LINE_COMPLETE.is_match(line) {
        return Some(CompletionDecision::Complete);
    }
    if LINE_INCOMPLETE.is_match(line) {
        return Some(CompletionDecision::Incomplete);
    }
    None
}

/// Stdout-fallback parsing: the last whole-token occurrence of `COMPLETE`
/// or `INCOMPLETE` wins. Word boundaries keep `completed` from matching.
pub fn parse_decision_stdout(stdout: &str) -> Option<CompletionDecision> {
    let last = STDOUT_TOKEN.find_iter(stdout).last()?;
    match last.as_str() {
        "COMPLETE" => Some(CompletionDecision::Complete),
        _ => Some(CompletionDecision::Incomplete),
    }
}

/// Directive a management hook hands back to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManagementDirective {
    /// Continue as planned
    Proceed,
    /// Re-run the step attempt
    Retry,
    /// Skip the step without failing it
    Skip,
    /// Abort the workflow
    Abort,
    /// Surface to a human; executor proceeds
    Escalate,
}

crate::simple_display! {
    ManagementDirective {
        Proceed => "PROCEED",
        Retry => "RETRY",
        Skip => "SKIP",
        Abort => "ABORT",
        Escalate => "ESCALATE",
    }
}

/// The deterministic fallback directive when a decision cannot be accepted.
pub const DEFAULT_PROCEED_DIRECTIVE: ManagementDirective = ManagementDirective::Proceed;

/// Where a resolved management decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    /// No decision file was produced
    None,
    /// The decision file existed but failed validation
    FileJson,
    /// The decision file was accepted
    File,
    /// The hook worker timed out
    Timeout,
    /// The hook worker was aborted
    Abort,
}

crate::simple_display! {
    DecisionSource {
        None => "none",
        FileJson => "file-json",
        File => "file",
        Timeout => "timeout",
        Abort => "abort",
    }
}

/// Raw shape of a management `decision.json`, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawManagementDecision {
    #[serde(default)]
    pub directive: Option<serde_json::Value>,
    #[serde(default)]
    pub hook_id: Option<String>,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub step_id: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl RawManagementDecision {
    /// Validate the `directive` field shape. Returns the parsed directive or
    /// the validator's reason for rejecting it.
    pub fn validate_directive(&self) -> Result<ManagementDirective, String> {
        let value = match &self.directive {
            Some(v) => v,
            None => return Err("directive missing".to_string()),
        };
        let s = match value.as_str() {
            Some(s) => s,
            None => return Err("directive is not a string".to_string()),
        };
        match s {
            "PROCEED" => Ok(ManagementDirective::Proceed),
            "RETRY" => Ok(ManagementDirective::Retry),
            "SKIP" => Ok(ManagementDirective::Skip),
            "ABORT" => Ok(ManagementDirective::Abort),
            "ESCALATE" => Ok(ManagementDirective::Escalate),
            other => Err(format!("unknown directive: {}", other)),
        }
    }
}

/// A resolved management decision, fallback or accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementDecision {
    pub directive: ManagementDirective,
    pub source: DecisionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub hook_id_match: bool,
}

impl ManagementDecision {
    /// The PROCEED fallback with the given source and reason.
    pub fn fallback(source: DecisionSource, reason: impl Into<String>) -> Self {
        Self {
            directive: DEFAULT_PROCEED_DIRECTIVE,
            source,
            reason: Some(reason.into()),
            reasoning: None,
            confidence: None,
            hook_id_match: false,
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
