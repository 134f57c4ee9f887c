// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-watch event source.
//!
//! Paths are matched against glob patterns relative to the watch root:
//! `*` matches any run of non-slash characters, `**` matches anything,
//! `?` matches one non-slash character.

use super::{epoch_ms, DaemonEvent, EventSource};
use async_trait::async_trait;
use notify::{RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Glob matcher for watch patterns.
pub fn glob_match(path: &str, pattern: &str) -> bool {
    let path: Vec<char> = path.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_inner(&pattern, &path)
}

fn match_inner(pattern: &[char], text: &[char]) -> bool {
    let Some(&head) = pattern.first() else {
        return text.is_empty();
    };
    match head {
        '*' if pattern.get(1) == Some(&'*') => {
            // Collapse the double star, then try every split point
            let rest = &pattern[2..];
            (0..=text.len()).any(|i| match_inner(rest, &text[i..]))
        }
        '*' => {
            let rest = &pattern[1..];
            for i in 0..=text.len() {
                if match_inner(rest, &text[i..]) {
                    return true;
                }
                if i < text.len() && text[i] == '/' {
                    break;
                }
            }
            false
        }
        '?' => {
            !text.is_empty() && text[0] != '/' && match_inner(&pattern[1..], &text[1..])
        }
        literal => {
            !text.is_empty() && text[0] == literal && match_inner(&pattern[1..], &text[1..])
        }
    }
}

pub struct FsWatchSource {
    id: String,
    root: PathBuf,
    patterns: Vec<String>,
}

impl FsWatchSource {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self { id: id.into(), root: root.into(), patterns }
    }

    fn matches(&self, path: &std::path::Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative = relative.to_string_lossy();
        self.patterns.iter().any(|pattern| glob_match(&relative, pattern))
    }
}

#[async_trait]
impl EventSource for FsWatchSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken) {
        let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Event>(256);

        let mut watcher = match notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = raw_tx.blocking_send(event);
                }
                Err(e) => tracing::debug!(error = %e, "watch error"),
            },
        ) {
            Ok(watcher) => watcher,
            Err(e) => {
                tracing::warn!(source = %self.id, error = %e, "watcher setup failed");
                return;
            }
        };
        if let Err(e) = watcher.watch(&self.root, RecursiveMode::Recursive) {
            tracing::warn!(source = %self.id, root = %self.root.display(), error = %e, "watch failed");
            return;
        }

        loop {
            let raw = tokio::select! {
                raw = raw_rx.recv() => raw,
                _ = stop.cancelled() => return,
            };
            let Some(raw) = raw else { return };

            let matched: Vec<String> = raw
                .paths
                .iter()
                .filter(|p| self.matches(p))
                .map(|p| p.display().to_string())
                .collect();
            if matched.is_empty() {
                continue;
            }

            let payload = serde_json::json!({
                "kind": "fswatch",
                "op": format!("{:?}", raw.kind),
                "paths": matched,
            });
            let event = DaemonEvent::new(self.id.clone(), payload, epoch_ms());
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "fswatch_tests.rs"]
mod tests;
