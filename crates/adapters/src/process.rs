// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process manager: spawn, track, and shut down worker children.
//!
//! Every spawned child is either reaped by its owning task (which drops the
//! tracking guard) or explicitly marked stuck before shutdown returns.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// Default grace between SIGTERM and SIGKILL.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum SpawnError {
    /// The binary is not on PATH.
    #[error("CLI not found: {program}")]
    NotFound { program: String },
    #[error("failed to spawn {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a graceful shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Exited within the grace period after SIGTERM
    Exited,
    /// Needed SIGKILL
    Killed,
    /// Survived SIGKILL; tracking entry removed
    Stuck,
}

/// What to launch and where.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// Open a stdin pipe (the Core child reads requests on stdin)
    pub pipe_stdin: bool,
    pub label: String,
}

impl SpawnSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            args,
            cwd: cwd.into(),
            env: Vec::new(),
            pipe_stdin: false,
        }
    }

    roboppi_core::setters! {
        into {
            label: String,
        }
        set {
            env: Vec<(String, String)>,
            pipe_stdin: bool,
        }
    }
}

#[derive(Debug, Default)]
struct Tracked {
    children: HashMap<u32, String>,
}

/// Tracks live children by pid. Clone-shared across the tasks that own the
/// actual [`Child`] handles.
#[derive(Clone, Default)]
pub struct ProcessManager {
    tracked: Arc<Mutex<Tracked>>,
}

/// Deregisters the child when the owning task reaps it.
#[derive(Debug)]
pub struct ChildGuard {
    tracked: Arc<Mutex<Tracked>>,
    pid: u32,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.tracked.lock().children.remove(&self.pid);
    }
}

/// A spawned child plus its tracking guard.
#[derive(Debug)]
pub struct RunningChild {
    pub pid: u32,
    pub child: Child,
    pub(crate) guard: ChildGuard,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a child and start tracking it. The caller owns the handle and
    /// must reap it; dropping the returned guard deregisters the pid.
    pub fn spawn(&self, spec: SpawnSpec) -> Result<RunningChild, SpawnError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.pipe_stdin { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);
        for (key, val) in &spec.env {
            cmd.env(key, val);
        }

        let child = cmd.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SpawnError::NotFound { program: spec.program.clone() }
            } else {
                SpawnError::Io { program: spec.program.clone(), source }
            }
        })?;

        // Pid is present until the child is reaped; we only spawn here.
        let pid = child.id().unwrap_or(0);
        self.tracked.lock().children.insert(pid, spec.label.clone());
        tracing::debug!(pid, program = %spec.program, label = %spec.label, "spawned child");

        Ok(RunningChild {
            pid,
            child,
            guard: ChildGuard { tracked: Arc::clone(&self.tracked), pid },
        })
    }

    /// Pids currently tracked.
    pub fn tracked_pids(&self) -> Vec<u32> {
        self.tracked.lock().children.keys().copied().collect()
    }

    fn is_tracked(&self, pid: u32) -> bool {
        self.tracked.lock().children.contains_key(&pid)
    }

    /// Send a signal to a tracked child. Errors (already-gone pids) are
    /// logged, not surfaced.
    pub fn signal(&self, pid: u32, signal: Signal) {
        if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
            tracing::debug!(pid, signal = %signal, error = %e, "signal delivery failed");
        }
    }

    pub fn sigterm(&self, pid: u32) {
        self.signal(pid, Signal::SIGTERM);
    }

    pub fn sigkill(&self, pid: u32) {
        self.signal(pid, Signal::SIGKILL);
    }

    /// Wait until the owning task reaps the pid, up to `timeout`.
    async fn await_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if !self.is_tracked(pid) {
                return true;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
        !self.is_tracked(pid)
    }

    /// SIGTERM, await exit within `grace`; SIGKILL, await another grace
    /// period; if the child still has not been reaped, drop the tracking
    /// entry and report it stuck.
    pub async fn graceful_shutdown(&self, pid: u32, grace: Duration) -> ShutdownOutcome {
        if !self.is_tracked(pid) {
            return ShutdownOutcome::Exited;
        }
        self.signal(pid, Signal::SIGTERM);
        if self.await_exit(pid, grace).await {
            return ShutdownOutcome::Exited;
        }

        tracing::warn!(pid, "child ignored SIGTERM, escalating to SIGKILL");
        self.signal(pid, Signal::SIGKILL);
        if self.await_exit(pid, DEFAULT_SHUTDOWN_GRACE).await {
            return ShutdownOutcome::Killed;
        }

        tracing::error!(pid, "child survived SIGKILL, marking stuck");
        self.tracked.lock().children.remove(&pid);
        ShutdownOutcome::Stuck
    }

    /// SIGKILL every tracked child and await all exits.
    pub async fn kill_all(&self) {
        let pids = self.tracked_pids();
        for pid in &pids {
            self.signal(*pid, Signal::SIGKILL);
        }
        for pid in pids {
            if !self.await_exit(pid, DEFAULT_SHUTDOWN_GRACE).await {
                tracing::error!(pid, "child survived SIGKILL during kill_all");
                self.tracked.lock().children.remove(&pid);
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
