// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-buffered subprocess execution.
//!
//! Both output streams are read line-buffered; each complete line is
//! forwarded to the sink as a [`WorkerEvent`]. A trailing partial line is
//! flushed on EOF.

use crate::process::{ProcessManager, RunningChild, SpawnError, SpawnSpec};
use nix::sys::signal::Signal;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One complete output line from a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub stream: OutputStream,
    pub line: String,
}

/// Why the subprocess stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub termination: Termination,
    /// None when signal-killed
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.termination == Termination::Exited && self.exit_code == Some(0)
    }
}

fn drain_lines<R>(
    reader: R,
    stream: OutputStream,
    sink: Option<mpsc::Sender<WorkerEvent>>,
) -> JoinHandle<String>
where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut collected = String::new();
        let mut lines = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match lines.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    collected.push_str(&line);
                    // Forward without the terminator; a trailing partial
                    // line arrives here on EOF and is flushed the same way.
                    let trimmed = line.trim_end_matches(['\n', '\r']);
                    if let Some(sink) = &sink {
                        let _ = sink
                            .send(WorkerEvent { stream, line: trimmed.to_string() })
                            .await;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "output stream read failed");
                    break;
                }
            }
        }
        collected
    })
}

/// Run a subprocess to completion, streaming output lines to `sink`.
///
/// On cancel or timeout the child receives SIGTERM, then SIGKILL after the
/// manager's grace period; the output gathered so far is preserved.
pub async fn run_streaming(
    manager: &ProcessManager,
    spec: SpawnSpec,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    sink: Option<mpsc::Sender<WorkerEvent>>,
) -> Result<CommandOutput, SpawnError> {
    let RunningChild { pid, mut child, guard: _guard } = manager.spawn(spec)?;

    let stdout_task = child
        .stdout
        .take()
        .map(|out| drain_lines(out, OutputStream::Stdout, sink.clone()));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| drain_lines(err, OutputStream::Stderr, sink.clone()));

    let timeout_sleep = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending().await,
        }
    };

    let (termination, status) = tokio::select! {
        status = child.wait() => (Termination::Exited, status.ok()),
        _ = cancel.cancelled() => {
            manager.signal(pid, Signal::SIGTERM);
            let status = await_or_kill(manager, pid, &mut child).await;
            (Termination::Cancelled, status)
        }
        _ = timeout_sleep => {
            manager.signal(pid, Signal::SIGTERM);
            let status = await_or_kill(manager, pid, &mut child).await;
            (Termination::TimedOut, status)
        }
    };

    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    Ok(CommandOutput {
        termination,
        exit_code: status.and_then(|s| s.code()),
        stdout,
        stderr,
    })
}

/// After SIGTERM: wait out the grace period, then SIGKILL and reap.
async fn await_or_kill(
    manager: &ProcessManager,
    pid: u32,
    child: &mut tokio::process::Child,
) -> Option<std::process::ExitStatus> {
    match tokio::time::timeout(crate::process::DEFAULT_SHUTDOWN_GRACE, child.wait()).await {
        Ok(status) => status.ok(),
        Err(_) => {
            manager.signal(pid, Signal::SIGKILL);
            child.wait().await.ok()
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
