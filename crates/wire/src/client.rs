// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response client over a JSON-lines transport.
//!
//! The client keeps a table of pending request IDs; responses resolve them.
//! Completion-style messages (`job_completed`, `job_cancelled`) are also
//! routed by job ID so callers can resolve the ack first and await the
//! outcome separately. Responses that match neither table are logged and
//! dropped.

use crate::error::WireError;
use crate::framing::{write_message, LineReader};
use crate::request::Request;
use crate::response::Response;
use parking_lot::Mutex;
use roboppi_core::JobId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Messages the peer sends without a matching pending request.
#[derive(Debug, Clone, PartialEq)]
pub enum IpcEvent {
    Escalation { job_id: JobId, reason: String },
    /// Core-initiated liveness probe
    CoreHeartbeat { request_id: String, sent_at_ms: u64 },
    Error { message: String },
}

#[derive(Default)]
struct Tables {
    pending: HashMap<String, oneshot::Sender<Response>>,
    completions: HashMap<String, oneshot::Sender<Response>>,
}

pub struct IpcClient<W> {
    writer: tokio::sync::Mutex<W>,
    tables: Arc<Mutex<Tables>>,
    stopped: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

impl<W: AsyncWrite + Send + Unpin> IpcClient<W> {
    /// Wire a client over the given transport halves. Returns the client and
    /// the stream of unsolicited peer events.
    pub fn new<R>(reader: R, writer: W) -> (Self, mpsc::Receiver<IpcEvent>)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let tables = Arc::new(Mutex::new(Tables::default()));
        let stopped = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::channel(64);

        let reader_task =
            tokio::spawn(read_loop(reader, Arc::clone(&tables), events_tx));

        let client = Self {
            writer: tokio::sync::Mutex::new(writer),
            tables,
            stopped,
            reader_task,
        };
        (client, events_rx)
    }

    /// Send a request and await its answer within `deadline`.
    pub async fn call(&self, request: Request, deadline: Duration) -> Result<Response, WireError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(WireError::Stopped);
        }
        let request_id = request.request_id().to_string();
        let (tx, rx) = oneshot::channel();
        self.tables.lock().pending.insert(request_id.clone(), tx);

        if let Err(e) = self.send(&request).await {
            self.tables.lock().pending.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                // Resolver dropped: the read loop ended or stop() drained us
                if self.stopped.load(Ordering::SeqCst) {
                    Err(WireError::Stopped)
                } else {
                    Err(WireError::Disconnect)
                }
            }
            Err(_) => {
                self.tables.lock().pending.remove(&request_id);
                Err(WireError::Timeout)
            }
        }
    }

    /// Send a request without registering a resolver.
    pub async fn send(&self, request: &Request) -> Result<(), WireError> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, request).await
    }

    /// Register interest in the completion of a job. The returned channel
    /// yields the `job_completed`/`job_cancelled` message.
    pub fn watch_job(&self, job_id: &JobId) -> oneshot::Receiver<Response> {
        let (tx, rx) = oneshot::channel();
        self.tables.lock().completions.insert(job_id.to_string(), tx);
        rx
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop the protocol. All pending requests and completion watchers are
    /// rejected; in-flight `call`s observe [`WireError::Stopped`].
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.reader_task.abort();
        let mut tables = self.tables.lock();
        let drained = tables.pending.len() + tables.completions.len();
        tables.pending.clear();
        tables.completions.clear();
        if drained > 0 {
            tracing::debug!(drained, "rejected pending requests on stop");
        }
    }
}

impl<W> Drop for IpcClient<W> {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_loop<R>(
    reader: R,
    tables: Arc<Mutex<Tables>>,
    events_tx: mpsc::Sender<IpcEvent>,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut lines = LineReader::new(reader);
    loop {
        match lines.next_message::<Response>().await {
            Ok(Some(response)) => dispatch(response, &tables, &events_tx).await,
            Ok(None) => break,
            Err(WireError::Parse { snippet }) => {
                tracing::warn!(snippet = %snippet, "dropping unparseable message");
            }
            Err(WireError::BufferOverflow { limit }) => {
                tracing::error!(limit, "message overflow, closing stream");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport read failed");
                break;
            }
        }
    }
    // Dropping resolvers signals Disconnect to awaiting callers
    let mut tables = tables.lock();
    tables.pending.clear();
    tables.completions.clear();
}

async fn dispatch(
    response: Response,
    tables: &Arc<Mutex<Tables>>,
    events_tx: &mpsc::Sender<IpcEvent>,
) {
    // Resolve by request ID first, then by settled job ID
    let resolver = {
        let mut tables = tables.lock();
        let by_request = response
            .request_id()
            .and_then(|rid| tables.pending.remove(rid));
        match by_request {
            Some(tx) => Some(tx),
            None => response
                .settled_job_id()
                .and_then(|job_id| tables.completions.remove(job_id.as_str())),
        }
    };

    if let Some(tx) = resolver {
        let _ = tx.send(response);
        return;
    }

    let event = match response {
        Response::Escalation { job_id, reason } => Some(IpcEvent::Escalation { job_id, reason }),
        Response::Heartbeat { request_id, sent_at_ms } => {
            Some(IpcEvent::CoreHeartbeat { request_id, sent_at_ms })
        }
        Response::Error { message, request_id: None } => Some(IpcEvent::Error { message }),
        other => {
            tracing::warn!(
                request_id = other.request_id().unwrap_or("-"),
                "dropping response with no pending request"
            );
            None
        }
    };
    if let Some(event) = event {
        let _ = events_tx.send(event).await;
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
