// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual event injection over the control socket.
//!
//! The CLI writes JSON lines of the form
//! `{"trigger": "<id>", "payload": {...}}` to the daemon's unix socket;
//! each registered command trigger receives its own events.

use super::{epoch_ms, DaemonEvent, EventSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use roboppi_wire::LineReader;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One injected command event on the wire.
#[derive(Debug, Deserialize)]
pub struct CommandMessage {
    pub trigger: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

type Routes = Arc<Mutex<HashMap<String, mpsc::Sender<serde_json::Value>>>>;

/// Shared unix-socket listener for every command trigger.
#[derive(Clone)]
pub struct CommandListener {
    socket_path: PathBuf,
    routes: Routes,
}

impl CommandListener {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), routes: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn register(&self, trigger_id: &str) -> mpsc::Receiver<serde_json::Value> {
        let (tx, rx) = mpsc::channel(64);
        self.routes.lock().insert(trigger_id.to_string(), tx);
        rx
    }

    /// Accept connections until `stop` fires.
    pub async fn serve(self, stop: CancellationToken) {
        // A previous daemon's socket file blocks the bind
        let _ = std::fs::remove_file(&self.socket_path);
        let listener = match UnixListener::bind(&self.socket_path) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(
                    path = %self.socket_path.display(),
                    error = %e,
                    "command socket bind failed"
                );
                return;
            }
        };
        tracing::info!(path = %self.socket_path.display(), "command socket listening");

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = stop.cancelled() => break,
            };
            let Ok((stream, _)) = accepted else { continue };
            let routes = Arc::clone(&self.routes);
            let conn_stop = stop.clone();
            tokio::spawn(async move {
                let mut lines = LineReader::new(stream);
                loop {
                    let message = tokio::select! {
                        message = lines.next_message::<CommandMessage>() => message,
                        _ = conn_stop.cancelled() => return,
                    };
                    match message {
                        Ok(Some(message)) => {
                            let tx = routes.lock().get(&message.trigger).cloned();
                            match tx {
                                Some(tx) => {
                                    let _ = tx.send(message.payload).await;
                                }
                                None => tracing::warn!(
                                    trigger = %message.trigger,
                                    "command for unknown trigger"
                                ),
                            }
                        }
                        Ok(None) => return,
                        Err(e) => {
                            tracing::warn!(error = %e, "bad command message");
                            return;
                        }
                    }
                }
            });
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

pub struct CommandSource {
    id: String,
    rx: mpsc::Receiver<serde_json::Value>,
}

impl CommandSource {
    pub fn new(id: impl Into<String>, rx: mpsc::Receiver<serde_json::Value>) -> Self {
        Self { id: id.into(), rx }
    }
}

#[async_trait]
impl EventSource for CommandSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(mut self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken) {
        loop {
            let payload = tokio::select! {
                payload = self.rx.recv() => payload,
                _ = stop.cancelled() => return,
            };
            let Some(payload) = payload else { return };
            let event = DaemonEvent::new(
                self.id.clone(),
                serde_json::json!({ "kind": "command", "payload": payload }),
                epoch_ms(),
            );
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}
