// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook event source.
//!
//! One shared HTTP server serves every webhook trigger; each trigger
//! registers a hook name and receives the POSTed JSON bodies.

use super::{epoch_ms, DaemonEvent, EventSource};
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Routes = Arc<Mutex<HashMap<String, mpsc::Sender<serde_json::Value>>>>;

/// Shared HTTP POST endpoint (`/hooks/{name}`) for all webhook triggers.
#[derive(Clone)]
pub struct WebhookServer {
    addr: String,
    routes: Routes,
}

impl WebhookServer {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), routes: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Register a hook name; POST bodies arrive on the returned channel.
    pub fn register(&self, name: &str) -> mpsc::Receiver<serde_json::Value> {
        let (tx, rx) = mpsc::channel(64);
        self.routes.lock().insert(name.to_string(), tx);
        rx
    }

    /// Serve until `stop` fires.
    pub async fn serve(self, stop: CancellationToken) {
        let app = Router::new()
            .route("/hooks/:name", post(handle_hook))
            .with_state(self.routes.clone());

        let listener = match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(addr = %self.addr, error = %e, "webhook bind failed");
                return;
            }
        };
        tracing::info!(addr = %self.addr, "webhook server listening");

        let shutdown = async move { stop.cancelled().await };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            tracing::warn!(error = %e, "webhook server error");
        }
    }
}

async fn handle_hook(
    State(routes): State<Routes>,
    Path(name): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let tx = routes.lock().get(&name).cloned();
    match tx {
        Some(tx) => {
            if tx.send(body).await.is_ok() {
                StatusCode::ACCEPTED
            } else {
                StatusCode::GONE
            }
        }
        None => StatusCode::NOT_FOUND,
    }
}

pub struct WebhookSource {
    id: String,
    rx: mpsc::Receiver<serde_json::Value>,
}

impl WebhookSource {
    pub fn new(id: impl Into<String>, rx: mpsc::Receiver<serde_json::Value>) -> Self {
        Self { id: id.into(), rx }
    }
}

#[async_trait]
impl EventSource for WebhookSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(mut self: Box<Self>, tx: mpsc::Sender<DaemonEvent>, stop: CancellationToken) {
        loop {
            let body = tokio::select! {
                body = self.rx.recv() => body,
                _ = stop.cancelled() => return,
            };
            let Some(body) = body else { return };
            let payload = serde_json::json!({ "kind": "webhook", "body": body });
            let event = DaemonEvent::new(self.id.clone(), payload, epoch_ms());
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}
