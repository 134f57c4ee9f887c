// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roboppi trigger`: inject a manual event over the daemon's control
//! socket.

use crate::exit_error::ExitError;
use anyhow::Context;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

pub async fn execute(
    id: String,
    payload: Option<String>,
    socket: Option<PathBuf>,
) -> Result<ExitCode, ExitError> {
    let payload: serde_json::Value = match payload {
        Some(raw) => serde_json::from_str(&raw)
            .context("payload is not valid JSON")
            .map_err(ExitError::config)?,
        None => serde_json::Value::Null,
    };

    let socket_path = match socket {
        Some(path) => path,
        None => roboppi_daemon::env::state_dir()
            .context("no state directory; pass --socket")
            .map_err(ExitError::config)?
            .join("command.sock"),
    };

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .with_context(|| format!("daemon not reachable at {}", socket_path.display()))?;

    let message = serde_json::json!({ "trigger": id, "payload": payload });
    let line = roboppi_wire::encode(&message).map_err(|e| ExitError::from(anyhow::Error::new(e)))?;
    stream.write_all(&line).await.map_err(|e| ExitError::from(anyhow::Error::new(e)))?;
    stream.shutdown().await.ok();

    println!("event sent to trigger {id}");
    Ok(ExitCode::SUCCESS)
}
