// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roboppi daemon`: run the trigger engine in the foreground.

use crate::exit_error::ExitError;
use roboppi_daemon::config::DaemonConfig;
use roboppi_daemon::run_daemon;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

pub async fn execute(config_path: PathBuf) -> Result<ExitCode, ExitError> {
    let config = DaemonConfig::load(&config_path).map_err(ExitError::config)?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    run_daemon(config, shutdown).await.map_err(ExitError::config)?;
    Ok(ExitCode::SUCCESS)
}
