// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! roboppid: the Roboppi daemon binary.
//!
//! `roboppid --config <file>` runs the trigger engine; `roboppid core`
//! runs the Core scheduler service on stdin/stdout (the supervisor's
//! default child argv).

use roboppi_adapters::{LocalStepRunner, ProcessManager};
use roboppi_daemon::config::DaemonConfig;
use roboppi_daemon::run_daemon;
use roboppi_sched::{CoreConfig, CoreService};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const EXIT_CONFIG: u8 = 2;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROBOPPI_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn usage() -> ExitCode {
    eprintln!("usage: roboppid --config <file> | roboppid core");
    ExitCode::from(EXIT_CONFIG)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("core") => run_core().await,
        Some("--config") => {
            let Some(path) = args.get(1) else { return usage() };
            run_trigger_engine(PathBuf::from(path)).await
        }
        _ => usage(),
    }
}

/// The Core scheduler service over stdin/stdout.
async fn run_core() -> ExitCode {
    let manager = ProcessManager::new();
    let runner = Arc::new(LocalStepRunner::new(manager.clone()));
    let result = CoreService::run(
        runner,
        CoreConfig::default(),
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await;
    manager.kill_all().await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "core service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_trigger_engine(config_path: PathBuf) -> ExitCode {
    let config = match DaemonConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("roboppid: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

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

    match run_daemon(config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("roboppid: {e}");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}
