// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! roboppi: one-shot steps, daemon mode, and manual trigger injection.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roboppi", about = "Agent workflow runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single worker step against a workspace
    Run {
        /// Worker kind (CUSTOM, CLAUDE_CODE, CODEX_CLI, OPENCODE)
        #[arg(long)]
        worker: String,
        /// Workspace directory the worker mutates
        #[arg(long)]
        workspace: PathBuf,
        /// Per-step timeout (duration grammar, e.g. 10m)
        #[arg(long)]
        timeout: Option<String>,
        /// Instructions handed to the worker
        instructions: Vec<String>,
    },
    /// Run the trigger daemon
    Daemon {
        #[arg(long)]
        config: PathBuf,
    },
    /// Inject a manual event for a command trigger
    Trigger {
        /// Trigger ID to fire
        id: String,
        /// JSON payload attached to the event
        #[arg(long)]
        payload: Option<String>,
        /// Daemon control socket (defaults to the state dir)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ROBOPPI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { worker, workspace, timeout, instructions } => {
            commands::run::execute(worker, workspace, timeout, instructions.join(" ")).await
        }
        Command::Daemon { config } => commands::daemon::execute(config).await,
        Command::Trigger { id, payload, socket } => {
            commands::trigger::execute(id, payload, socket).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("roboppi: {:#}", e.error);
            ExitCode::from(e.code)
        }
    }
}
