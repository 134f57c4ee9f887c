// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roboppi run`: one-shot worker step, in-process.

use crate::exit_error::{parse_worker, ExitError};
use anyhow::Context;
use roboppi_adapters::{LocalStepRunner, ProcessManager, StepRunRequest, StepRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

pub async fn execute(
    worker: String,
    workspace: PathBuf,
    timeout: Option<String>,
    instructions: String,
) -> Result<ExitCode, ExitError> {
    let worker = parse_worker(&worker)?;
    let timeout = timeout
        .map(|s| roboppi_core::parse_duration(&s))
        .transpose()
        .map_err(ExitError::config)?;

    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("workspace {} not accessible", workspace.display()))
        .map_err(ExitError::config)?;

    let manager = ProcessManager::new();
    let runner = LocalStepRunner::new(manager.clone());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut request = StepRunRequest::new("run", worker, instructions, workspace);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let result = runner.run_step(request, &cancel, None).await;
    manager.kill_all().await;

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }

    if result.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(error) = &result.error {
            eprintln!("roboppi: step failed: {error}");
        }
        Ok(ExitCode::FAILURE)
    }
}
