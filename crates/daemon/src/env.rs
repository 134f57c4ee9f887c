// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.
//!
//! Variables may use the `ROBOPPI_` prefix or the legacy `AGENTCORE_`
//! prefix; [`apply_env_prefix_aliases`] mirrors values across the two at
//! startup without overwriting anything already set.

use std::path::PathBuf;
use std::time::Duration;

const PREFIX: &str = "ROBOPPI_";
const LEGACY_PREFIX: &str = "AGENTCORE_";

/// Mirror `ROBOPPI_*` ↔ `AGENTCORE_*` without overwriting. Idempotent: a
/// second call finds every alias already present and changes nothing.
pub fn apply_env_prefix_aliases() {
    let vars: Vec<(String, String)> = std::env::vars().collect();
    for (key, value) in vars {
        let alias = if let Some(rest) = key.strip_prefix(PREFIX) {
            format!("{LEGACY_PREFIX}{rest}")
        } else if let Some(rest) = key.strip_prefix(LEGACY_PREFIX) {
            format!("{PREFIX}{rest}")
        } else {
            continue;
        };
        if std::env::var_os(&alias).is_none() {
            std::env::set_var(&alias, &value);
        }
    }
}

/// Resolve the state directory:
/// `ROBOPPI_STATE_DIR` > `XDG_STATE_HOME/roboppi` > `~/.local/state/roboppi`.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("ROBOPPI_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("roboppi"));
    }
    std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".local/state/roboppi"))
}

/// Default IPC call timeout.
pub fn ipc_timeout() -> Duration {
    std::env::var("ROBOPPI_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Shutdown drain timeout (default 5s).
pub fn drain_timeout() -> Duration {
    std::env::var("ROBOPPI_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
