// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file primitives.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}

/// Write `value` as pretty JSON via `<path>.tmp` + rename.
///
/// If the rename fails (e.g. tmp and target ended up on different
/// filesystems) we fall back to a direct overwrite and log that durability
/// is weakened for this write.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|source| StoreError::Json { path: path.display().to_string(), source })?;

    let tmp = path.with_extension(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    });
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;

    if let Err(rename_err) = std::fs::rename(&tmp, path) {
        tracing::warn!(
            path = %path.display(),
            error = %rename_err,
            "atomic rename failed, falling back to direct write (durability weakened)"
        );
        let _ = std::fs::remove_file(&tmp);
        std::fs::write(path, &json).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Read a JSON file. A missing file reads as `None`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let value = serde_json::from_str(&contents)
        .map_err(|source| StoreError::Json { path: path.display().to_string(), source })?;
    Ok(Some(value))
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
