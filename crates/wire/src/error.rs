// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    /// A line failed to parse as a protocol message. Carries the first 200
    /// bytes of the offending line; the stream survives.
    #[error("parse error: {snippet:?}")]
    Parse { snippet: String },

    /// The peer closed the stream.
    #[error("stream disconnected")]
    Disconnect,

    /// A pending request exceeded its per-call deadline.
    #[error("request timed out")]
    Timeout,

    /// The protocol was stopped while requests were pending.
    #[error("protocol stopped")]
    Stopped,

    /// A line exceeded the message size cap; the stream is closed.
    #[error("message exceeds {limit} bytes")]
    BufferOverflow { limit: usize },

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
