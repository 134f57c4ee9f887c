// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the Scheduler and Core processes.
//!
//! Wire format: JSON-lines — one UTF-8 JSON object per message, terminated
//! by `\n`, over the child's stdin/stdout pipes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod error;
mod framing;
mod request;
mod response;

pub use client::{IpcClient, IpcEvent};
pub use error::WireError;
pub use framing::{encode, write_message, LineReader, DEFAULT_MAX_MESSAGE_BYTES, PARSE_SNIPPET_BYTES};
pub use request::Request;
pub use response::Response;
