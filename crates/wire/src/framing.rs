// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-lines framing.

use crate::error::WireError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default per-message size cap (1 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// How much of an unparseable line the error carries.
pub const PARSE_SNIPPET_BYTES: usize = 200;

/// Encode one message as a JSON line.
///
/// `serde_json` escapes embedded newlines, so the only `\n` in the output
/// is the terminator.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, WireError> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Encode and write one message, flushing the stream.
pub async fn write_message<T, W>(writer: &mut W, msg: &T) -> Result<(), WireError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = encode(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Bounded line reader over a byte stream.
///
/// Each call to [`LineReader::next_message`] yields the next decoded message.
/// A parse failure yields `Err(WireError::Parse)` but leaves the stream
/// usable; an oversized line yields `Err(WireError::BufferOverflow)` and the
/// reader refuses further reads.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_message_bytes: usize,
    poisoned: bool,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, DEFAULT_MAX_MESSAGE_BYTES)
    }

    pub fn with_limit(inner: R, max_message_bytes: usize) -> Self {
        Self { inner, buf: Vec::new(), max_message_bytes, poisoned: false, eof: false }
    }

    /// Read the next raw line (without the terminator). `Ok(None)` on clean
    /// end of stream. A trailing line without a terminator is yielded as-is.
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, WireError> {
        if self.poisoned {
            return Err(WireError::BufferOverflow { limit: self.max_message_bytes });
        }
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos > self.max_message_bytes {
                    self.poisoned = true;
                    return Err(WireError::BufferOverflow { limit: self.max_message_bytes });
                }
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                return Ok(Some(line));
            }
            if self.buf.len() > self.max_message_bytes {
                self.poisoned = true;
                return Err(WireError::BufferOverflow { limit: self.max_message_bytes });
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buf);
                return Ok(Some(line));
            }
            let mut chunk = [0u8; 8192];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// Read and decode the next message.
    pub async fn next_message<T: DeserializeOwned>(&mut self) -> Result<Option<T>, WireError> {
        let Some(line) = self.next_line().await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<T>(&line) {
            Ok(msg) => Ok(Some(msg)),
            Err(_) => {
                let end = line.len().min(PARSE_SNIPPET_BYTES);
                let snippet = String::from_utf8_lossy(&line[..end]).into_owned();
                Err(WireError::Parse { snippet })
            }
        }
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
