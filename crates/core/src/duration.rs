// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration string grammar: `(Nh)?(Nm)?(Ns)?(Nms)?`.
//!
//! Units must appear in h, m, s, ms order, each at most once, with at least
//! one unit present and a strictly positive total. `"1h2m3s"` parses to
//! 3723000 ms; `"5d"`, `"0s"`, and `""` are errors.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid duration {input:?}: {reason}")]
    Invalid { input: String, reason: String },
    #[error("duration {0:?} must be greater than zero")]
    Zero(String),
}

/// Unit rank enforces h < m < s < ms ordering with no repeats.
fn unit_rank(unit: &str) -> Option<u8> {
    match unit {
        "h" => Some(0),
        "m" => Some(1),
        "s" => Some(2),
        "ms" => Some(3),
        _ => None,
    }
}

fn unit_ms(rank: u8) -> u64 {
    match rank {
        0 => 3_600_000,
        1 => 60_000,
        2 => 1_000,
        _ => 1,
    }
}

/// Parse a duration string into a [`Duration`].
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let invalid = |reason: &str| DurationError::Invalid {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut last_rank: Option<u8> = None;
    let mut total_ms: u64 = 0;

    while pos < bytes.len() {
        let num_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == num_start {
            return Err(invalid("expected a number"));
        }
        let value: u64 = s[num_start..pos]
            .parse()
            .map_err(|_| invalid("number out of range"))?;

        // Longest unit first: "ms" before "m"
        let rest = &s[pos..];
        let unit = if rest.starts_with("ms") {
            "ms"
        } else if let Some(c) = rest.chars().next() {
            match c {
                'h' | 'm' | 's' => &rest[..1],
                _ => return Err(invalid(&format!("unknown unit at {:?}", rest))),
            }
        } else {
            return Err(invalid("missing unit"));
        };
        pos += unit.len();

        let rank = match unit_rank(unit) {
            Some(r) => r,
            None => return Err(invalid(&format!("unknown unit {:?}", unit))),
        };
        if let Some(prev) = last_rank {
            if rank <= prev {
                return Err(invalid("units must appear in h, m, s, ms order"));
            }
        }
        last_rank = Some(rank);

        total_ms = total_ms
            .checked_add(
                value
                    .checked_mul(unit_ms(rank))
                    .ok_or_else(|| invalid("duration overflows"))?,
            )
            .ok_or_else(|| invalid("duration overflows"))?;
    }

    if total_ms == 0 {
        return Err(DurationError::Zero(input.to_string()));
    }

    Ok(Duration::from_millis(total_ms))
}

/// Format a millisecond count using the same grammar, largest units first.
pub fn format_ms(ms: u64) -> String {
    if ms == 0 {
        return "0ms".to_string();
    }
    let mut out = String::new();
    let mut rem = ms;
    for (rank, suffix) in [(0u8, "h"), (1, "m"), (2, "s"), (3, "ms")] {
        let unit = unit_ms(rank);
        let n = rem / unit;
        if n > 0 {
            out.push_str(&format!("{}{}", n, suffix));
            rem %= unit;
        }
    }
    out
}

/// Serde helper: deserialize a duration grammar string.
pub mod serde_duration {
    use super::parse_duration;
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = Option::<String>::deserialize(deserializer)?;
            match s {
                Some(s) => parse_duration(&s).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
