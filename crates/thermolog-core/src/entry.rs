//! Log entries and their on-disk text form.
//!
//! One entry per line: `<timestamp> <value>`, where the timestamp is whole
//! seconds since the Unix epoch and the value is fixed-point with exactly two
//! fractional digits.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, ThermologError};

/// One `(timestamp, value)` record in a log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Entry {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Measured (or averaged) value.
    pub value: f64,
}

impl Entry {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Parse one stored line.
    ///
    /// Surrounding whitespace and any line terminator are ignored. Returns
    /// `None` unless the line holds exactly two fields: an integer timestamp
    /// and a finite number.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let timestamp = fields.next()?.parse::<i64>().ok()?;
        let value = fields.next()?.parse::<f64>().ok()?;
        if fields.next().is_some() || !value.is_finite() {
            return None;
        }
        Some(Self { timestamp, value })
    }

    /// Age of this entry relative to `now`, in seconds.
    ///
    /// Negative when the entry is stamped in the future.
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.timestamp, self.value)
    }
}

/// Parse one sample line from a source.
///
/// Returns `None` for blank lines and anything that is not a finite real
/// number.
pub fn parse_sample(line: &str) -> Option<f64> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_sample`], but keeps the rejected input for reporting.
pub fn parse_sample_checked(line: &str) -> Result<f64> {
    parse_sample(line).ok_or_else(|| ThermologError::Parse {
        input: line.to_string(),
    })
}
