//! The sync watermark.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The timestamp up to which local and remote are known to be reconciled.
///
/// Starts at [`Watermark::BEGINNING`], the earliest representable instant,
/// and only moves when the server hands back a new `lastSyncTimestamp` at the
/// end of a fully successful round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>);

impl Watermark {
    /// The watermark before any sync has completed.
    pub const BEGINNING: Watermark = Watermark(DateTime::<Utc>::MIN_UTC);

    /// Wraps a timestamp.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Returns the underlying timestamp.
    pub fn at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns true if no sync has completed yet.
    pub fn is_beginning(&self) -> bool {
        *self == Self::BEGINNING
    }

    /// Epoch milliseconds, the form used in headers and bodies.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Builds a watermark from epoch milliseconds.
    pub fn from_millis(millis: i64) -> ProtocolResult<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(Self)
            .ok_or_else(|| ProtocolError::InvalidWatermark(millis.to_string()))
    }

    /// Renders the value for the `X-Last-Sync-Timestamp` header.
    pub fn to_header_value(&self) -> String {
        self.as_millis().to_string()
    }

    /// Parses an `X-Last-Sync-Timestamp` header value.
    pub fn parse_header_value(value: &str) -> ProtocolResult<Self> {
        let millis = value
            .trim()
            .parse::<i64>()
            .map_err(|_| ProtocolError::InvalidWatermark(value.to_string()))?;
        Self::from_millis(millis)
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::BEGINNING
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_beginning() {
            write!(f, "beginning")
        } else {
            write!(f, "{}", self.0.to_rfc3339())
        }
    }
}
