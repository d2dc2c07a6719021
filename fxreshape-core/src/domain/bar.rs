//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used in per-instrument files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// OHLC bar for a single instrument at a single instant.
///
/// Source resolution is one minute. The `low <= open,close <= high` ordering
/// is not enforced anywhere in the pipeline; see [`Bar::is_sane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// OHLC ordering check. Informational only: loaders never reject bars.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// A bar as read from a daily archive, prices still in their original text.
///
/// Keeping the text avoids float round-tripping while rows are fanned out
/// into per-instrument files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl RawBar {
    /// Render as one per-instrument file line (newline included).
    pub fn to_line(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.open,
            self.high,
            self.low,
            self.close
        )
    }
}
