//! Row parser for daily archive lines.
//!
//! Archive rows look like `EURUSD,20191101,000900,1.1150,1.1150,1.1150,1.1150`:
//! ticker, date, time, open, high, low, close.

use crate::domain::{Instrument, RawBar};
use chrono::NaiveDateTime;
use thiserror::Error;

/// Number of comma-separated tokens in an archive row.
pub const ROW_TOKENS: usize = 7;

const ROW_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected 7 tokens, found {found} in: {row}")]
    MalformedRow { row: String, found: usize },

    #[error("unparsable timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },
}

/// Parse one archive row into its instrument and textual bar.
pub fn parse_row(line: &str) -> Result<(Instrument, RawBar), ParseError> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() != ROW_TOKENS {
        return Err(ParseError::MalformedRow {
            row: line.to_string(),
            found: tokens.len(),
        });
    }

    let stamp = format!("{}{}", tokens[1].trim(), tokens[2].trim());
    let timestamp = NaiveDateTime::parse_from_str(&stamp, ROW_TIMESTAMP_FORMAT).map_err(|e| {
        ParseError::Timestamp {
            value: stamp.clone(),
            reason: e.to_string(),
        }
    })?;

    let bar = RawBar {
        timestamp,
        open: tokens[3].trim().to_string(),
        high: tokens[4].trim().to_string(),
        low: tokens[5].trim().to_string(),
        close: tokens[6].trim().to_string(),
    };

    Ok((tokens[0].trim().to_string(), bar))
}
