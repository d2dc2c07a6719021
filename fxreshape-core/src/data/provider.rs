//! Archive source trait and fetch errors.
//!
//! The ArchiveSource trait abstracts over where daily archives come from
//! (the Forexite HTTP endpoint in production, an in-memory fake in tests).
//! The fetcher sits above this trait: sources don't know about the local
//! archive directory or the skip-if-exists rule.

use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching archives.
///
/// None of these are retried: a failure aborts the run, and a rerun resumes
/// from the first day whose archive is still missing.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for daily archive publishers.
pub trait ArchiveSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Location of the archive published for `date`, for progress output.
    fn locate(&self, date: NaiveDate) -> String;

    /// Stream the archive for `date` into `out`. Returns the bytes written.
    fn download(&self, date: NaiveDate, out: &mut dyn Write) -> Result<u64, FetchError>;
}
