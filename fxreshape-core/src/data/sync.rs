//! Daily batch: fetch missing archives, then reshape.
//!
//! Only the archives downloaded by this run are reshaped, so repeated daily
//! runs append each day exactly once. When nothing new arrived the whole
//! local archive set is reshaped instead.

use super::fetch::{fetch_missing, FetchSummary};
use super::progress::PipelineProgress;
use super::provider::{ArchiveSource, FetchError};
use super::reshape::{ReshapeError, ReshapeSummary, Reshaper};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("reshape failed: {0}")]
    Reshape(#[from] ReshapeError),
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub fetch: FetchSummary,
    pub reshape: ReshapeSummary,
}

/// Fetch the window ending at `today` into the reshaper's archive directory,
/// then reshape what was fetched.
pub fn sync(
    source: &dyn ArchiveSource,
    reshaper: &Reshaper,
    today: NaiveDate,
    window_days: u32,
    progress: &dyn PipelineProgress,
) -> Result<SyncSummary, SyncError> {
    let fetch = fetch_missing(source, reshaper.archive_dir(), today, window_days, progress)?;
    if fetch.fetched.is_empty() {
        info!("no new archives, reshaping the full local set");
    }

    // An empty slice makes the reshaper list every local archive.
    let reshape = reshaper.reshape(&fetch.fetched, progress)?;
    Ok(SyncSummary { fetch, reshape })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::progress::NoProgress;
    use std::io::Write;

    /// Serves a bad zip for every day.
    struct Garbage;

    impl ArchiveSource for Garbage {
        fn name(&self) -> &str {
            "garbage"
        }

        fn locate(&self, date: NaiveDate) -> String {
            format!("garbage://{date}")
        }

        fn download(&self, _date: NaiveDate, out: &mut dyn Write) -> Result<u64, FetchError> {
            out.write_all(b"not a zip").unwrap();
            Ok(9)
        }
    }

    #[test]
    fn empty_window_with_no_local_archives_fails_in_reshape() {
        let tmp = tempfile::tempdir().unwrap();
        let reshaper = Reshaper::new(tmp.path().join("zips"), tmp.path().join("csv"));
        let today = NaiveDate::from_ymd_opt(2019, 11, 4).unwrap();

        let err = sync(&Garbage, &reshaper, today, 1, &NoProgress).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Reshape(ReshapeError::NoArchives { .. })
        ));
    }

    #[test]
    fn unreadable_download_surfaces_as_reshape_error() {
        let tmp = tempfile::tempdir().unwrap();
        let reshaper = Reshaper::new(tmp.path().join("zips"), tmp.path().join("csv"));
        let today = NaiveDate::from_ymd_opt(2019, 11, 4).unwrap();

        let err = sync(&Garbage, &reshaper, today, 2, &NoProgress).unwrap_err();
        assert!(matches!(err, SyncError::Reshape(ReshapeError::Archive(_))));
        assert!(tmp.path().join("zips").join("2019-11-03.zip").exists());
    }
}
