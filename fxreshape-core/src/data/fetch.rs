//! Archive fetcher: walks a historical window and downloads missing days.
//!
//! A day whose local archive already exists is skipped without touching the
//! network, so the fetcher can be run every day and only fills gaps.

use super::forexite::archive_file_name;
use super::progress::PipelineProgress;
use super::provider::{ArchiveSource, FetchError};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default look-back window: seven years of calendar days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7 * 365;

/// Outcome of a fetch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FetchSummary {
    /// Newly downloaded archive paths, ascending by file name.
    pub fetched: Vec<PathBuf>,
    /// Days whose archive was already on disk.
    pub skipped: usize,
}

/// Days covered by a window, newest first: `today - 1` down to
/// `today - (window_days - 1)`. Today itself is never requested.
pub fn window_dates(today: NaiveDate, window_days: u32) -> impl Iterator<Item = NaiveDate> {
    (1..window_days).map(move |offset| today - Duration::days(i64::from(offset)))
}

/// Download every archive in the window that is not yet present locally.
///
/// The archive directory is created on first download. Any download error
/// aborts the run; days fetched before the failure stay on disk.
pub fn fetch_missing(
    source: &dyn ArchiveSource,
    archive_dir: &Path,
    today: NaiveDate,
    window_days: u32,
    progress: &dyn PipelineProgress,
) -> Result<FetchSummary, FetchError> {
    let mut summary = FetchSummary::default();

    for date in window_dates(today, window_days) {
        let path = archive_dir.join(archive_file_name(date));
        if path.exists() {
            debug!(date = %date, "archive already present, skipping");
            summary.skipped += 1;
            continue;
        }

        let location = source.locate(date);
        progress.on_download(date, &location);

        fs::create_dir_all(archive_dir).map_err(|e| FetchError::Io {
            path: archive_dir.to_path_buf(),
            source: e,
        })?;

        let bytes = download_atomic(source, date, &path)?;
        debug!(date = %date, bytes, source = source.name(), "archive downloaded");
        summary.fetched.push(path);
    }

    summary.fetched.sort();
    info!(
        fetched = summary.fetched.len(),
        skipped = summary.skipped,
        "fetch complete"
    );
    progress.on_fetch_complete(&summary);
    Ok(summary)
}

/// Download into `{path}.part` and rename into place only once complete.
fn download_atomic(
    source: &dyn ArchiveSource,
    date: NaiveDate,
    path: &Path,
) -> Result<u64, FetchError> {
    let tmp_path = path.with_extension("zip.part");
    let io_err = |p: &Path, e: std::io::Error| FetchError::Io {
        path: p.to_path_buf(),
        source: e,
    };

    let file = File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);

    let written = match source.download(date, &mut writer) {
        Ok(n) => n,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
    };

    writer.flush().map_err(|e| io_err(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(path, e)
    })?;

    Ok(written)
}
