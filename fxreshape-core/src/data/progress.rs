//! Progress callbacks for the fetch and reshape batch steps.

use super::fetch::FetchSummary;
use super::reshape::ReshapeSummary;
use chrono::NaiveDate;
use std::path::Path;

/// Progress callback for pipeline runs.
///
/// Every method has an empty default so sinks only implement what they show.
pub trait PipelineProgress {
    /// Called before downloading the archive for `date`.
    fn on_download(&self, _date: NaiveDate, _location: &str) {}

    /// Called when the fetch window has been walked.
    fn on_fetch_complete(&self, _summary: &FetchSummary) {}

    /// Called when the universe discovery archive is opened.
    fn on_discovery(&self, _archive: &Path) {}

    /// Called before streaming archive `index` of `total` in the bulk pass.
    fn on_archive(&self, _archive: &Path, _index: usize, _total: usize) {}

    /// Called once every output file has been closed.
    fn on_reshape_complete(&self, _summary: &ReshapeSummary) {}
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn on_download(&self, _date: NaiveDate, location: &str) {
        println!("{location}");
    }

    fn on_fetch_complete(&self, summary: &FetchSummary) {
        println!(
            "Fetch complete: {} downloaded, {} already present",
            summary.fetched.len(),
            summary.skipped
        );
    }

    fn on_discovery(&self, archive: &Path) {
        println!("Parsing available tickers from {}", archive.display());
    }

    fn on_archive(&self, archive: &Path, index: usize, total: usize) {
        println!("[{}/{}] Processing {}", index + 1, total, archive.display());
    }

    fn on_reshape_complete(&self, summary: &ReshapeSummary) {
        println!(
            "\nReshape complete: {} archives, {} rows written, {} rows dropped, {} instruments",
            summary.archives,
            summary.rows_written,
            summary.rows_dropped,
            summary.instruments.len()
        );
    }
}

/// Progress sink that reports nothing.
pub struct NoProgress;

impl PipelineProgress for NoProgress {}
