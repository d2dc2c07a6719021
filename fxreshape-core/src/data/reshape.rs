//! Reshape engine: fans daily archives out into per-instrument files.
//!
//! Layout: `{csv_dir}/{INSTRUMENT}.csv`, headerless, one
//! `TIMESTAMP, OPEN, HIGH, LOW, CLOSE` line per bar, append-only.
//!
//! A run has two passes:
//! 1. Universe discovery: the most recent archive decides which instruments
//!    get an output file. Instruments that stopped trading before that day
//!    are not tracked.
//! 2. Bulk pass: every archive, oldest first, is streamed and each row is
//!    appended to its instrument's file. Rows for untracked instruments are
//!    dropped.
//!
//! Output handles stay open for the whole bulk pass and are closed together
//! at the end. A malformed row anywhere aborts the run.

use super::archive::{for_each_row, ArchiveError};
use super::parse::{parse_row, ParseError};
use super::progress::PipelineProgress;
use crate::config::PipelineConfig;
use crate::domain::{Instrument, RawBar};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("no archives found in {}", dir.display())]
    NoArchives { dir: PathBuf },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("{}:{line}: {source}", archive.display())]
    Row {
        archive: PathBuf,
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("instrument code '{0}' cannot be used as a file name")]
    InvalidInstrument(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a reshape run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReshapeSummary {
    /// Archives streamed in the bulk pass.
    pub archives: usize,
    /// Bars appended across all output files.
    pub rows_written: u64,
    /// Rows skipped because their instrument is outside the universe.
    pub rows_dropped: u64,
    /// Instruments that received an output file, sorted.
    pub instruments: Vec<Instrument>,
}

/// List every `*.zip` in `archive_dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_archives(archive_dir: &Path) -> Result<Vec<PathBuf>, ReshapeError> {
    if !archive_dir.is_dir() {
        return Ok(Vec::new());
    }

    let io_err = |e: std::io::Error| ReshapeError::Io {
        path: archive_dir.to_path_buf(),
        source: e,
    };

    let mut archives = Vec::new();
    for entry in fs::read_dir(archive_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("zip") {
            archives.push(path);
        }
    }

    archives.sort();
    Ok(archives)
}

/// Per-instrument file writer.
pub struct Reshaper {
    archive_dir: PathBuf,
    csv_dir: PathBuf,
}

impl Reshaper {
    pub fn new(archive_dir: impl Into<PathBuf>, csv_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            csv_dir: csv_dir.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.archive_dir, &config.csv_dir)
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    /// Output file for an instrument: `{csv_dir}/{INSTRUMENT}.csv`
    pub fn output_path(&self, instrument: &str) -> PathBuf {
        instrument_path(&self.csv_dir, instrument)
    }

    /// Reshape `archives` into per-instrument files.
    ///
    /// An empty slice means "every archive on disk". Archives are always
    /// processed in file-name order, which is chronological.
    pub fn reshape(
        &self,
        archives: &[PathBuf],
        progress: &dyn PipelineProgress,
    ) -> Result<ReshapeSummary, ReshapeError> {
        let mut archives = if archives.is_empty() {
            list_archives(&self.archive_dir)?
        } else {
            archives.to_vec()
        };
        archives.sort();

        let newest = archives
            .last()
            .cloned()
            .ok_or_else(|| ReshapeError::NoArchives {
                dir: self.archive_dir.clone(),
            })?;

        fs::create_dir_all(&self.csv_dir).map_err(|e| ReshapeError::Io {
            path: self.csv_dir.clone(),
            source: e,
        })?;

        let mut outputs = OutputFiles::new(&self.csv_dir);

        progress.on_discovery(&newest);
        for_each_row::<ReshapeError, _>(&newest, |line, row| {
            let (instrument, _) = parse_at(&newest, line, row)?;
            outputs.open(&instrument)
        })?;
        info!(
            archive = %newest.display(),
            instruments = outputs.len(),
            "universe discovered"
        );

        let mut summary = ReshapeSummary {
            archives: archives.len(),
            ..ReshapeSummary::default()
        };
        let mut untracked: BTreeSet<Instrument> = BTreeSet::new();

        for (i, archive) in archives.iter().enumerate() {
            progress.on_archive(archive, i, archives.len());

            let mut written = 0u64;
            let mut dropped = 0u64;
            for_each_row::<ReshapeError, _>(archive, |line, row| {
                let (instrument, bar) = parse_at(archive, line, row)?;
                if outputs.append(&instrument, &bar)? {
                    written += 1;
                } else {
                    dropped += 1;
                    untracked.insert(instrument);
                }
                Ok(())
            })?;

            info!(archive = %archive.display(), written, dropped, "archive processed");
            summary.rows_written += written;
            summary.rows_dropped += dropped;
        }

        if !untracked.is_empty() {
            warn!(
                count = untracked.len(),
                instruments = ?untracked,
                "rows dropped for instruments absent from the newest archive"
            );
        }

        summary.instruments = outputs.close()?;
        progress.on_reshape_complete(&summary);
        Ok(summary)
    }
}

pub(crate) fn instrument_path(csv_dir: &Path, instrument: &str) -> PathBuf {
    csv_dir.join(format!("{instrument}.csv"))
}

fn parse_at(archive: &Path, line: usize, row: &str) -> Result<(Instrument, RawBar), ReshapeError> {
    parse_row(row).map_err(|source| ReshapeError::Row {
        archive: archive.to_path_buf(),
        line,
        source,
    })
}

/// Open append handles, one per tracked instrument.
///
/// Handles are flushed and closed by [`OutputFiles::close`]; if a run aborts
/// early they are released when the value is dropped.
struct OutputFiles {
    dir: PathBuf,
    handles: BTreeMap<Instrument, BufWriter<File>>,
}

impl OutputFiles {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            handles: BTreeMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.handles.len()
    }

    /// Open `{dir}/{instrument}.csv` in create-or-append mode, once.
    fn open(&mut self, instrument: &str) -> Result<(), ReshapeError> {
        if self.handles.contains_key(instrument) {
            return Ok(());
        }
        if instrument.is_empty() || !instrument.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ReshapeError::InvalidInstrument(instrument.to_string()));
        }

        let path = instrument_path(&self.dir, instrument);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ReshapeError::Io { path, source: e })?;
        self.handles
            .insert(instrument.to_string(), BufWriter::new(file));
        Ok(())
    }

    /// Append a bar. Returns false when the instrument is not tracked.
    fn append(&mut self, instrument: &str, bar: &RawBar) -> Result<bool, ReshapeError> {
        let Some(writer) = self.handles.get_mut(instrument) else {
            return Ok(false);
        };
        writer
            .write_all(bar.to_line().as_bytes())
            .map_err(|e| ReshapeError::Io {
                path: instrument_path(&self.dir, instrument),
                source: e,
            })?;
        Ok(true)
    }

    /// Flush and close every handle. Returns the tracked instruments.
    fn close(self) -> Result<Vec<Instrument>, ReshapeError> {
        let mut instruments = Vec::with_capacity(self.handles.len());
        for (instrument, mut writer) in self.handles {
            writer.flush().map_err(|e| ReshapeError::Io {
                path: instrument_path(&self.dir, &instrument),
                source: e,
            })?;
            instruments.push(instrument);
        }
        Ok(instruments)
    }
}
