//! Streaming reader for daily archives.
//!
//! Each archive is a zip with a single text entry: a header line followed by
//! `TICKER,YYYYMMDD,HHMMSS,OPEN,HIGH,LOW,CLOSE` rows. Rows are streamed out of
//! the compressed entry line by line; the entry is never fully buffered.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open archive {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid zip archive {}: {reason}", path.display())]
    Zip { path: PathBuf, reason: String },

    #[error("archive {} contains no entries", path.display())]
    Empty { path: PathBuf },
}

/// Stream every data row of the archive at `path` into `f`.
///
/// `f` receives the 1-based line number inside the entry (the header is
/// line 1) and the trimmed row. Blank lines are skipped. Returns the number
/// of rows delivered. The first error from `f` stops the stream.
pub fn for_each_row<E, F>(path: &Path, mut f: F) -> Result<usize, E>
where
    E: From<ArchiveError>,
    F: FnMut(usize, &str) -> Result<(), E>,
{
    let io_err = |e: std::io::Error| ArchiveError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::Zip {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if archive.len() == 0 {
        return Err(ArchiveError::Empty {
            path: path.to_path_buf(),
        }
        .into());
    }

    let entry = archive.by_index(0).map_err(|e| ArchiveError::Zip {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(archive = %path.display(), entry = entry.name(), "streaming archive entry");

    let mut lines = BufReader::new(entry).lines();

    // Header line.
    match lines.next() {
        None => return Ok(0),
        Some(header) => {
            header.map_err(io_err)?;
        }
    }

    let mut rows = 0;
    for (i, line) in lines.enumerate() {
        let line = line.map_err(io_err)?;
        let row = line.trim();
        if row.is_empty() {
            continue;
        }
        f(i + 2, row)?;
        rows += 1;
    }

    Ok(rows)
}
