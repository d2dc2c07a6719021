//! Series loader: per-instrument files into memoized price series.
//!
//! A load reads `{csv_dir}/{INSTRUMENT}.csv`, shifts every timestamp back by
//! [`TIMEZONE_OFFSET_HOURS`], stable-sorts by time and optionally resamples.
//! Results are memoized per `(instrument, resample)` for the lifetime of the
//! cache; a hit hands out the same `Arc` without touching the filesystem.

use super::reshape::instrument_path;
use super::resample::resample;
use super::series::PriceSeries;
use crate::config::PipelineConfig;
use crate::domain::{Bar, Instrument, TIMESTAMP_FORMAT};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Hours subtracted from every stored timestamp on load.
pub const TIMEZONE_OFFSET_HOURS: i64 = 1;

/// Fields per line in a per-instrument file.
const FILE_FIELDS: usize = 5;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed data in {}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cache key for loaded series.
///
/// `resample: None` and `Some(0)` yield the same bars but are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub instrument: Instrument,
    pub resample: Option<u32>,
}

impl SeriesKey {
    pub fn new(instrument: impl Into<Instrument>, resample: Option<u32>) -> Self {
        Self {
            instrument: instrument.into(),
            resample,
        }
    }
}

/// Memoizing loader over a directory of per-instrument files.
pub struct SeriesCache {
    csv_dir: PathBuf,
    entries: HashMap<SeriesKey, Arc<PriceSeries>>,
}

impl SeriesCache {
    pub fn new(csv_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_dir: csv_dir.into(),
            entries: HashMap::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.csv_dir)
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    /// Load the series for `instrument`, aggregated to `resample` minutes.
    ///
    /// Returns `Ok(None)` when the instrument has no file. Not-found results
    /// are not memoized, so a later reshape can still supply the file.
    pub fn load(
        &mut self,
        instrument: &str,
        resample_minutes: Option<u32>,
    ) -> Result<Option<Arc<PriceSeries>>, LoadError> {
        let key = SeriesKey::new(instrument, resample_minutes);
        if let Some(series) = self.entries.get(&key) {
            debug!(instrument, ?resample_minutes, "series cache hit");
            return Ok(Some(Arc::clone(series)));
        }

        let path = instrument_path(&self.csv_dir, instrument);
        let Some(mut bars) = read_instrument_file(&path)? else {
            debug!(instrument, path = %path.display(), "no file for instrument");
            return Ok(None);
        };

        bars.sort_by_key(|b| b.timestamp);
        if let Some(minutes) = resample_minutes.filter(|&m| m > 0) {
            bars = resample(&bars, minutes);
        }
        debug!(instrument, ?resample_minutes, bars = bars.len(), "series loaded");

        let series = Arc::new(PriceSeries::new(instrument, resample_minutes, bars));
        self.entries.insert(key, Arc::clone(&series));
        Ok(Some(series))
    }

    pub fn contains(&self, instrument: &str, resample: Option<u32>) -> bool {
        self.entries
            .contains_key(&SeriesKey::new(instrument, resample))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every memoized series.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Read a per-instrument file into bars, shifted by the timezone offset.
///
/// `Ok(None)` if the file does not exist.
fn read_instrument_file(path: &Path) -> Result<Option<Vec<Bar>>, LoadError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let offset = Duration::hours(TIMEZONE_OFFSET_HOURS);
    let mut bars = Vec::new();
    let mut record = csv::StringRecord::new();

    loop {
        let more = reader.read_record(&mut record).map_err(|e| csv_error(path, e))?;
        if !more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| LoadError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        };

        if record.len() != FILE_FIELDS {
            return Err(malformed(format!(
                "expected {FILE_FIELDS} fields, found {}",
                record.len()
            )));
        }

        let timestamp = NaiveDateTime::parse_from_str(&record[0], TIMESTAMP_FORMAT)
            .map_err(|e| malformed(format!("timestamp '{}': {e}", &record[0])))?;
        let mut prices = [0.0_f64; 4];
        for (slot, field) in prices.iter_mut().zip(record.iter().skip(1)) {
            *slot = field
                .parse()
                .map_err(|e| malformed(format!("price '{field}': {e}")))?;
        }
        let [open, high, low, close] = prices;

        bars.push(Bar::new(timestamp - offset, open, high, low, close));
    }

    Ok(Some(bars))
}

fn csv_error(path: &Path, e: csv::Error) -> LoadError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => LoadError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        },
    }
}
