//! Derived-indicator cache.
//!
//! Wraps a [`SeriesCache`] and memoizes trend overlays per
//! `(instrument, resample, multiplier, length)`. The overlay table keeps the
//! OHLC prices alongside the band value and direction so callers can plot or
//! evaluate signals from one table.

use super::loader::{LoadError, SeriesCache};
use super::series::timestamp_column;
use crate::domain::{Bar, Instrument};
use crate::indicators::{OverlayParams, Supertrend, TrendIndicator};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Cache key for overlay series.
///
/// The multiplier is keyed by bit pattern; `0.0` and `-0.0` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverlayKey {
    pub instrument: Instrument,
    pub resample: Option<u32>,
    pub multiplier_bits: u64,
    pub length: usize,
}

impl OverlayKey {
    pub fn new(instrument: &str, resample: Option<u32>, params: OverlayParams) -> Self {
        let multiplier = if params.multiplier == 0.0 {
            0.0
        } else {
            params.multiplier
        };
        Self {
            instrument: instrument.to_string(),
            resample,
            multiplier_bits: multiplier.to_bits(),
            length: params.length,
        }
    }

    pub fn multiplier(&self) -> f64 {
        f64::from_bits(self.multiplier_bits)
    }
}

/// One row of an overlay table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Active band; NaN during warmup.
    pub overlay: f64,
    /// +1 up, -1 down, 0 during warmup.
    pub direction: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySeries {
    instrument: Instrument,
    resample: Option<u32>,
    params: OverlayParams,
    indicator: String,
    rows: Vec<OverlayBar>,
}

impl OverlaySeries {
    fn build(
        instrument: &str,
        resample: Option<u32>,
        params: OverlayParams,
        indicator: &dyn TrendIndicator,
        bars: &[Bar],
    ) -> Self {
        let overlay = indicator.compute(bars, params);
        debug_assert_eq!(
            overlay.len(),
            bars.len(),
            "{} returned an overlay of the wrong length",
            indicator.name()
        );
        let rows = bars
            .iter()
            .zip(overlay.value.iter().zip(&overlay.direction))
            .map(|(b, (&value, &direction))| OverlayBar {
                timestamp: b.timestamp,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                overlay: value,
                direction,
            })
            .collect();

        Self {
            instrument: instrument.to_string(),
            resample,
            params,
            indicator: indicator.name().to_string(),
            rows,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn resample(&self) -> Option<u32> {
        self.resample
    }

    pub fn params(&self) -> OverlayParams {
        self.params
    }

    /// Name of the indicator that produced the overlay column.
    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn rows(&self) -> &[OverlayBar] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last `n` rows (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[OverlayBar] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    /// Columns `timestamp`, `open`, `high`, `low`, `close`, `overlay`, `direction`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let bars: Vec<Bar> = self
            .rows
            .iter()
            .map(|r| Bar::new(r.timestamp, r.open, r.high, r.low, r.close))
            .collect();
        let col = |name: &str, f: fn(&OverlayBar) -> f64| {
            Column::new(name.into(), self.rows.iter().map(f).collect::<Vec<f64>>())
        };

        DataFrame::new(vec![
            timestamp_column(&bars)?,
            col("open", |r| r.open),
            col("high", |r| r.high),
            col("low", |r| r.low),
            col("close", |r| r.close),
            col("overlay", |r| r.overlay),
            Column::new(
                "direction".into(),
                self.rows
                    .iter()
                    .map(|r| i32::from(r.direction))
                    .collect::<Vec<i32>>(),
            ),
        ])
    }
}

/// Memoizing overlay computation on top of an owned series cache.
pub struct OverlayCache {
    series: SeriesCache,
    indicator: Box<dyn TrendIndicator>,
    entries: HashMap<OverlayKey, Arc<OverlaySeries>>,
}

impl OverlayCache {
    /// Overlay cache computing Supertrend bands.
    pub fn new(series: SeriesCache) -> Self {
        Self::with_indicator(series, Box::new(Supertrend))
    }

    pub fn with_indicator(series: SeriesCache, indicator: Box<dyn TrendIndicator>) -> Self {
        Self {
            series,
            indicator,
            entries: HashMap::new(),
        }
    }

    pub fn series(&self) -> &SeriesCache {
        &self.series
    }

    pub fn series_mut(&mut self) -> &mut SeriesCache {
        &mut self.series
    }

    /// Overlay for `instrument` at `resample`, with ATR `length` and band
    /// `multiplier`.
    ///
    /// `Ok(None)` when the instrument has no data; nothing is computed or
    /// memoized in that case.
    pub fn get_overlay(
        &mut self,
        instrument: &str,
        multiplier: f64,
        length: usize,
        resample: Option<u32>,
    ) -> Result<Option<Arc<OverlaySeries>>, LoadError> {
        let params = OverlayParams { multiplier, length };
        let key = OverlayKey::new(instrument, resample, params);
        if let Some(overlay) = self.entries.get(&key) {
            debug!(instrument, multiplier, length, "overlay cache hit");
            return Ok(Some(Arc::clone(overlay)));
        }

        let Some(series) = self.series.load(instrument, resample)? else {
            return Ok(None);
        };

        let overlay = Arc::new(OverlaySeries::build(
            instrument,
            resample,
            params,
            self.indicator.as_ref(),
            series.bars(),
        ));
        debug!(
            instrument,
            indicator = self.indicator.name(),
            rows = overlay.len(),
            "overlay computed"
        );
        self.entries.insert(key, Arc::clone(&overlay));
        Ok(Some(overlay))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop memoized overlays. The underlying series stay cached.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
