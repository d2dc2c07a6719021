//! Loaded price series.

use crate::domain::{Bar, Instrument};
use chrono::NaiveDateTime;
use polars::prelude::*;

/// An in-memory, time-ordered bar table for one instrument.
///
/// Timestamps are strictly ascending once loaded through the series cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    instrument: Instrument,
    resample: Option<u32>,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(instrument: impl Into<Instrument>, resample: Option<u32>, bars: Vec<Bar>) -> Self {
        Self {
            instrument: instrument.into(),
            resample,
            bars,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Bucket width in minutes the series was aggregated to, if requested.
    pub fn resample(&self) -> Option<u32> {
        self.resample
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars with `start <= timestamp <= end`.
    pub fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[Bar] {
        let lo = self.bars.partition_point(|b| b.timestamp < start);
        let hi = self.bars.partition_point(|b| b.timestamp <= end);
        if lo >= hi {
            &[]
        } else {
            &self.bars[lo..hi]
        }
    }

    /// Columns `timestamp` (millisecond datetime), `open`, `high`, `low`, `close`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            timestamp_column(&self.bars)?,
            Column::new("open".into(), self.bars.iter().map(|b| b.open).collect::<Vec<_>>()),
            Column::new("high".into(), self.bars.iter().map(|b| b.high).collect::<Vec<_>>()),
            Column::new("low".into(), self.bars.iter().map(|b| b.low).collect::<Vec<_>>()),
            Column::new("close".into(), self.bars.iter().map(|b| b.close).collect::<Vec<_>>()),
        ])
    }
}

pub(crate) fn timestamp_column(bars: &[Bar]) -> PolarsResult<Column> {
    let millis: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    Column::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}
