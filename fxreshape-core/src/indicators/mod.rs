//! Trend overlay indicators.
//!
//! An overlay indicator turns an OHLC series into a per-bar band value and a
//! direction flag. Indicators are pure: bars in, columns out, no state kept
//! between calls. Caching lives one level up in `data::overlay`.

pub mod atr;
pub mod supertrend;

pub use supertrend::Supertrend;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Caller-supplied overlay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayParams {
    /// ATR band width multiplier.
    pub multiplier: f64,
    /// ATR look-back in bars.
    pub length: usize,
}

/// Indicator output, one entry per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendOverlay {
    /// Active band value; NaN during warmup.
    pub value: Vec<f64>,
    /// +1 trending up, -1 trending down, 0 during warmup.
    pub direction: Vec<i8>,
}

impl TrendOverlay {
    /// An all-warmup overlay of length `n`.
    pub fn warmup(n: usize) -> Self {
        Self {
            value: vec![f64::NAN; n],
            direction: vec![0; n],
        }
    }

    pub fn set(&mut self, index: usize, value: f64, direction: i8) {
        self.value[index] = value;
        self.direction[index] = direction;
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Trait for trend overlay indicators.
///
/// # Look-ahead guard
/// No output at bar t may depend on bars after t.
pub trait TrendIndicator: Send + Sync {
    /// Human-readable name (e.g. "supertrend").
    fn name(&self) -> &str;

    /// Compute the overlay for the entire series. Output length equals
    /// `bars.len()`.
    fn compute(&self, bars: &[Bar], params: OverlayParams) -> TrendOverlay;
}

/// Build bars from `(open, high, low, close)` tuples, one minute apart.
#[cfg(test)]
pub(crate) fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-10;
