//! Supertrend: ATR-based directional overlay.
//!
//! Inherently sequential/stateful: direction flips between support and
//! resistance based on close vs band comparisons.
//!
//! Output per bar: the active band (lower band when trending up, upper band
//! when trending down) and the direction (+1 up, -1 down, 0 during warmup).

use super::atr::{true_range, wilder_smooth};
use super::{OverlayParams, TrendIndicator, TrendOverlay};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct Supertrend;

impl TrendIndicator for Supertrend {
    fn name(&self) -> &str {
        "supertrend"
    }

    fn compute(&self, bars: &[Bar], params: OverlayParams) -> TrendOverlay {
        let n = bars.len();
        let mut overlay = TrendOverlay::warmup(n);

        let atr = wilder_smooth(&true_range(bars), params.length);

        let Some(start) = atr.iter().position(|v| !v.is_nan()) else {
            return overlay;
        };

        let hl2 = (bars[start].high + bars[start].low) / 2.0;
        let mut upper_band = hl2 + params.multiplier * atr[start];
        let mut lower_band = hl2 - params.multiplier * atr[start];
        // Start trending up (support)
        let mut trending_up = true;
        overlay.set(start, lower_band, 1);

        for i in (start + 1)..n {
            let bar = &bars[i];
            if atr[i].is_nan() || bar.close.is_nan() || bar.high.is_nan() || bar.low.is_nan() {
                continue;
            }

            let hl2 = (bar.high + bar.low) / 2.0;
            let basic_upper = hl2 + params.multiplier * atr[i];
            let basic_lower = hl2 - params.multiplier * atr[i];

            // Upper band can only tighten while price stays below it.
            let prev_close = bars[i - 1].close;
            upper_band = if !prev_close.is_nan() && prev_close <= upper_band {
                basic_upper.min(upper_band)
            } else {
                basic_upper
            };

            // Lower band can only tighten while price stays above it.
            lower_band = if !prev_close.is_nan() && prev_close >= lower_band {
                basic_lower.max(lower_band)
            } else {
                basic_lower
            };

            if trending_up && bar.close < lower_band {
                trending_up = false;
            } else if !trending_up && bar.close > upper_band {
                trending_up = true;
            }

            if trending_up {
                overlay.set(i, lower_band, 1);
            } else {
                overlay.set(i, upper_band, -1);
            }
        }

        overlay
    }
}
