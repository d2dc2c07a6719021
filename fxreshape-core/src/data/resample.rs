//! Fixed-width time bucket aggregation.
//!
//! Buckets are `m` minutes wide, left-closed and labelled by their start.
//! The bucket grid is anchored at midnight of the first bar's day, so a
//! 5-minute grid always falls on :00, :05, :10 and so on.

use crate::domain::Bar;
use chrono::Duration;

/// Aggregate ascending one-minute bars into `minutes`-wide buckets.
///
/// `open` is the first bar's open, `high` the max, `low` the min, `close`
/// the last bar's close. Buckets with no bars are not emitted. `minutes == 0`
/// returns the input unchanged.
pub fn resample(bars: &[Bar], minutes: u32) -> Vec<Bar> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };
    if minutes == 0 {
        return bars.to_vec();
    }

    let origin = first.timestamp.date().and_time(chrono::NaiveTime::MIN);
    let width = i64::from(minutes);
    let bucket_of = |bar: &Bar| (bar.timestamp - origin).num_minutes().div_euclid(width);

    let mut out: Vec<Bar> = Vec::new();
    let mut current: Option<(i64, Bar)> = None;

    for bar in bars {
        let bucket = bucket_of(bar);
        if let Some((b, agg)) = current.as_mut() {
            if *b == bucket {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                continue;
            }
        }

        if let Some((_, done)) = current.take() {
            out.push(done);
        }
        let label = origin + Duration::minutes(bucket * width);
        current = Some((bucket, Bar::new(label, bar.open, bar.high, bar.low, bar.close)));
    }
    if let Some((_, done)) = current {
        out.push(done);
    }

    out
}
