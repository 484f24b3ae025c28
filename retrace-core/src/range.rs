//! Defining range — the per-day high/low band reduced from DR-window bars.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// The high/low band established during one day's DR window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefiningRange {
    pub high: f64,
    pub low: f64,
}

/// Running reduction over a day's DR-window bars.
///
/// `observe` only ever widens the range (max of highs, min of lows), so the
/// builder can absorb bars chunk by chunk without resetting mid-day. A day
/// with no DR-window bars finalizes to `None` — never to sentinel extremes.
#[derive(Debug, Clone, Default)]
pub struct RangeBuilder {
    range: Option<DefiningRange>,
}

impl RangeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, bar: &Bar) {
        match &mut self.range {
            Some(r) => {
                if bar.high > r.high {
                    r.high = bar.high;
                }
                if bar.low < r.low {
                    r.low = bar.low;
                }
            }
            None => {
                self.range = Some(DefiningRange {
                    high: bar.high,
                    low: bar.low,
                });
            }
        }
    }

    pub fn finalize(&self) -> Option<DefiningRange> {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2019, 6, 3, 13, 30, 0).unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume: 100,
        }
    }

    #[test]
    fn empty_builder_finalizes_to_none() {
        assert_eq!(RangeBuilder::new().finalize(), None);
    }

    #[test]
    fn range_is_max_high_min_low() {
        let mut builder = RangeBuilder::new();
        for (h, l) in [(100.0, 95.0), (101.0, 96.0), (99.0, 94.0)] {
            builder.observe(&bar(h, l));
        }
        let dr = builder.finalize().unwrap();
        assert_eq!(dr.high, 101.0);
        assert_eq!(dr.low, 94.0);
    }

    #[test]
    fn range_widens_monotonically_across_chunks() {
        let mut builder = RangeBuilder::new();
        builder.observe(&bar(100.0, 95.0));
        let first = builder.finalize().unwrap();

        // A later chunk with a narrower bar must not shrink the range.
        builder.observe(&bar(99.0, 96.0));
        let second = builder.finalize().unwrap();
        assert_eq!(first, second);

        // A wider bar extends it.
        builder.observe(&bar(102.0, 94.0));
        let third = builder.finalize().unwrap();
        assert_eq!(third.high, 102.0);
        assert_eq!(third.low, 94.0);
    }
}
