//! Bar — the fundamental market data unit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single one-minute interval, timestamped in UTC.
///
/// Sequences handed to the engine must be non-decreasing in timestamp;
/// sources own that ordering guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// UTC calendar date of this bar — the per-day grouping key.
    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Basic OHLC sanity check: high >= low, the extremes bracket open and
    /// close, and all prices are finite and strictly positive. Positivity
    /// matters downstream: range bounds become divisors in the percentage
    /// math, so a zero or negative price must never reach the engine.
    pub fn is_sane(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.low > 0.0
    }
}

/// Inclusive UTC time range bounding a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}
