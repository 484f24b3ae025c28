//! Serializable run configuration (TOML).
//!
//! A config file looks like:
//!
//! ```toml
//! [run]
//! mode = "histogram"
//! start = "2019-06-03"
//! end = "2019-06-28"
//!
//! [source]
//! kind = "csv"
//! path = "bars.csv"
//!
//! [session]
//! dr_open = "13:30:00"
//! dr_close = "14:30:00"
//! post_close = "19:00:00"
//!
//! [histogram]
//! min = -2.2
//! max = 0.5
//! step = 0.1
//! ```
//!
//! `[session]` and `[histogram]` are optional and default to the canonical
//! window boundaries and bin edges.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use retrace_core::domain::TimeRange;
use retrace_core::histogram::HistogramSpec;
use retrace_core::session::SessionConfig;

/// Errors from config loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid session windows: dr_open < dr_close < post_close must hold")]
    InvalidSession,

    #[error("invalid histogram spec: step must be > 0 and min < max")]
    InvalidHistogram,

    #[error("run.start must not be after run.end")]
    InvalidDateRange,
}

/// Aggregation mode, selected by caller intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Report per-day and overall max inside/outside retracements.
    Max,
    /// Additionally bin per-bar signed retracements into a histogram.
    Histogram,
}

/// `[run]` section: mode and optional UTC date bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    pub mode: RunMode,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

/// `[source]` section: where bars come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSection {
    /// OHLCV CSV file (ts_event, open, high, low, close, volume).
    Csv { path: PathBuf },
    /// Deterministic synthetic bars, seeded from the symbol.
    Synthetic { symbol: String },
}

/// Complete run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetraceConfig {
    pub run: RunSection,
    pub source: SourceSection,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub histogram: HistogramSpec,
}

impl RetraceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.session.is_valid() {
            return Err(ConfigError::InvalidSession);
        }
        if !self.histogram.is_valid() {
            return Err(ConfigError::InvalidHistogram);
        }
        if let (Some(start), Some(end)) = (self.run.start, self.run.end) {
            if start > end {
                return Err(ConfigError::InvalidDateRange);
            }
        }
        Ok(())
    }

    /// Fetch bound derived from the date section: midnight of `start` to the
    /// last second of `end`. `None` when neither bound is set.
    pub fn time_range(&self) -> Option<TimeRange> {
        let start = self.run.start.unwrap_or(NaiveDate::MIN);
        let end = self.run.end.unwrap_or(NaiveDate::MAX);
        if self.run.start.is_none() && self.run.end.is_none() {
            return None;
        }
        let start_dt = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?);
        let end_dt = Utc.from_utc_datetime(&end.and_hms_opt(23, 59, 59)?);
        Some(TimeRange {
            start: start_dt,
            end: end_dt,
        })
    }
}
