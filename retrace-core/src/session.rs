//! Session windows — fixed UTC windows that partition each trading day.
//!
//! The defining-range (DR) window is inclusive of both ends; the post-DR
//! window is exclusive at both of its stated bounds, so 14:30:00 still
//! belongs to the DR window while 14:30:01 is post-DR and 19:00:00 falls
//! outside both. Timestamps are taken as UTC with no conversion.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Which session window a bar's timestamp falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionWindow {
    /// Defining-range window, [dr_open, dr_close] inclusive.
    Dr,
    /// Post-DR observation window, (dr_close, post_close) exclusive.
    PostDr,
    /// Everything else. Still belongs to the day grouping, ignored for
    /// retracement purposes.
    Other,
}

/// UTC window boundaries. Exposed as configuration; the defaults are the
/// canonical 13:30–14:30 DR window and 14:30–19:00 observation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_dr_open")]
    pub dr_open: NaiveTime,
    #[serde(default = "default_dr_close")]
    pub dr_close: NaiveTime,
    #[serde(default = "default_post_close")]
    pub post_close: NaiveTime,
}

fn default_dr_open() -> NaiveTime {
    NaiveTime::from_hms_opt(13, 30, 0).expect("valid constant time")
}

fn default_dr_close() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 30, 0).expect("valid constant time")
}

fn default_post_close() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).expect("valid constant time")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dr_open: default_dr_open(),
            dr_close: default_dr_close(),
            post_close: default_post_close(),
        }
    }
}

impl SessionConfig {
    /// Windows must be ordered: dr_open < dr_close < post_close.
    pub fn is_valid(&self) -> bool {
        self.dr_open < self.dr_close && self.dr_close < self.post_close
    }
}

/// Pure classifier from timestamp to session window.
#[derive(Debug, Clone)]
pub struct SessionClock {
    config: SessionConfig,
}

impl SessionClock {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Classify a UTC timestamp. Pure function of the time of day.
    pub fn classify(&self, timestamp: DateTime<Utc>) -> SessionWindow {
        let t = timestamp.time();
        if t >= self.config.dr_open && t <= self.config.dr_close {
            SessionWindow::Dr
        } else if t > self.config.dr_close && t < self.config.post_close {
            SessionWindow::PostDr
        } else {
            SessionWindow::Other
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
