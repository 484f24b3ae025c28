//! Retracement events and the per-day breakout state machine.
//!
//! Two detectors produce events:
//! - Inside: DR-window bars strictly inside the *finalized* range, measuring
//!   how far price pulled back from the eventual extremes. Classification
//!   against the finalized range requires a second pass after the range is
//!   fixed; the engine buffers a day's bars for exactly this reason.
//! - Outside: post-DR bars, measured against the breakout level once a
//!   direction is established.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::range::DefiningRange;

/// Whether an event occurred inside the DR window or in the post-DR scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetracementKind {
    Inside,
    Outside,
}

/// One retracement observation, as a percentage of the reference level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetracementEvent {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub kind: RetracementKind,
}

/// Per-day breakout state for the post-DR scan.
///
/// Terminal state persists to end of day; there is no day-to-day carryover.
/// Repeated breaches of the established side never re-trigger a transition;
/// the direction only changes when the opposite extreme is newly breached.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum BreakoutState {
    #[default]
    NoBreakout,
    BrokeUp {
        breakout_price: f64,
    },
    BrokeDown {
        breakout_price: f64,
    },
}

impl BreakoutState {
    /// Advance the state machine by one post-DR bar and return the outside
    /// retracement event it produces, if any.
    ///
    /// When a single bar breaches both bounds, the up-side check takes
    /// precedence.
    pub fn step(&mut self, bar: &Bar, dr: &DefiningRange) -> Option<RetracementEvent> {
        if bar.high > dr.high && !matches!(self, BreakoutState::BrokeUp { .. }) {
            *self = BreakoutState::BrokeUp {
                breakout_price: dr.high,
            };
        } else if bar.low < dr.low && !matches!(self, BreakoutState::BrokeDown { .. }) {
            *self = BreakoutState::BrokeDown {
                breakout_price: dr.low,
            };
        }

        match *self {
            BreakoutState::NoBreakout => None,
            BreakoutState::BrokeUp { breakout_price } => {
                let retracement = (bar.low - breakout_price) / breakout_price * 100.0;
                (retracement < 0.0).then(|| RetracementEvent {
                    timestamp: bar.timestamp,
                    value: retracement.abs(),
                    kind: RetracementKind::Outside,
                })
            }
            BreakoutState::BrokeDown { breakout_price } => {
                let retracement = (bar.high - breakout_price) / breakout_price * 100.0;
                (retracement > 0.0).then(|| RetracementEvent {
                    timestamp: bar.timestamp,
                    value: retracement,
                    kind: RetracementKind::Outside,
                })
            }
        }
    }
}

/// Inside-range events over one day's DR-window bars, measured against the
/// finalized range.
///
/// A bar qualifies only when strictly inside: `high < dr.high` and
/// `low > dr.low`. The event value is the larger of the pullbacks from the
/// two extremes.
pub fn inside_events(dr_bars: &[Bar], dr: &DefiningRange) -> Vec<RetracementEvent> {
    dr_bars
        .iter()
        .filter(|b| b.high < dr.high && b.low > dr.low)
        .map(|b| {
            let high_ret = (dr.high - b.high) / dr.high * 100.0;
            let low_ret = (b.low - dr.low) / dr.low * 100.0;
            RetracementEvent {
                timestamp: b.timestamp,
                value: high_ret.max(low_ret),
                kind: RetracementKind::Inside,
            }
        })
        .collect()
}
