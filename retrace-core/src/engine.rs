//! Retracement engine — a sequential reduction over an ascending bar stream.
//!
//! Bars are pushed in bulk or in bounded batches; per-day state is kept
//! until a bar from a later day arrives (or `finish` is called), so batch
//! boundaries never have to align with day boundaries and earlier batches
//! are never reprocessed. Each completed day goes through a two-pass
//! finalization: the defining range is fixed first, then inside events are
//! measured against the finalized range and the post-DR bars are scanned by
//! the breakout state machine.
//!
//! The engine is single-threaded and deterministic: two runs over the same
//! bars produce identical output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use crate::histogram::{Histogram, HistogramSpec};
use crate::range::RangeBuilder;
use crate::retrace::{inside_events, BreakoutState, RetracementEvent};
use crate::session::{SessionClock, SessionWindow};

/// Structured engine errors, distinguishable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No usable bars fell in the DR window anywhere in the requested
    /// range — nothing to analyze. Also raised when every supplied bar was
    /// malformed.
    #[error("no bars in the defining-range window for the requested range")]
    DrWindowEmpty,

    /// Defining ranges exist, but the post-DR window had zero bars across
    /// the entire requested range.
    #[error("no bars in the post-DR window for the requested range")]
    PostDrWindowEmpty,
}

/// Per-day retracement summary. Field names are the report wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub dr_high: f64,
    pub dr_low: f64,
    /// Max inside event value, 0.0 when no bar stayed strictly inside.
    pub max_inside_retracement: f64,
    /// Max outside event value, 0.0 when no breakout retraced.
    pub max_outside_retracement: f64,
    pub inside_events: Vec<RetracementEvent>,
    pub outside_events: Vec<RetracementEvent>,
}

/// Everything one engine run produces. Aggregation mode is the caller's
/// choice: per-day maxima are already on each [`DaySummary`], and
/// [`EngineOutput::build_histogram`] bins the collected per-bar samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub days: Vec<DaySummary>,
    /// One signed retracement value per qualifying post-DR bar (a bar that
    /// crossed a DR bound), in input order. Input to histogram mode.
    pub histogram_samples: Vec<f64>,
    /// Days whose DR window had no bars; skipped, not defaulted.
    pub days_without_dr_data: usize,
    /// Days with a DR but an empty post-DR window.
    pub days_without_post_dr_data: usize,
    /// Days whose post-DR window touched or exceeded the DR high.
    pub days_returned_to_high: usize,
    /// Days whose post-DR window touched or undercut the DR low.
    pub days_returned_to_low: usize,
    pub malformed_bars_dropped: usize,
    pub data_quality_warnings: Vec<String>,
}

impl EngineOutput {
    /// Overall max inside retracement across all days (0.0 when none).
    pub fn max_inside_retracement(&self) -> f64 {
        self.days
            .iter()
            .map(|d| d.max_inside_retracement)
            .fold(0.0, f64::max)
    }

    /// Overall max outside retracement across all days (0.0 when none).
    pub fn max_outside_retracement(&self) -> f64 {
        self.days
            .iter()
            .map(|d| d.max_outside_retracement)
            .fold(0.0, f64::max)
    }

    /// Bin the per-bar samples into a fixed-width histogram. Out-of-range
    /// samples are excluded by the binning, so the histogram total never
    /// exceeds the number of qualifying bars.
    pub fn build_histogram(&self, spec: &HistogramSpec) -> Histogram {
        let mut hist = Histogram::new(spec);
        for v in &self.histogram_samples {
            hist.record(*v);
        }
        hist
    }
}

/// Partial state for the day currently being accumulated.
#[derive(Debug, Clone)]
struct DayState {
    date: NaiveDate,
    range: RangeBuilder,
    dr_bars: Vec<Bar>,
    post_bars: Vec<Bar>,
}

impl DayState {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            range: RangeBuilder::new(),
            dr_bars: Vec::new(),
            post_bars: Vec::new(),
        }
    }
}

/// The engine. Construct, push bars (any batching), then `finish`.
///
/// Stateless across invocations: all state lives in the instance and is
/// consumed by `finish`. Malformed bars (sanity-check failures) are dropped
/// and counted, never fatal on their own.
#[derive(Debug, Clone)]
pub struct RetraceEngine {
    clock: SessionClock,
    current: Option<DayState>,
    days: Vec<DaySummary>,
    histogram_samples: Vec<f64>,
    days_without_dr_data: usize,
    days_without_post_dr_data: usize,
    days_returned_to_high: usize,
    days_returned_to_low: usize,
    post_dr_bars_seen: usize,
    malformed_bars_dropped: usize,
}

impl RetraceEngine {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            current: None,
            days: Vec::new(),
            histogram_samples: Vec::new(),
            days_without_dr_data: 0,
            days_without_post_dr_data: 0,
            days_returned_to_high: 0,
            days_returned_to_low: 0,
            post_dr_bars_seen: 0,
            malformed_bars_dropped: 0,
        }
    }

    /// Push one bar. Bars must arrive in non-decreasing timestamp order;
    /// a bar from a new trading day finalizes the previous day.
    pub fn push(&mut self, bar: Bar) {
        if !bar.is_sane() {
            self.malformed_bars_dropped += 1;
            return;
        }

        let day = bar.trading_day();
        if self.current.as_ref().map(|s| s.date) != Some(day) {
            self.finalize_current_day();
            self.current = Some(DayState::new(day));
        }

        match self.clock.classify(bar.timestamp) {
            SessionWindow::Dr => {
                if let Some(state) = self.current.as_mut() {
                    state.range.observe(&bar);
                    state.dr_bars.push(bar);
                }
            }
            SessionWindow::PostDr => {
                self.post_dr_bars_seen += 1;
                if let Some(state) = self.current.as_mut() {
                    state.post_bars.push(bar);
                }
            }
            // Part of the day grouping, irrelevant to retracement.
            SessionWindow::Other => {}
        }
    }

    /// Push one batch. Batch boundaries carry no meaning; this is identical
    /// to pushing each bar individually.
    pub fn push_batch(&mut self, bars: &[Bar]) {
        for bar in bars {
            self.push(bar.clone());
        }
    }

    /// Finalize the trailing day and produce the run output.
    pub fn finish(mut self) -> Result<EngineOutput, EngineError> {
        self.finalize_current_day();

        if self.days.is_empty() {
            return Err(EngineError::DrWindowEmpty);
        }
        if self.post_dr_bars_seen == 0 {
            return Err(EngineError::PostDrWindowEmpty);
        }

        let mut warnings = Vec::new();
        if self.malformed_bars_dropped > 0 {
            warnings.push(format!(
                "{} malformed bar(s) dropped",
                self.malformed_bars_dropped
            ));
        }
        if self.days_without_dr_data > 0 {
            warnings.push(format!(
                "{} day(s) had no bars in the DR window and were skipped",
                self.days_without_dr_data
            ));
        }

        Ok(EngineOutput {
            days: self.days,
            histogram_samples: self.histogram_samples,
            days_without_dr_data: self.days_without_dr_data,
            days_without_post_dr_data: self.days_without_post_dr_data,
            days_returned_to_high: self.days_returned_to_high,
            days_returned_to_low: self.days_returned_to_low,
            malformed_bars_dropped: self.malformed_bars_dropped,
            data_quality_warnings: warnings,
        })
    }

    /// Two-pass day finalization: fix the range, then classify.
    fn finalize_current_day(&mut self) {
        let Some(state) = self.current.take() else {
            return;
        };

        let Some(dr) = state.range.finalize() else {
            self.days_without_dr_data += 1;
            return;
        };

        let inside = inside_events(&state.dr_bars, &dr);

        if state.post_bars.is_empty() {
            self.days_without_post_dr_data += 1;
        }

        let mut breakout = BreakoutState::default();
        let mut outside = Vec::new();
        let mut touched_high = false;
        let mut touched_low = false;

        for bar in &state.post_bars {
            if let Some(event) = breakout.step(bar, &dr) {
                outside.push(event);
            }

            // One signed sample per bar that crosses a DR bound; the up
            // side takes precedence when a bar crosses both.
            if bar.high > dr.high {
                self.histogram_samples
                    .push((bar.low - dr.high) / dr.high * 100.0);
            } else if bar.low < dr.low {
                self.histogram_samples
                    .push((bar.high - dr.low) / dr.low * 100.0);
            }

            touched_high |= bar.high >= dr.high;
            touched_low |= bar.low <= dr.low;
        }

        if touched_high {
            self.days_returned_to_high += 1;
        }
        if touched_low {
            self.days_returned_to_low += 1;
        }

        self.days.push(DaySummary {
            date: state.date,
            dr_high: dr.high,
            dr_low: dr.low,
            max_inside_retracement: max_event_value(&inside),
            max_outside_retracement: max_event_value(&outside),
            inside_events: inside,
            outside_events: outside,
        });
    }
}

/// Max event value, explicitly 0.0 for an empty list.
fn max_event_value(events: &[RetracementEvent]) -> f64 {
    events.iter().map(|e| e.value).fold(0.0, f64::max)
}
