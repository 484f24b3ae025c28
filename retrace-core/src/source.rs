//! Bar source trait and structured error types.
//!
//! The `BarSource` trait abstracts over data sources (CSV files, synthetic
//! data, test fixtures) so implementations can be swapped and mocked. The
//! engine sits above this trait; sources know nothing about sessions or
//! retracements.

use thiserror::Error;

use crate::domain::{Bar, TimeRange};
use crate::session::{SessionClock, SessionWindow};

/// Structured error types for bar sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached or read; fatal for the request and
    /// not retried by the core.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("source error: {0}")]
    Other(String),
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Bars in ascending timestamp order, no duplicates.
    pub bars: Vec<Bar>,
    /// Rows the source could not parse into bars; dropped and counted,
    /// surfaced through the run report.
    pub malformed_dropped: usize,
}

/// A bulk fetch split into bounded chunks.
#[derive(Debug, Clone)]
pub struct BatchedFetch {
    pub batches: Vec<Vec<Bar>>,
    pub malformed_dropped: usize,
}

/// Trait for bar sources.
pub trait BarSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch all bars, optionally bounded to an inclusive time range.
    fn fetch(&self, range: Option<&TimeRange>) -> Result<FetchResult, SourceError>;

    /// Paged variant: the same bars delivered in bounded chunks. Ascending
    /// order and no duplicate or dropped bars across pages are part of the
    /// contract. The default splits a bulk fetch; sources backed by large
    /// stores may override with true paging.
    fn fetch_batches(
        &self,
        range: Option<&TimeRange>,
        batch_size: usize,
    ) -> Result<BatchedFetch, SourceError> {
        let FetchResult {
            bars,
            malformed_dropped,
        } = self.fetch(range)?;
        let batches = if batch_size == 0 {
            vec![bars]
        } else {
            bars.chunks(batch_size).map(<[Bar]>::to_vec).collect()
        };
        Ok(BatchedFetch {
            batches,
            malformed_dropped,
        })
    }

    /// Bulk fetch restricted to one session window (e.g. only DR-window
    /// bars). Classification happens on the fetched bars; sources stay
    /// ignorant of sessions.
    fn fetch_window(
        &self,
        range: Option<&TimeRange>,
        clock: &SessionClock,
        window: SessionWindow,
    ) -> Result<FetchResult, SourceError> {
        let mut fetched = self.fetch(range)?;
        fetched
            .bars
            .retain(|b| clock.classify(b.timestamp) == window);
        Ok(fetched)
    }
}
