//! Run orchestration — wires source → engine → report.
//!
//! `run_retrace()` is the single entry point: it fetches bars in bounded
//! batches from a `BarSource`, feeds them through the core engine, and
//! assembles a serializable `RetraceReport`. Errors stay distinguishable
//! end to end: a config problem, an unreachable source, and a legitimately
//! empty window each surface as their own kind.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use retrace_core::domain::Bar;
use retrace_core::engine::{DaySummary, EngineError, RetraceEngine};
use retrace_core::histogram::Histogram;
use retrace_core::session::{SessionClock, SessionConfig};
use retrace_core::source::{BarSource, SourceError};

use crate::config::{ConfigError, RetraceConfig, RunMode};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Bars per batch handed to the engine. Bounds memory against large files;
/// batch boundaries are invisible to the result.
const FETCH_BATCH_SIZE: usize = 10_000;

/// Errors from the runner, each kind inspectable by the caller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("failed to write report: {0}")]
    Export(String),
}

/// Complete result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetraceReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub mode: RunMode,
    pub source: String,
    pub session: SessionConfig,
    pub days: Vec<DaySummary>,
    /// Overall maxima across all days (0.0 when no events at all).
    pub max_inside_retracement: f64,
    pub max_outside_retracement: f64,
    /// Present in histogram mode only.
    pub histogram: Option<Histogram>,
    pub total_days: usize,
    pub days_without_dr_data: usize,
    pub days_without_post_dr_data: usize,
    pub pct_days_returned_to_high: f64,
    pub pct_days_returned_to_low: f64,
    pub malformed_bars_dropped: usize,
    pub data_quality_warnings: Vec<String>,
    /// BLAKE3 over the fetched bars, for reproducibility checks.
    pub dataset_hash: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run the full analysis for a config against a bar source.
pub fn run_retrace(
    config: &RetraceConfig,
    source: &dyn BarSource,
) -> Result<RetraceReport, RunError> {
    config.validate()?;

    let range = config.time_range();
    let fetched = source.fetch_batches(range.as_ref(), FETCH_BATCH_SIZE)?;

    let mut engine = RetraceEngine::new(SessionClock::new(config.session.clone()));
    for batch in &fetched.batches {
        engine.push_batch(batch);
    }
    let dataset_hash = compute_dataset_hash(&fetched.batches);
    let output = engine.finish()?;

    let mut warnings = output.data_quality_warnings.clone();
    if fetched.malformed_dropped > 0 {
        warnings.push(format!(
            "{} unparseable row(s) dropped by the {} source",
            fetched.malformed_dropped,
            source.name()
        ));
    }

    let histogram = match config.run.mode {
        RunMode::Histogram => Some(output.build_histogram(&config.histogram)),
        RunMode::Max => None,
    };

    let analyzed = output.days.len();
    let pct = |n: usize| {
        if analyzed == 0 {
            0.0
        } else {
            n as f64 / analyzed as f64 * 100.0
        }
    };

    Ok(RetraceReport {
        schema_version: SCHEMA_VERSION,
        mode: config.run.mode,
        source: source.name().to_string(),
        session: config.session.clone(),
        max_inside_retracement: output.max_inside_retracement(),
        max_outside_retracement: output.max_outside_retracement(),
        histogram,
        total_days: analyzed,
        days_without_dr_data: output.days_without_dr_data,
        days_without_post_dr_data: output.days_without_post_dr_data,
        pct_days_returned_to_high: pct(output.days_returned_to_high),
        pct_days_returned_to_low: pct(output.days_returned_to_low),
        malformed_bars_dropped: output.malformed_bars_dropped + fetched.malformed_dropped,
        data_quality_warnings: warnings,
        days: output.days,
        dataset_hash,
    })
}

/// Save a report as pretty-printed JSON; returns the file path.
pub fn save_report(report: &RetraceReport, output_dir: &Path) -> Result<PathBuf, RunError> {
    std::fs::create_dir_all(output_dir).map_err(|e| RunError::Export(e.to_string()))?;
    let path = output_dir.join("retrace_report.json");
    let json =
        serde_json::to_string_pretty(report).map_err(|e| RunError::Export(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| RunError::Export(e.to_string()))?;
    Ok(path)
}

/// Deterministic BLAKE3 hash over the fetched bars, in delivery order.
fn compute_dataset_hash(batches: &[Vec<Bar>]) -> String {
    let mut hasher = blake3::Hasher::new();
    for batch in batches {
        for bar in batch {
            hasher.update(&bar.timestamp.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SyntheticBarSource;
    use chrono::NaiveDate;

    fn synthetic_config(mode: &str) -> RetraceConfig {
        RetraceConfig::from_toml(&format!(
            r#"
            [run]
            mode = "{mode}"
            start = "2019-06-03"
            end = "2019-06-14"

            [source]
            kind = "synthetic"
            symbol = "MES"
            "#
        ))
        .unwrap()
    }

    fn synthetic_source() -> SyntheticBarSource {
        SyntheticBarSource::new(
            "MES",
            NaiveDate::from_ymd_opt(2019, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2019, 6, 14).unwrap(),
        )
    }

    #[test]
    fn max_mode_produces_per_day_summaries() {
        let report = run_retrace(&synthetic_config("max"), &synthetic_source()).unwrap();

        // Ten weekdays in 2019-06-03..=2019-06-14.
        assert_eq!(report.total_days, 10);
        assert_eq!(report.days.len(), 10);
        assert!(report.histogram.is_none());
        assert!(report.max_inside_retracement >= 0.0);
        assert!(report.max_outside_retracement >= 0.0);
        for day in &report.days {
            assert!(day.dr_high >= day.dr_low);
        }
        assert!(report.pct_days_returned_to_high <= 100.0);
        assert!(report.pct_days_returned_to_low <= 100.0);
    }

    #[test]
    fn histogram_mode_attaches_a_histogram() {
        let report = run_retrace(&synthetic_config("histogram"), &synthetic_source()).unwrap();
        let hist = report.histogram.expect("histogram mode sets histogram");
        assert_eq!(hist.bin_edges.len(), hist.counts.len() + 1);
    }

    #[test]
    fn identical_runs_produce_identical_reports() {
        let config = synthetic_config("histogram");
        let a = run_retrace(&config, &synthetic_source()).unwrap();
        let b = run_retrace(&config, &synthetic_source()).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn date_bounds_restrict_the_run() {
        let config = RetraceConfig::from_toml(
            r#"
            [run]
            mode = "max"
            start = "2019-06-03"
            end = "2019-06-04"

            [source]
            kind = "synthetic"
            symbol = "MES"
            "#,
        )
        .unwrap();
        let report = run_retrace(&config, &synthetic_source()).unwrap();
        assert_eq!(report.total_days, 2);
    }

    #[test]
    fn empty_source_surfaces_no_data_error() {
        // A weekend-only range yields zero synthetic bars.
        let source = SyntheticBarSource::new(
            "MES",
            NaiveDate::from_ymd_opt(2019, 6, 8).unwrap(),
            NaiveDate::from_ymd_opt(2019, 6, 9).unwrap(),
        );
        let config = RetraceConfig::from_toml(
            r#"
            [run]
            mode = "max"

            [source]
            kind = "synthetic"
            symbol = "MES"
            "#,
        )
        .unwrap();
        let err = run_retrace(&config, &source).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::DrWindowEmpty)));
    }

    #[test]
    fn save_report_writes_json() {
        let report = run_retrace(&synthetic_config("max"), &synthetic_source()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = save_report(&report, dir.path()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: RetraceReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.total_days, report.total_days);
        assert_eq!(parsed.dataset_hash, report.dataset_hash);
    }
}
