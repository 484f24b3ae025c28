//! Retrace CLI — defining-range retracement statistics.
//!
//! Commands:
//! - `run` — execute an analysis from a TOML config file or inline flags
//!   and save the report as JSON

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use retrace_core::histogram::HistogramSpec;
use retrace_core::session::SessionConfig;
use retrace_core::source::BarSource;
use retrace_runner::{
    run_retrace, save_report, CsvBarSource, RetraceConfig, RetraceReport, RunMode, RunSection,
    SourceSection, SyntheticBarSource,
};

#[derive(Parser)]
#[command(
    name = "retrace",
    about = "Intraday defining-range retracement statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis from a TOML config file or inline flags.
    Run {
        /// Path to a TOML config file (mutually exclusive with --csv/--synthetic).
        #[arg(long)]
        config: Option<PathBuf>,

        /// OHLCV CSV file to analyze.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Use deterministic synthetic bars instead of a file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Symbol seeding the synthetic source.
        #[arg(long, default_value = "MES")]
        symbol: String,

        /// Aggregation mode: max or histogram.
        #[arg(long, default_value = "max")]
        mode: String,

        /// Start date (YYYY-MM-DD, UTC).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, UTC).
        #[arg(long)]
        end: Option<String>,

        /// Output directory for the report JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            csv,
            synthetic,
            symbol,
            mode,
            start,
            end,
            output_dir,
        } => run_cmd(config, csv, synthetic, symbol, mode, start, end, output_dir),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    config_path: Option<PathBuf>,
    csv: Option<PathBuf>,
    synthetic: bool,
    symbol: String,
    mode: String,
    start: Option<String>,
    end: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    if config_path.is_some() && (csv.is_some() || synthetic) {
        bail!("--config and --csv/--synthetic are mutually exclusive");
    }
    if config_path.is_none() && csv.is_none() && !synthetic {
        bail!("one of --config, --csv, or --synthetic is required");
    }
    if csv.is_some() && synthetic {
        bail!("--csv and --synthetic are mutually exclusive");
    }

    let config = if let Some(path) = config_path {
        RetraceConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?
    } else {
        build_config_from_flags(&csv, synthetic, &symbol, &mode, start.as_deref(), end.as_deref())?
    };

    let report = match &config.source {
        SourceSection::Csv { path } => {
            let source = CsvBarSource::new(path.clone());
            run_and_report(&config, &source)?
        }
        SourceSection::Synthetic { symbol } => {
            let (start, end) = synthetic_date_bounds(&config)?;
            let source = SyntheticBarSource::new(symbol.clone(), start, end);
            run_and_report(&config, &source)?
        }
    };

    print_summary(&report);

    let path = save_report(&report, &output_dir)?;
    println!("Report saved to: {}", path.display());

    Ok(())
}

fn run_and_report(config: &RetraceConfig, source: &dyn BarSource) -> Result<RetraceReport> {
    run_retrace(config, source).context("analysis failed")
}

/// Build a config equivalent to a TOML file from inline flags. Constructed
/// directly (never by formatting a TOML document, which would choke on
/// paths containing quotes or backslashes) and validated the same way a
/// loaded file is.
fn build_config_from_flags(
    csv: &Option<PathBuf>,
    synthetic: bool,
    symbol: &str,
    mode: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<RetraceConfig> {
    let mode = match mode {
        "max" => RunMode::Max,
        "histogram" => RunMode::Histogram,
        other => bail!("unknown mode '{other}'. Valid: max, histogram"),
    };

    let source = match csv {
        Some(path) => SourceSection::Csv { path: path.clone() },
        None => {
            debug_assert!(synthetic);
            SourceSection::Synthetic {
                symbol: symbol.to_string(),
            }
        }
    };

    let config = RetraceConfig {
        run: RunSection {
            mode,
            start: parse_date("start", start)?,
            end: parse_date("end", end)?,
        },
        source,
        session: SessionConfig::default(),
        histogram: HistogramSpec::default(),
    };
    config.validate()?;
    Ok(config)
}

fn parse_date(flag: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --{flag} date '{s}' (expected YYYY-MM-DD)"))
    })
    .transpose()
}

/// The synthetic source needs concrete date bounds; default to the last
/// 30 days when the config leaves them open.
fn synthetic_date_bounds(config: &RetraceConfig) -> Result<(NaiveDate, NaiveDate)> {
    let today = chrono::Utc::now().date_naive();
    let start = config.run.start.unwrap_or(today - chrono::Duration::days(30));
    let end = config.run.end.unwrap_or(today);
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_flags_accept_awkward_csv_paths() {
        // Quotes and backslashes in the path must survive config building.
        let path = PathBuf::from(r#"data/we"ird\bars.csv"#);
        let config = build_config_from_flags(
            &Some(path.clone()),
            false,
            "MES",
            "max",
            Some("2019-06-03"),
            Some("2019-06-14"),
        )
        .unwrap();
        assert!(matches!(config.source, SourceSection::Csv { path: p } if p == path));
        assert!(config.run.start.is_some());
    }

    #[test]
    fn inline_flags_reject_unknown_mode() {
        let err = build_config_from_flags(&None, true, "MES", "median", None, None).unwrap_err();
        assert!(err.to_string().contains("unknown mode"));
    }
}

fn print_summary(report: &RetraceReport) {
    println!();
    println!("=== Retracement Report ===");
    println!("Source:           {}", report.source);
    println!("Mode:             {:?}", report.mode);
    println!(
        "Session:          DR {}–{}, post-DR until {}",
        report.session.dr_open, report.session.dr_close, report.session.post_close
    );
    println!("Days analyzed:    {}", report.total_days);
    if report.days_without_dr_data > 0 {
        println!("Days without DR:  {}", report.days_without_dr_data);
    }
    println!();
    println!("--- Retracements ---");
    println!(
        "Max inside:       {:.4}%",
        report.max_inside_retracement
    );
    println!(
        "Max outside:      {:.4}%",
        report.max_outside_retracement
    );
    println!(
        "Returned to high: {:.1}% of days",
        report.pct_days_returned_to_high
    );
    println!(
        "Returned to low:  {:.1}% of days",
        report.pct_days_returned_to_low
    );

    if let Some(hist) = &report.histogram {
        println!();
        println!("--- Distribution ({} binned) ---", hist.total());
        for (i, count) in hist.counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            println!(
                "[{:+.2}, {:+.2}): {}",
                hist.bin_edges[i],
                hist.bin_edges[i + 1],
                count
            );
        }
    }

    for warn in &report.data_quality_warnings {
        println!("WARNING: {warn}");
    }
    println!();
}
