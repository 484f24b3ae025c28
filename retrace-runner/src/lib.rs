//! Retrace Runner — configuration, bar sources, and run orchestration.
//!
//! Wires a `BarSource` into the core engine and turns the engine output
//! into a serializable report:
//! - `config`: TOML run configuration with validation
//! - `sources`: CSV file source and deterministic synthetic source
//! - `runner`: source → engine → `RetraceReport`, plus JSON export

pub mod config;
pub mod runner;
pub mod sources;

pub use config::{ConfigError, RetraceConfig, RunMode, RunSection, SourceSection};
pub use runner::{run_retrace, save_report, RetraceReport, RunError, SCHEMA_VERSION};
pub use sources::{CsvBarSource, SyntheticBarSource};
