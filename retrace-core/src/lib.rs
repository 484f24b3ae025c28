//! Retrace Core — defining-range retracement engine for intraday futures bars.
//!
//! This crate contains the heart of the analysis:
//! - Domain types (bars, time ranges)
//! - Session-window classification with fixed UTC boundaries
//! - Defining-range reduction (running high/low across batches)
//! - Inside-range and breakout/outside retracement detectors
//! - Fixed-width histogram binning
//! - The engine: a sequential, batch-tolerant reduction over one bar stream
//! - The `BarSource` trait that data sources implement

pub mod domain;
pub mod engine;
pub mod histogram;
pub mod range;
pub mod retrace;
pub mod session;
pub mod source;
