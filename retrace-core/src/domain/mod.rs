//! Domain types for the retracement engine.

pub mod bar;

pub use bar::{Bar, TimeRange};
