//! Fixed-width histogram over signed retracement values.

use serde::{Deserialize, Serialize};

/// Binning parameters: fixed-width buckets over [min, max].
///
/// Defaults cover the canonical retracement range, −2.2% to +0.5% in 0.1%
/// steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramSpec {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_min() -> f64 {
    -2.2
}

fn default_max() -> f64 {
    0.5
}

fn default_step() -> f64 {
    0.1
}

impl Default for HistogramSpec {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            step: default_step(),
        }
    }
}

impl HistogramSpec {
    pub fn is_valid(&self) -> bool {
        self.step > 0.0 && self.min < self.max && self.min.is_finite() && self.max.is_finite()
    }

    /// Ordered bin edges, `bin_count + 1` of them.
    pub fn edges(&self) -> Vec<f64> {
        let bins = ((self.max - self.min) / self.step).round().max(1.0) as usize;
        (0..=bins).map(|i| self.min + i as f64 * self.step).collect()
    }
}

/// Binned distribution: `counts.len() == bin_edges.len() - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Empty histogram with the spec's edges. Panics on an invalid spec;
    /// configuration layers validate before constructing.
    pub fn new(spec: &HistogramSpec) -> Self {
        assert!(spec.is_valid(), "histogram spec must have step > 0 and min < max");
        let bin_edges = spec.edges();
        let counts = vec![0; bin_edges.len() - 1];
        Self { bin_edges, counts }
    }

    /// Record one value. Values outside [first edge, last edge] are silently
    /// excluded; returns whether the value was binned. A value equal to the
    /// last edge lands in the final bin.
    pub fn record(&mut self, value: f64) -> bool {
        let min = self.bin_edges[0];
        let max = self.bin_edges[self.bin_edges.len() - 1];
        if !value.is_finite() || value < min || value > max {
            return false;
        }
        let upper = self.bin_edges.partition_point(|e| *e <= value);
        let idx = if upper == self.bin_edges.len() {
            self.counts.len() - 1
        } else {
            upper - 1
        };
        self.counts[idx] += 1;
        true
    }

    /// Total binned observations.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
