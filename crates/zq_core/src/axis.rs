//! Uniform axis binning and per-bin mean statistics.
//!
//! Every calibration table and bootstrap accumulator in this crate is built
//! from these two pieces: an [`AxisSpec`] mapping a coordinate to a bin
//! index, and a [`BinStats`] accumulating a running mean per bin.

use serde::{Deserialize, Serialize};

/// A uniformly binned axis over `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub bins: usize,
    pub lo: f64,
    pub hi: f64,
}

impl AxisSpec {
    pub fn new(bins: usize, lo: f64, hi: f64) -> Self {
        debug_assert!(bins > 0 && hi > lo);
        Self { bins, lo, hi }
    }

    /// Bin index containing `value`. Out-of-range values clamp to the edge
    /// bins so lookups near the axis boundary stay defined.
    pub fn find_bin(&self, value: f64) -> usize {
        if value <= self.lo {
            return 0;
        }
        if value >= self.hi {
            return self.bins - 1;
        }
        let frac = (value - self.lo) / (self.hi - self.lo);
        ((frac * self.bins as f64) as usize).min(self.bins - 1)
    }

    /// Center of bin `bin`.
    pub fn bin_center(&self, bin: usize) -> f64 {
        let width = (self.hi - self.lo) / self.bins as f64;
        self.lo + (bin as f64 + 0.5) * width
    }
}

/// Running mean for one bin of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinStats {
    pub sum: f64,
    pub entries: u64,
}

impl BinStats {
    pub fn fill(&mut self, value: f64) {
        self.sum += value;
        self.entries += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.entries == 0 {
            0.0
        } else {
            self.sum / self.entries as f64
        }
    }

    pub fn merge(&mut self, other: &BinStats) {
        self.sum += other.sum;
        self.entries += other.entries;
    }
}
