//! # Time Bucketer
//!
//! Maps continuous timestamps onto fixed-width bins. Every per-bin
//! aggregation in the crate goes through [`TimeBucketer`], so series produced
//! by different components can be joined on the bin key without drift.
//!
//! Bins are keyed internally by their integer index `floor(t / w)` rather than
//! by the floating-point start time. The start time `index * w` is only
//! materialised when a series is emitted, which keeps map keys exact and
//! ordering total.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Integer bin index, `floor(t / w)`.
pub type BinIndex = i64;

/// Floor-division bucketer for a validated, positive bin width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBucketer {
    width: f64,
}

impl TimeBucketer {
    /// Create a bucketer, rejecting zero, negative, or non-finite widths.
    pub fn new(width: f64) -> Result<Self, ConfigError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(ConfigError::InvalidBinWidth(width));
        }
        Ok(Self { width })
    }

    /// Configured bin width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Index of the bin containing `t`.
    pub fn index(&self, t: f64) -> BinIndex {
        (t / self.width).floor() as BinIndex
    }

    /// Start time of the bin with the given index.
    pub fn start(&self, index: BinIndex) -> f64 {
        index as f64 * self.width
    }

    /// `floor(t / w) * w`, the start time of the bin containing `t`.
    pub fn bin(&self, t: f64) -> f64 {
        self.start(self.index(t))
    }
}

impl Default for TimeBucketer {
    fn default() -> Self {
        Self {
            width: crate::defaults::BIN_WIDTH,
        }
    }
}
