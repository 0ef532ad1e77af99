//! # Fairness and Variability Aggregator
//!
//! Groups utilization samples by time bin (across all servers) and emits two
//! independent per-bin metrics:
//!
//! - **Jain fairness index** `J = (Σu)² / (n · Σu²)`, in (0, 1] whenever the
//!   bin has a non-zero sample.
//! - **Coefficient of variation** `CV = σ / μ` with the population standard
//!   deviation (divisor `n`).
//!
//! ## Numerical Approach
//!
//! Each bin is folded through a Welford accumulator, so the sums are never
//! formed directly. Writing `Σu = nμ` and `Σu² = n(μ² + σ²)` gives
//!
//! ```text
//! J = μ² / (μ² + σ²)        CV = σ / μ
//! ```
//!
//! which avoids the cancellation of `Σu² − (Σu)²/n` on large bins and makes
//! the equal-samples case exact (`σ² = 0` ⇒ `J = 1`, `CV = 0`).
//!
//! Bins whose samples are all zero have no defined value for either metric
//! and are reported as undefined bins, not as 0.

use crate::bucket::{BinIndex, TimeBucketer};
use crate::series::MetricSeries;
use crate::utilization::UtilizationSample;
use std::collections::BTreeMap;
use tracing::debug;

/// Single-pass mean/variance accumulator (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance (divisor `n`); 0 for an empty accumulator.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            // m2 can dip a hair below zero through rounding
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Jain fairness index, `None` when every sample was zero.
    pub fn jain_index(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let mean_sq = self.mean * self.mean;
        let second_moment = mean_sq + self.variance();
        if second_moment == 0.0 {
            None
        } else {
            Some(mean_sq / second_moment)
        }
    }

    /// Coefficient of variation, `None` when the mean is exactly zero.
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        if self.count == 0 || self.mean == 0.0 {
            None
        } else {
            Some(self.std_dev() / self.mean)
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for value in iter {
            stats.add(value);
        }
        stats
    }
}

/// Jain fairness index of a sample set.
pub fn jain_index(values: &[f64]) -> Option<f64> {
    values.iter().copied().collect::<RunningStats>().jain_index()
}

/// Population coefficient of variation of a sample set.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .collect::<RunningStats>()
        .coefficient_of_variation()
}

/// Per-bin fairness and CV series for one run.
#[derive(Debug, Clone, Default)]
pub struct FairnessSeries {
    pub fairness: MetricSeries,
    pub cv: MetricSeries,
}

/// Aggregate utilization samples into per-bin fairness and CV series,
/// binned on the snapshot time.
pub fn aggregate_fairness(samples: &[UtilizationSample], bucketer: &TimeBucketer) -> FairnessSeries {
    let mut bins: BTreeMap<BinIndex, RunningStats> = BTreeMap::new();
    for sample in samples {
        bins.entry(bucketer.index(sample.time))
            .or_default()
            .add(sample.utilization);
    }

    let fairness = bins
        .iter()
        .map(|(&index, stats)| (index, stats.jain_index()))
        .collect();
    let cv = bins
        .iter()
        .map(|(&index, stats)| (index, stats.coefficient_of_variation()))
        .collect();

    debug!("Aggregated fairness over {} bins", bins.len());

    FairnessSeries {
        fairness: MetricSeries::from_bins(bucketer, fairness),
        cv: MetricSeries::from_bins(bucketer, cv),
    }
}
