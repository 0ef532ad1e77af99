//! # Distribution Builder
//!
//! Turns a flat sample set (request latencies, one-way delays, connection
//! counts) into:
//!
//! - a **histogram** with a fixed number of equal-width bins spanning the
//!   observed range, so runs on different scales stay comparable bin for bin;
//! - an **empirical CDF** where the i-th smallest sample (0-indexed) gets
//!   `F = i / n`. The largest sample therefore sits at `(n − 1) / n`: the
//!   curve reports the fraction of samples strictly below each point;
//! - **percentile markers**, the first sample at which the ECDF reaches the
//!   requested level.
//!
//! Empty input yields an empty distribution. Non-finite samples are counted
//! and discarded.

use crate::fairness::RunningStats;
use serde::{Deserialize, Serialize};

/// One histogram bin, `[lower, upper)`; the last bin also includes `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
    /// `count / (n · width)`; `None` when the bin has zero width.
    pub density: Option<f64>,
}

/// One step of the empirical CDF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcdfPoint {
    pub value: f64,
    pub probability: f64,
}

/// Sample value at which the ECDF first reaches `percentile`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileMarker {
    pub percentile: f64,
    pub value: f64,
}

/// Empirical CDF over sorted samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ecdf {
    pub points: Vec<EcdfPoint>,
}

impl Ecdf {
    /// Build from samples in any order; non-finite values must already be
    /// filtered out.
    pub fn new(mut samples: Vec<f64>) -> Self {
        samples.sort_by(f64::total_cmp);
        let n = samples.len() as f64;
        let points = samples
            .into_iter()
            .enumerate()
            .map(|(i, value)| EcdfPoint {
                value,
                probability: i as f64 / n,
            })
            .collect();
        Ecdf { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First sample whose ECDF value is at least `percentile / 100`.
    ///
    /// Levels above `(n − 1) / n` are never reached by this ECDF and resolve
    /// to the largest sample.
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        let n = self.points.len();
        if n == 0 {
            return None;
        }
        let rank = (percentile * n as f64 / 100.0).ceil().max(0.0) as usize;
        Some(self.points[rank.min(n - 1)].value)
    }
}

/// Histogram, ECDF and summary statistics for one sample set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub discarded: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub histogram: Vec<HistogramBin>,
    pub ecdf: Ecdf,
    pub percentiles: Vec<PercentileMarker>,
}

impl DistributionSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Marker value for `percentile`, if it was requested.
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|m| (m.percentile - percentile).abs() < 1e-9)
            .map(|m| m.value)
    }
}

/// Partition `values` into `bins` equal-width bins over `[min, max]`.
///
/// Returns a single zero-width bin when every value is identical.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n = values.len() as f64;

    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len() as u64,
            density: None,
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &v in values {
        let index = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = min + i as f64 * width;
            let upper = if i + 1 == bins {
                max
            } else {
                min + (i + 1) as f64 * width
            };
            HistogramBin {
                lower,
                upper,
                count,
                density: Some(count as f64 / (n * width)),
            }
        })
        .collect()
}

/// Build the full distribution summary for a sample set.
pub fn build_distribution(
    values: &[f64],
    histogram_bins: usize,
    percentiles: &[f64],
) -> DistributionSummary {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let discarded = values.len() - finite.len();

    if finite.is_empty() {
        return DistributionSummary {
            discarded,
            ..Default::default()
        };
    }

    let stats: RunningStats = finite.iter().copied().collect();
    let hist = histogram(&finite, histogram_bins);
    let ecdf = Ecdf::new(finite);

    let markers = percentiles
        .iter()
        .filter_map(|&p| {
            ecdf.percentile(p).map(|value| PercentileMarker {
                percentile: p,
                value,
            })
        })
        .collect();

    DistributionSummary {
        count: ecdf.len(),
        discarded,
        min: ecdf.points.first().map(|p| p.value),
        max: ecdf.points.last().map(|p| p.value),
        mean: Some(stats.mean()),
        std_dev: Some(stats.std_dev()),
        histogram: hist,
        ecdf,
        percentiles: markers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_distribution() {
        let d = build_distribution(&[], 10, &[50.0, 95.0]);
        assert!(d.is_empty());
        assert!(d.histogram.is_empty());
        assert!(d.ecdf.is_empty());
        assert!(d.percentiles.is_empty());
        assert_eq!(d.mean, None);
    }

    #[test]
    fn test_ecdf_rank_semantics() {
        let ecdf = Ecdf::new(vec![3.0, 1.0, 4.0, 1.5]);
        let probs: Vec<f64> = ecdf.points.iter().map(|p| p.probability).collect();
        let values: Vec<f64> = ecdf.points.iter().map(|p| p.value).collect();

        assert_eq!(values, vec![1.0, 1.5, 3.0, 4.0]);
        assert_eq!(probs, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_ecdf_monotone_and_bounded() {
        let samples: Vec<f64> = (0..97).map(|i| ((i * 37) % 97) as f64 * 0.01).collect();
        let ecdf = Ecdf::new(samples);
        let n = ecdf.len() as f64;

        assert_eq!(ecdf.points[0].probability, 0.0);
        assert_eq!(ecdf.points.last().unwrap().probability, (n - 1.0) / n);
        for pair in ecdf.points.windows(2) {
            assert!(pair[0].probability <= pair[1].probability);
            assert!(pair[0].value <= pair[1].value);
        }
    }

    #[test]
    fn test_percentile_crossings() {
        let samples: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let d = build_distribution(&samples, 10, &[50.0, 95.0]);

        // F(x_i) = i/100 reaches 0.50 at the 51st value, 0.95 at the 96th
        assert_eq!(d.percentile(50.0), Some(51.0));
        assert_eq!(d.percentile(95.0), Some(96.0));
        assert_eq!(d.percentile(99.0), Some(100.0));
        assert_eq!(d.percentile(75.0), None);
    }

    #[test]
    fn test_percentile_whole_levels_exact() {
        let ecdf = Ecdf::new((1..=100).map(|i| i as f64).collect());
        assert_eq!(ecdf.percentile(7.0), Some(8.0));

        // 0.07 * 100 is not exactly 7 in binary; every whole level must still
        // land on the sample whose F equals p/100
        for p in 1..100 {
            assert_eq!(ecdf.percentile(p as f64), Some(p as f64 + 1.0), "p{}", p);
        }
    }

    #[test]
    fn test_percentile_single_sample() {
        let ecdf = Ecdf::new(vec![0.42]);
        assert_eq!(ecdf.percentile(50.0), Some(0.42));
        assert_eq!(ecdf.percentile(95.0), Some(0.42));
    }

    #[test]
    fn test_histogram_fixed_bin_count() {
        let values: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let hist = histogram(&values, 5);

        assert_eq!(hist.len(), 5);
        assert_eq!(hist[0].lower, 0.0);
        assert_eq!(hist[4].upper, 10.0);
        assert_eq!(hist.iter().map(|b| b.count).sum::<u64>(), 11);
        // max lands in the last bin
        assert_eq!(hist[4].count, 3);

        let area: f64 = hist
            .iter()
            .map(|b| b.density.unwrap() * (b.upper - b.lower))
            .sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_scale_independent() {
        let small: Vec<f64> = (0..50).map(|i| i as f64 * 0.125).collect();
        let large: Vec<f64> = (0..50).map(|i| i as f64 * 1024.0).collect();
        let a: Vec<u64> = histogram(&small, 7).iter().map(|b| b.count).collect();
        let b: Vec<u64> = histogram(&large, 7).iter().map(|b| b.count).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = histogram(&[2.0, 2.0, 2.0], 10);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].count, 3);
        assert_eq!(hist[0].density, None);
    }

    #[test]
    fn test_non_finite_discarded() {
        let d = build_distribution(&[1.0, f64::NAN, 2.0, f64::INFINITY], 4, &[50.0]);
        assert_eq!(d.count, 2);
        assert_eq!(d.discarded, 2);
        assert_eq!(d.min, Some(1.0));
        assert_eq!(d.max, Some(2.0));
        assert_eq!(d.mean, Some(1.5));
    }
}
