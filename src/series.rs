//! # Metric Series
//!
//! A [`MetricSeries`] is the ordered `(bin, value)` output of every per-bin
//! aggregation. Bins appear only where source data exists; nothing is
//! interpolated.
//!
//! Where source data existed but the metric is undefined for a bin (a zero
//! denominator), the bin is left out of `points` and listed in `undefined`
//! instead, so consumers see the gap explicitly rather than a `NaN` or a
//! misleading zero.

use crate::bucket::{BinIndex, TimeBucketer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Names of the time series produced per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Fairness,
    CoefficientOfVariation,
    Stickiness,
    Arrivals,
    Drops,
    DropPercentage,
    Redirects,
    ActiveSessions,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::Fairness,
        MetricName::CoefficientOfVariation,
        MetricName::Stickiness,
        MetricName::Arrivals,
        MetricName::Drops,
        MetricName::DropPercentage,
        MetricName::Redirects,
        MetricName::ActiveSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Fairness => "fairness",
            MetricName::CoefficientOfVariation => "coefficient_of_variation",
            MetricName::Stickiness => "stickiness",
            MetricName::Arrivals => "arrivals",
            MetricName::Drops => "drops",
            MetricName::DropPercentage => "drop_percentage",
            MetricName::Redirects => "redirects",
            MetricName::ActiveSessions => "active_sessions",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One defined point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bin: f64,
    pub value: f64,
}

/// Ordered mapping from time bin to a scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub points: Vec<SeriesPoint>,
    /// Bins that had source data but no well-defined value, ascending.
    pub undefined: Vec<f64>,
}

impl MetricSeries {
    /// Build a series from per-bin results keyed by bin index.
    ///
    /// `None` values become undefined-bin markers. The map guarantees the
    /// emitted bins are ascending and unique.
    pub fn from_bins(bucketer: &TimeBucketer, bins: BTreeMap<BinIndex, Option<f64>>) -> Self {
        let mut series = MetricSeries::default();
        for (index, value) in bins {
            let bin = bucketer.start(index);
            match value {
                Some(value) => series.points.push(SeriesPoint { bin, value }),
                None => series.undefined.push(bin),
            }
        }
        series
    }

    /// Build a series of event counts keyed by bin index.
    pub fn from_counts(bucketer: &TimeBucketer, counts: &BTreeMap<BinIndex, u64>) -> Self {
        let points = counts
            .iter()
            .map(|(&index, &count)| SeriesPoint {
                bin: bucketer.start(index),
                value: count as f64,
            })
            .collect();
        MetricSeries {
            points,
            undefined: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at the bin starting at `bin`, if defined.
    pub fn get(&self, bin: f64) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.bin == bin)
            .map(|p| p.value)
    }

    pub fn bins(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.bin)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    /// Mean of the defined values; `None` for an empty series.
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.sum() / self.points.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bins_sorted_with_gaps() {
        let bucketer = TimeBucketer::new(2.0).unwrap();
        let mut bins = BTreeMap::new();
        bins.insert(3, Some(0.5));
        bins.insert(0, Some(1.0));
        bins.insert(1, None);

        let series = MetricSeries::from_bins(&bucketer, bins);
        assert_eq!(series.bins().collect::<Vec<_>>(), vec![0.0, 6.0]);
        assert_eq!(series.undefined, vec![2.0]);
        assert_eq!(series.get(6.0), Some(0.5));
        assert_eq!(series.get(2.0), None);
    }

    #[test]
    fn test_from_counts_and_mean() {
        let bucketer = TimeBucketer::new(1.0).unwrap();
        let counts: BTreeMap<BinIndex, u64> = [(0, 2), (1, 4)].into_iter().collect();
        let series = MetricSeries::from_counts(&bucketer, &counts);
        assert_eq!(series.sum(), 6.0);
        assert_eq!(series.mean(), Some(3.0));
        assert!(MetricSeries::default().mean().is_none());
    }

    #[test]
    fn test_metric_name_display() {
        assert_eq!(MetricName::DropPercentage.to_string(), "drop_percentage");
        assert_eq!(MetricName::ALL.len(), 8);
    }
}
