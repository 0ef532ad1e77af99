//! # Connection Views
//!
//! Snapshot-derived views that complement the utilization metrics:
//!
//! - **Active sessions**: the total number of live connections across the
//!   fleet at each snapshot instant, reduced per bin to the peak instant.
//! - **Connection heatmap**: the peak connection count per (server, bin).
//! - **Connection distributions**: the spread of each server's snapshot
//!   connection counts (the per-server box view).
//! - **One-way delay distributions**: the Distribution Builder applied to
//!   each server's snapshot delays.

use crate::bucket::{BinIndex, TimeBucketer};
use crate::distribution::{build_distribution, DistributionSummary};
use crate::model::{ServerId, Snapshot};
use crate::series::MetricSeries;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Peak fleet-wide connection total per bin.
pub fn active_sessions(snapshots: &[Snapshot], bucketer: &TimeBucketer) -> MetricSeries {
    // snapshot instants are shared across servers; key them exactly
    let mut per_instant: BTreeMap<u64, (f64, u64)> = BTreeMap::new();
    for snap in snapshots {
        let entry = per_instant
            .entry(snap.time.to_bits())
            .or_insert((snap.time, 0));
        entry.1 += snap.connections as u64;
    }

    let mut peaks: BTreeMap<BinIndex, u64> = BTreeMap::new();
    for (time, total) in per_instant.into_values() {
        let peak = peaks.entry(bucketer.index(time)).or_insert(0);
        *peak = (*peak).max(total);
    }
    MetricSeries::from_counts(bucketer, &peaks)
}

/// Dense server × bin grid of peak connection counts.
///
/// Rows follow `servers`, columns follow `bins`. Cells with no snapshot are
/// reported as 0 connections, so the grid is always rectangular.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionHeatmap {
    pub servers: Vec<ServerId>,
    pub bins: Vec<f64>,
    pub cells: Vec<Vec<u32>>,
}

impl ConnectionHeatmap {
    pub fn build(snapshots: &[Snapshot], bucketer: &TimeBucketer) -> Self {
        let mut peaks: BTreeMap<(ServerId, BinIndex), u32> = BTreeMap::new();
        let mut servers = BTreeSet::new();
        let mut bins = BTreeSet::new();

        for snap in snapshots {
            let index = bucketer.index(snap.time);
            servers.insert(snap.server_id);
            bins.insert(index);
            let cell = peaks.entry((snap.server_id, index)).or_insert(0);
            *cell = (*cell).max(snap.connections);
        }

        let cells = servers
            .iter()
            .map(|&server| {
                bins.iter()
                    .map(|&index| peaks.get(&(server, index)).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        ConnectionHeatmap {
            servers: servers.into_iter().collect(),
            bins: bins.into_iter().map(|i| bucketer.start(i)).collect(),
            cells,
        }
    }

    /// Peak connections for `server` in the bin starting at `bin`.
    pub fn get(&self, server: ServerId, bin: f64) -> Option<u32> {
        let row = self.servers.iter().position(|&s| s == server)?;
        let col = self.bins.iter().position(|&b| b == bin)?;
        Some(self.cells[row][col])
    }
}

/// Concurrent connection distribution for every server that reported
/// snapshots, one sample per snapshot.
pub fn connection_distributions(
    snapshots: &[Snapshot],
    histogram_bins: usize,
    percentiles: &[f64],
) -> BTreeMap<ServerId, DistributionSummary> {
    per_server(snapshots, histogram_bins, percentiles, |snap| {
        snap.connections as f64
    })
}

/// One-way delay distribution for every server that reported snapshots.
pub fn delay_distributions(
    snapshots: &[Snapshot],
    histogram_bins: usize,
    percentiles: &[f64],
) -> BTreeMap<ServerId, DistributionSummary> {
    per_server(snapshots, histogram_bins, percentiles, |snap| snap.one_way_delay)
}

fn per_server(
    snapshots: &[Snapshot],
    histogram_bins: usize,
    percentiles: &[f64],
    sample: impl Fn(&Snapshot) -> f64,
) -> BTreeMap<ServerId, DistributionSummary> {
    let mut values: BTreeMap<ServerId, Vec<f64>> = BTreeMap::new();
    for snap in snapshots {
        values.entry(snap.server_id).or_default().push(sample(snap));
    }
    values
        .into_iter()
        .map(|(server, values)| {
            (
                server,
                build_distribution(&values, histogram_bins, percentiles),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(time: f64, server_id: ServerId, connections: u32, owd: f64) -> Snapshot {
        Snapshot {
            time,
            server_id,
            connections,
            one_way_delay: owd,
        }
    }

    fn sample_snapshots() -> Vec<Snapshot> {
        vec![
            snap(0.0, 1, 2, 10.0),
            snap(0.0, 2, 3, 12.0),
            snap(0.5, 1, 4, 11.0),
            snap(0.5, 2, 4, 15.0),
            snap(2.0, 1, 1, 10.5),
        ]
    }

    #[test]
    fn test_active_sessions_peak_per_bin() {
        let bucketer = TimeBucketer::new(1.0).unwrap();
        let series = active_sessions(&sample_snapshots(), &bucketer);
        assert_eq!(series.bins().collect::<Vec<_>>(), vec![0.0, 2.0]);
        assert_eq!(series.get(0.0), Some(8.0));
        assert_eq!(series.get(2.0), Some(1.0));
    }

    #[test]
    fn test_heatmap_dense_grid() {
        let bucketer = TimeBucketer::new(1.0).unwrap();
        let heat = ConnectionHeatmap::build(&sample_snapshots(), &bucketer);

        assert_eq!(heat.servers, vec![1, 2]);
        assert_eq!(heat.bins, vec![0.0, 2.0]);
        assert_eq!(heat.cells, vec![vec![4, 1], vec![4, 0]]);
        assert_eq!(heat.get(2, 2.0), Some(0));
        assert_eq!(heat.get(3, 0.0), None);
    }

    #[test]
    fn test_delay_distributions_per_server() {
        let dists = delay_distributions(&sample_snapshots(), 4, &[50.0]);
        assert_eq!(dists.len(), 2);
        assert_eq!(dists[&1].count, 3);
        assert_eq!(dists[&2].min, Some(12.0));
        assert_eq!(dists[&2].max, Some(15.0));
    }

    #[test]
    fn test_connection_distributions_per_server() {
        let dists = connection_distributions(&sample_snapshots(), 4, &[50.0]);
        assert_eq!(dists.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        // server 1 reported 2, 4, 1 connections; F reaches 0.5 only at 4
        assert_eq!(dists[&1].count, 3);
        assert_eq!(dists[&1].min, Some(1.0));
        assert_eq!(dists[&1].max, Some(4.0));
        assert_eq!(dists[&1].percentile(50.0), Some(4.0));

        assert_eq!(dists[&2].count, 2);
        assert_eq!(dists[&2].min, Some(3.0));
        assert_eq!(dists[&2].max, Some(4.0));
    }
}
