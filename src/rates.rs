//! # Rate Analyzer
//!
//! Uniform treatment of the three event streams (arrivals, drops, redirects):
//!
//! - **Per-bin counts** for each stream. An empty stream yields an empty
//!   series, not an error.
//! - **Drop percentage** `100 · drops(bin) / arrivals(bin)` over the arrival
//!   bins. Bins with drops but no arrivals, or with more drops than
//!   arrivals, are data-consistency anomalies: they are marked undefined and
//!   recorded as diagnostics.
//! - **Per-server totals** for drops and redirects, covering the whole fleet
//!   so servers with no events still report 0.
//!
//! Drops and redirects are optional sources. They arrive as `Option<&[_]>`;
//! `None` means the source was absent and the dependent outputs are simply
//! not produced.

use crate::bucket::{BinIndex, TimeBucketer};
use crate::model::{ArrivalEvent, Diagnostic, DropEvent, RedirectEvent, ServerId};
use crate::series::MetricSeries;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Count events per bin index.
pub fn count_per_bin<I>(times: I, bucketer: &TimeBucketer) -> BTreeMap<BinIndex, u64>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = BTreeMap::new();
    for t in times {
        *counts.entry(bucketer.index(t)).or_insert(0) += 1;
    }
    counts
}

/// Drop percentage per arrival bin, plus the anomalies found on the way.
pub fn drop_percentage(
    arrivals: &BTreeMap<BinIndex, u64>,
    drops: &BTreeMap<BinIndex, u64>,
    bucketer: &TimeBucketer,
) -> (MetricSeries, Vec<Diagnostic>) {
    let bins: BTreeSet<BinIndex> = arrivals.keys().chain(drops.keys()).copied().collect();

    let mut values: BTreeMap<BinIndex, Option<f64>> = BTreeMap::new();
    let mut anomalies = Vec::new();

    for index in bins {
        let arrived = arrivals.get(&index).copied().unwrap_or(0);
        let dropped = drops.get(&index).copied().unwrap_or(0);
        if arrived == 0 || dropped > arrived {
            anomalies.push(Diagnostic::DropArrivalMismatch {
                bin: bucketer.start(index),
                arrivals: arrived,
                drops: dropped,
            });
            values.insert(index, None);
        } else {
            values.insert(index, Some(100.0 * dropped as f64 / arrived as f64));
        }
    }

    (MetricSeries::from_bins(bucketer, values), anomalies)
}

/// Event totals per server for one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTotals {
    pub per_server: BTreeMap<ServerId, u64>,
    /// Events that named no server.
    pub unattributed: u64,
}

impl ServerTotals {
    /// Tally events by server, seeding every fleet server with 0.
    ///
    /// Servers that appear in events but not in the fleet are still counted.
    pub fn tally<I>(server_ids: I, fleet: &[ServerId]) -> Self
    where
        I: IntoIterator<Item = Option<ServerId>>,
    {
        let mut totals = ServerTotals {
            per_server: fleet.iter().map(|&id| (id, 0)).collect(),
            unattributed: 0,
        };
        for id in server_ids {
            match id {
                Some(id) => *totals.per_server.entry(id).or_insert(0) += 1,
                None => totals.unattributed += 1,
            }
        }
        totals
    }

    pub fn total(&self) -> u64 {
        self.per_server.values().sum::<u64>() + self.unattributed
    }
}

/// Everything the rate analyzer produces for one run.
#[derive(Debug, Clone, Default)]
pub struct RateAnalysis {
    pub arrivals: MetricSeries,
    pub total_arrivals: u64,
    pub drops: Option<MetricSeries>,
    pub drop_percentage: Option<MetricSeries>,
    pub drops_per_server: Option<ServerTotals>,
    pub redirects: Option<MetricSeries>,
    /// Redirects tallied by destination server.
    pub redirects_per_server: Option<ServerTotals>,
    /// Redirects tallied by the server the session left.
    pub redirects_away_per_server: Option<ServerTotals>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RateAnalysis {
    pub fn total_drops(&self) -> Option<u64> {
        self.drops_per_server.as_ref().map(ServerTotals::total)
    }

    pub fn total_redirects(&self) -> Option<u64> {
        self.redirects_per_server.as_ref().map(ServerTotals::total)
    }
}

/// Run the rate analysis over one run's event streams.
pub fn analyze_rates(
    arrivals: &[ArrivalEvent],
    drops: Option<&[DropEvent]>,
    redirects: Option<&[RedirectEvent]>,
    fleet: &[ServerId],
    bucketer: &TimeBucketer,
) -> RateAnalysis {
    let arrival_counts = count_per_bin(arrivals.iter().map(|a| a.time), bucketer);
    let mut analysis = RateAnalysis {
        arrivals: MetricSeries::from_counts(bucketer, &arrival_counts),
        total_arrivals: arrivals.len() as u64,
        ..Default::default()
    };

    if let Some(drops) = drops {
        let drop_counts = count_per_bin(drops.iter().map(|d| d.time), bucketer);
        let (pct, anomalies) = drop_percentage(&arrival_counts, &drop_counts, bucketer);
        for anomaly in &anomalies {
            warn!("{}", anomaly);
        }
        analysis.diagnostics.extend(anomalies);
        analysis.drops = Some(MetricSeries::from_counts(bucketer, &drop_counts));
        analysis.drop_percentage = Some(pct);
        analysis.drops_per_server = Some(ServerTotals::tally(
            drops.iter().map(|d| Some(d.server_id)),
            fleet,
        ));
        debug!("Counted {} drops over {} bins", drops.len(), drop_counts.len());
    }

    if let Some(redirects) = redirects {
        let redirect_counts = count_per_bin(redirects.iter().map(|r| r.time), bucketer);
        let totals = ServerTotals::tally(redirects.iter().map(|r| r.server_id), fleet);
        if totals.unattributed > 0 {
            let diagnostic = Diagnostic::UnattributedRedirects {
                count: totals.unattributed as usize,
            };
            debug!("{}", diagnostic);
            analysis.diagnostics.push(diagnostic);
        }
        analysis.redirects = Some(MetricSeries::from_counts(bucketer, &redirect_counts));
        analysis.redirects_per_server = Some(totals);
        analysis.redirects_away_per_server = Some(ServerTotals::tally(
            redirects.iter().map(|r| r.from_server),
            fleet,
        ));
        debug!(
            "Counted {} redirects over {} bins",
            redirects.len(),
            redirect_counts.len()
        );
    }

    analysis
}
