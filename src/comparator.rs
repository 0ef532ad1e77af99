//! # Run Comparator
//!
//! Drives every analysis component over a set of independently loaded runs
//! and assembles the [`Comparison`] handed to presentation.
//!
//! ## Per-run pipeline
//!
//! For each run the comparator consults [`RunTables::capabilities`] once and
//! then invokes, in order:
//!
//! 1. the Utilization Sampler and Fairness/Variability Aggregator
//! 2. the Stickiness Classifier
//! 3. the Rate Analyzer (drops and redirects gated on the capability flags)
//! 4. the Distribution Builder for request latency
//! 5. the connection views and per-server latency profiles
//!
//! Each run keeps its own bin grid. Nothing is interpolated or aligned across
//! runs; overlaying series on a shared time axis is left to presentation.
//!
//! ## Failure isolation
//!
//! A run whose tables fail to load, or whose analysis fails, is recorded as a
//! [`RunFailure`] and excluded. The remaining runs are still analysed.
//!
//! ## Parallelism
//!
//! Runs share no mutable state. They are loaded and analysed on a `rayon`
//! pool sized by [`AnalysisConfig::jobs`], and merged in label order once
//! every worker has finished.

use crate::bucket::TimeBucketer;
use crate::cli::AnalysisConfig;
use crate::connections::{
    active_sessions, connection_distributions, delay_distributions, ConnectionHeatmap,
};
use crate::distribution::{build_distribution, DistributionSummary};
use crate::error::LoadError;
use crate::fairness::aggregate_fairness;
use crate::latency::{server_latency_profiles, LatencyProfile};
use crate::model::{Capabilities, Diagnostic, RunTables, ServerId};
use crate::rates::{analyze_rates, ServerTotals};
use crate::series::{MetricName, MetricSeries};
use crate::stickiness::stickiness_series;
use crate::utilization::sample_utilization;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Picked / served / dropped counters for one server.
///
/// `picked` is only known when the run carries a summary table. Without one,
/// `served` is counted from the request table and `dropped` from the drop
/// table (or unknown if that is absent too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerOutcome {
    pub server_id: ServerId,
    pub picked: Option<u64>,
    pub served: u64,
    pub dropped: Option<u64>,
}

/// Scalar roll-ups of one run used by the cross-run overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub arrivals: u64,
    pub requests: u64,
    pub drops: Option<u64>,
    pub redirects: Option<u64>,
    pub mean_fairness: Option<f64>,
    pub mean_cv: Option<f64>,
    pub latency_p50: Option<f64>,
    pub latency_p95: Option<f64>,
}

/// Everything computed for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub label: String,
    pub path: PathBuf,
    pub capabilities: Capabilities,
    pub series: BTreeMap<MetricName, MetricSeries>,
    /// Request duration distribution, in seconds.
    pub latency: DistributionSummary,
    pub latency_profiles: BTreeMap<ServerId, LatencyProfile>,
    /// One-way delay distribution per server, in milliseconds.
    pub delay_distributions: BTreeMap<ServerId, DistributionSummary>,
    /// Concurrent connections per server, one sample per snapshot.
    pub connection_distributions: BTreeMap<ServerId, DistributionSummary>,
    pub heatmap: ConnectionHeatmap,
    pub drops_per_server: Option<ServerTotals>,
    pub redirects_per_server: Option<ServerTotals>,
    pub redirects_away_per_server: Option<ServerTotals>,
    pub outcomes: Vec<ServerOutcome>,
    pub totals: RunTotals,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    pub fn series(&self, metric: MetricName) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }
}

/// A run excluded from the comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub label: String,
    pub path: PathBuf,
    pub error: String,
}

/// Cross-run highlights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    pub analysed: usize,
    pub failed: usize,
    /// Run with the highest mean Jain index.
    pub best_fairness: Option<String>,
    /// Run with the fewest drops among runs that record drops.
    pub fewest_drops: Option<String>,
}

/// The comparison handed to presentation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Comparison {
    pub bin_width: f64,
    pub runs: BTreeMap<String, RunResult>,
    pub failures: Vec<RunFailure>,
    pub overview: Overview,
}

/// Analyse one loaded run.
///
/// The only fallible step is histogram allocation for latency profiles; all
/// data anomalies end up in `diagnostics` instead.
pub fn analyze_run(
    label: &str,
    path: &Path,
    tables: &RunTables,
    config: &AnalysisConfig,
) -> Result<RunResult> {
    let bucketer: &TimeBucketer = &config.bucketer;
    let capabilities = tables.capabilities();
    let fleet = tables.fleet();
    let mut diagnostics = Vec::new();
    let mut series = BTreeMap::new();

    debug!(
        "Run '{}': {} arrivals, {} snapshots, {} requests, {} servers, {:?}",
        label,
        tables.arrivals.len(),
        tables.snapshots.len(),
        tables.requests.len(),
        tables.servers.len(),
        capabilities
    );

    let utilization = sample_utilization(&tables.snapshots, &tables.servers);
    diagnostics.extend(utilization.omissions);
    let fairness = aggregate_fairness(&utilization.samples, bucketer);
    series.insert(MetricName::Fairness, fairness.fairness);
    series.insert(MetricName::CoefficientOfVariation, fairness.cv);

    series.insert(
        MetricName::Stickiness,
        stickiness_series(&tables.requests, bucketer),
    );

    let drops = if capabilities.drops {
        tables.drops.as_deref()
    } else {
        None
    };
    let redirects = if capabilities.redirects {
        tables.redirects.as_deref()
    } else {
        None
    };
    let rates = analyze_rates(&tables.arrivals, drops, redirects, &fleet, bucketer);
    let total_drops = rates.total_drops();
    let total_redirects = rates.total_redirects();
    diagnostics.extend(rates.diagnostics);
    series.insert(MetricName::Arrivals, rates.arrivals);
    if let Some(drop_series) = rates.drops {
        series.insert(MetricName::Drops, drop_series);
    }
    if let Some(pct) = rates.drop_percentage {
        series.insert(MetricName::DropPercentage, pct);
    }
    if let Some(redirect_series) = rates.redirects {
        series.insert(MetricName::Redirects, redirect_series);
    }

    series.insert(
        MetricName::ActiveSessions,
        active_sessions(&tables.snapshots, bucketer),
    );

    let durations: Vec<f64> = tables.requests.iter().map(|r| r.duration).collect();
    let latency = build_distribution(&durations, config.histogram_bins, &config.percentiles);
    let latency_profiles = server_latency_profiles(&tables.requests)
        .with_context(|| format!("Failed to build latency profiles for run '{}'", label))?;

    let outcomes = server_outcomes(tables, &fleet, rates.drops_per_server.as_ref());

    let totals = RunTotals {
        arrivals: rates.total_arrivals,
        requests: tables.requests.len() as u64,
        drops: total_drops,
        redirects: total_redirects,
        mean_fairness: series.get(&MetricName::Fairness).and_then(MetricSeries::mean),
        mean_cv: series
            .get(&MetricName::CoefficientOfVariation)
            .and_then(MetricSeries::mean),
        latency_p50: latency.ecdf.percentile(50.0),
        latency_p95: latency.ecdf.percentile(95.0),
    };

    Ok(RunResult {
        label: label.to_string(),
        path: path.to_path_buf(),
        capabilities,
        series,
        latency,
        latency_profiles,
        delay_distributions: delay_distributions(
            &tables.snapshots,
            config.histogram_bins,
            &config.percentiles,
        ),
        connection_distributions: connection_distributions(
            &tables.snapshots,
            config.histogram_bins,
            &config.percentiles,
        ),
        heatmap: ConnectionHeatmap::build(&tables.snapshots, bucketer),
        drops_per_server: rates.drops_per_server,
        redirects_per_server: rates.redirects_per_server,
        redirects_away_per_server: rates.redirects_away_per_server,
        outcomes,
        totals,
        diagnostics,
    })
}

fn server_outcomes(
    tables: &RunTables,
    fleet: &[ServerId],
    drops: Option<&ServerTotals>,
) -> Vec<ServerOutcome> {
    if let Some(summary) = &tables.summary {
        let mut outcomes: Vec<ServerOutcome> = summary
            .iter()
            .map(|s| ServerOutcome {
                server_id: s.id,
                picked: Some(s.picked),
                served: s.served,
                dropped: Some(s.dropped),
            })
            .collect();
        outcomes.sort_by_key(|o| o.server_id);
        return outcomes;
    }

    let mut served: BTreeMap<ServerId, u64> = fleet.iter().map(|&id| (id, 0)).collect();
    for record in &tables.requests {
        *served.entry(record.server_id).or_insert(0) += 1;
    }
    let mut ids: BTreeSet<ServerId> = served.keys().copied().collect();
    if let Some(drops) = drops {
        ids.extend(drops.per_server.keys().copied());
    }

    ids.into_iter()
        .map(|id| ServerOutcome {
            server_id: id,
            picked: None,
            served: served.get(&id).copied().unwrap_or(0),
            dropped: drops.map(|d| d.per_server.get(&id).copied().unwrap_or(0)),
        })
        .collect()
}

fn overview(runs: &BTreeMap<String, RunResult>, failed: usize) -> Overview {
    // reduce keeps the earlier label on ties
    let best_fairness = runs
        .values()
        .filter_map(|r| r.totals.mean_fairness.map(|f| (&r.label, f)))
        .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
        .map(|(label, _)| label.clone());

    let fewest_drops = runs
        .values()
        .filter_map(|r| r.totals.drops.map(|d| (&r.label, d)))
        .min_by_key(|&(_, d)| d)
        .map(|(label, _)| label.clone());

    Overview {
        analysed: runs.len(),
        failed,
        best_fairness,
        fewest_drops,
    }
}

enum Outcome {
    Analysed(Box<RunResult>),
    Failed(RunFailure),
}

/// Load and analyse every configured run, isolating per-run failures.
///
/// `load` is the Data Loader: it turns a run directory into typed tables.
pub fn compare_runs<F>(config: &AnalysisConfig, load: F) -> Result<Comparison>
where
    F: Fn(&Path) -> std::result::Result<RunTables, LoadError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .context("Failed to build worker pool")?;

    info!(
        "Comparing {} runs on {} workers (bin width {})",
        config.runs.len(),
        config.jobs,
        config.bucketer.width()
    );

    let outcomes: Vec<Outcome> = pool.install(|| {
        config
            .runs
            .par_iter()
            .map(|run| {
                let fail = |error: String| {
                    error!("Run '{}' excluded: {}", run.label, error);
                    Outcome::Failed(RunFailure {
                        label: run.label.clone(),
                        path: run.path.clone(),
                        error,
                    })
                };

                let tables = match load(&run.path) {
                    Ok(tables) => tables,
                    Err(e) => return fail(e.to_string()),
                };
                match analyze_run(&run.label, &run.path, &tables, config) {
                    Ok(result) => {
                        if !result.diagnostics.is_empty() {
                            warn!(
                                "Run '{}' analysed with {} diagnostics",
                                run.label,
                                result.diagnostics.len()
                            );
                        } else {
                            info!("Run '{}' analysed", run.label);
                        }
                        Outcome::Analysed(Box::new(result))
                    }
                    Err(e) => fail(format!("{:#}", e)),
                }
            })
            .collect()
    });

    let mut runs = BTreeMap::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Analysed(result) => {
                runs.insert(result.label.clone(), *result);
            }
            Outcome::Failed(failure) => failures.push(failure),
        }
    }

    let overview = overview(&runs, failures.len());
    Ok(Comparison {
        bin_width: config.bucketer.width(),
        runs,
        failures,
        overview,
    })
}
