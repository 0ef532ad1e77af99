//! # Load Balancer Run Analyzer Library
//!
//! Offline metrics aggregation for load-balancer simulation telemetry. Given
//! the event tables a simulator writes for each run (arrivals, periodic
//! per-server snapshots, completed requests, and optionally drops, redirects
//! and a per-server summary), the library derives time-binned quality metrics
//! and latency distributions, and assembles them into a per-run comparison.
//!
//! ## Derived Metrics
//!
//! - **Fairness**: Jain's index over per-server utilization in each time bin
//! - **Variability**: coefficient of variation of the same utilization samples
//! - **Stickiness**: fraction of requests still served by the session's
//!   initial server
//! - **Rates**: arrivals, drops, redirects per bin, drop percentage, and
//!   per-server drop and redirect totals
//! - **Distributions**: latency histogram, empirical CDF and percentile
//!   markers, plus per-server latency profiles and one-way delay distributions
//! - **Connections**: fleet-wide active sessions and a per-server heatmap
//!
//! ## Architecture Overview
//!
//! The core is a set of pure transforms over immutable, in-memory tables:
//!
//! - `bucket`: floor-division time binning shared by every per-bin metric
//! - `model`: the typed tables and the per-run capability query
//! - `utilization`, `fairness`, `stickiness`, `rates`, `distribution`,
//!   `connections`, `latency`: one analysis component each
//! - `comparator`: runs the components per run, in parallel across runs
//!
//! File access (`loader`), configuration (`cli`) and output (`results`) sit
//! around the core and never leak into it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lb_analyzer::{compare_runs, load_run, AnalysisConfig, Args};
//! use clap::Parser;
//!
//! fn main() -> anyhow::Result<()> {
//!     let args = Args::parse_from(["lb-analyzer", "runs/round-robin", "runs/sticky"]);
//!     let config = AnalysisConfig::from_args(&args)?;
//!     let comparison = compare_runs(&config, load_run)?;
//!
//!     for (label, run) in &comparison.runs {
//!         println!("{}: mean fairness {:?}", label, run.totals.mean_fairness);
//!     }
//!     Ok(())
//! }
//! ```

/// Time Bucketer
///
/// Floor-division binning with integer bin keys.
pub mod bucket;

/// Command-line interface and configuration
///
/// Argument parsing using clap, and the validated `AnalysisConfig` the
/// comparator consumes. Includes:
/// - Bin width, histogram and percentile validation
/// - Run label derivation with duplicate disambiguation
pub mod cli;

/// Run Comparator
///
/// Orchestrates every analysis component per run and assembles the
/// cross-run `Comparison`. Failed runs are isolated, not fatal.
pub mod comparator;

pub mod connections;

/// Distribution Builder
///
/// Fixed-bin-count histograms, empirical CDFs and percentile markers.
pub mod distribution;

pub mod error;

/// Fairness/Variability Aggregator
///
/// Jain's index and coefficient of variation per time bin, computed with a
/// numerically stable running accumulator.
pub mod fairness;

pub mod latency;

/// CSV Data Loader
///
/// Reads the simulator's run directory layout into typed tables, treating
/// drops, redirects and summary as optional sources.
pub mod loader;

pub mod logging;

pub mod model;

/// Rate Analyzer
///
/// Per-bin event counts, drop percentage, and per-server totals.
pub mod rates;

/// Result presentation
///
/// Console comparison table and the JSON handoff for external plotting.
pub mod results;

pub mod series;

pub mod stickiness;

pub mod utilization;

pub mod utils;

// Re-export key types for convenient library usage

pub use bucket::TimeBucketer;
pub use cli::{AnalysisConfig, Args, RunSpec};
pub use comparator::{analyze_run, compare_runs, Comparison, RunFailure, RunResult};
pub use error::{ConfigError, LoadError};
pub use loader::load_run;
pub use model::RunTables;
pub use results::ResultsManager;
pub use series::{MetricName, MetricSeries};

/// The current version of the analyzer
///
/// Populated from Cargo.toml and stamped into JSON output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default time bin width, in seconds
    pub const BIN_WIDTH: f64 = 1.0;

    /// Default histogram bin count
    ///
    /// A fixed count rather than a fixed width keeps histograms of runs on
    /// different latency scales comparable bin for bin.
    pub const HISTOGRAM_BINS: usize = 40;

    /// Default percentile markers
    pub const PERCENTILES: [f64; 2] = [50.0, 95.0];
}
