//! # Error Taxonomy
//!
//! Typed errors for the two failure classes that can stop work:
//!
//! - **Configuration errors** halt the whole invocation before any run is
//!   loaded or aggregated.
//! - **Load errors** halt only the affected run; the comparator records them
//!   as [`crate::comparator::RunFailure`] and carries on with the other runs.
//!
//! Numerically undefined values (zero denominators) are absent
//! from this module. They are absorbed locally by each aggregator and surface
//! as undefined-bin markers in [`crate::series::MetricSeries`].

use std::path::PathBuf;
use thiserror::Error;

/// Invalid analysis configuration, raised before any aggregation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("bin width must be a positive finite number, got {0}")]
    InvalidBinWidth(f64),

    #[error("histogram bin count must be at least 1")]
    InvalidHistogramBins,

    #[error("percentile {0} is outside the open interval (0, 100)")]
    InvalidPercentile(f64),

    #[error("no run directories supplied")]
    NoRuns,
}

/// Failure to produce the typed tables for a single run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("required table '{table}' not found at {}", path.display())]
    MissingTable { table: &'static str, path: PathBuf },

    #[error("failed to read table '{table}': {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("table '{table}' row {row}: {reason}")]
    InvalidValue {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error("run directory {} does not exist", .0.display())]
    MissingRunDirectory(PathBuf),
}

impl LoadError {
    /// Name of the table the error refers to, if any.
    pub fn table(&self) -> Option<&'static str> {
        match self {
            LoadError::MissingTable { table, .. }
            | LoadError::Csv { table, .. }
            | LoadError::InvalidValue { table, .. } => Some(table),
            LoadError::MissingRunDirectory(_) => None,
        }
    }
}
