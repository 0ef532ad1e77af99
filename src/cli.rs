use crate::bucket::TimeBucketer;
use crate::error::ConfigError;
use crate::utils::{validate_histogram_bins, validate_percentiles};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Load Balancer Run Analyzer - Compare fairness, stickiness and latency across simulator runs
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Run directories to compare (each holding the simulator's CSV tables)
    #[clap(required = true, num_args = 1.., help_heading = "Core Options")]
    pub runs: Vec<PathBuf>,

    /// Width of the time bins, in seconds
    #[clap(short = 'b', long, default_value_t = crate::defaults::BIN_WIDTH, help_heading = "Core Options")]
    pub bin_width: f64,

    /// Output directory for an external presentation layer (not written by this tool)
    #[clap(short = 'o', long)]
    pub out_dir: Option<PathBuf>,

    /// Number of histogram bins for latency and delay distributions
    #[clap(long, default_value_t = crate::defaults::HISTOGRAM_BINS)]
    pub hist_bins: usize,

    /// Percentile markers to report on each distribution
    #[clap(long, num_args = 1.., default_values_t = crate::defaults::PERCENTILES.to_vec())]
    pub percentiles: Vec<f64>,

    /// Worker threads used to analyse runs in parallel
    #[clap(short = 'j', long, default_value_t = num_cpus::get())]
    pub jobs: usize,

    /// Print the full comparison as JSON on stdout instead of the summary table
    #[clap(long, default_value_t = false)]
    pub json: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// A run directory and the label it is reported under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub label: String,
    pub path: PathBuf,
}

/// Validated analysis configuration
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub runs: Vec<RunSpec>,
    pub bucketer: TimeBucketer,
    pub histogram_bins: usize,
    pub percentiles: Vec<f64>,
    pub jobs: usize,
    pub out_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            bucketer: TimeBucketer::default(),
            histogram_bins: crate::defaults::HISTOGRAM_BINS,
            percentiles: crate::defaults::PERCENTILES.to_vec(),
            jobs: 1,
            out_dir: None,
        }
    }
}

impl AnalysisConfig {
    /// Create the analysis configuration from CLI arguments
    ///
    /// Every check runs here, before any run directory is touched:
    /// - the bin width must be positive and finite
    /// - at least one histogram bin
    /// - percentiles inside (0, 100)
    /// - at least one run directory
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let bucketer = TimeBucketer::new(args.bin_width)?;
        validate_histogram_bins(args.hist_bins)?;
        validate_percentiles(&args.percentiles)?;
        if args.runs.is_empty() {
            return Err(ConfigError::NoRuns);
        }

        Ok(Self {
            runs: run_specs(&args.runs),
            bucketer,
            histogram_bins: args.hist_bins,
            percentiles: args.percentiles.clone(),
            jobs: args.jobs.max(1),
            out_dir: args.out_dir.clone(),
        })
    }
}

/// Label for a run directory: its final path component.
pub fn run_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Pair each directory with a unique label.
///
/// Repeated labels get a `#n` suffix in order of appearance, so
/// `a/run b/run` become `run` and `run#2`. A suffixed label that is already
/// taken, for instance by a directory literally named `run#2`, moves on to
/// the next free `n`.
pub fn run_specs(paths: &[PathBuf]) -> Vec<RunSpec> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    paths
        .iter()
        .map(|path| {
            let base = run_label(path);
            let label = if taken.contains(&base) {
                let n = next_suffix.entry(base.clone()).or_insert(2);
                while taken.contains(&format!("{}#{}", base, n)) {
                    *n += 1;
                }
                let label = format!("{}#{}", base, n);
                *n += 1;
                label
            } else {
                base
            };
            taken.insert(label.clone());
            RunSpec {
                label,
                path: path.clone(),
            }
        })
        .collect()
}
