//! # Load Balancer Run Analyzer - Main Entry Point
//!
//! Compares load-balancer simulation runs from the tables each run writes to
//! its directory.
//!
//! ## Architecture Overview
//!
//! The main function performs these key operations:
//! 1. **Parse arguments**: processes command-line configuration
//! 2. **Initialize logging**: coloured `tracing` output on stderr
//! 3. **Validate configuration**: bin width, histogram bins, percentiles and
//!    run list are checked before any run is touched
//! 4. **Compare runs**: loads and analyses every run on a worker pool
//! 5. **Present results**: prints the comparison table, or the full JSON
//!    document with `--json`
//!
//! ## Error Handling
//!
//! Configuration errors abort the invocation. A run that fails to load is
//! excluded and reported while the other runs proceed; the process still
//! exits with an error if no run could be analysed at all.

use anyhow::{Context, Result};
use clap::Parser;
use lb_analyzer::{
    cli::{AnalysisConfig, Args},
    comparator::compare_runs,
    loader::load_run,
    logging::init_logging,
    results::ResultsManager,
};
use tracing::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting load balancer run analysis");
    debug!("Configuration: {:?}", args);

    let config = AnalysisConfig::from_args(&args).context("Invalid configuration")?;

    let comparison = compare_runs(&config, load_run)?;
    let analysed = comparison.runs.len();

    let results_manager = ResultsManager::new(comparison, config.out_dir.clone());
    results_manager.finalize(args.json)?;

    if analysed == 0 {
        anyhow::bail!("None of the {} runs could be analysed", config.runs.len());
    }

    info!("Analysis completed successfully");
    Ok(())
}
