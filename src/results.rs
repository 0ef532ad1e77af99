use crate::comparator::{Comparison, RunResult};
use crate::utils::{
    format_count, format_optional_seconds, format_ratio, format_table_row, format_table_separator,
};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

const SUMMARY_HEADERS: [&str; 9] = [
    "Run",
    "Fairness",
    "CV",
    "Arrivals",
    "Drops",
    "Redirects",
    "p50 latency",
    "p95 latency",
    "Diagnostics",
];

/// System information for reproducibility
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
        }
    }
}

/// Metadata stamped on every JSON document
#[derive(Debug, Serialize)]
pub struct AnalysisMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub bin_width: f64,
    pub total_runs: usize,
    pub failed_runs: usize,
    /// Passed through for the presentation layer; never written here.
    pub out_dir: Option<PathBuf>,
    pub system_info: SystemInfo,
}

/// Document emitted with `--json`
#[derive(Debug, Serialize)]
pub struct FinalAnalysisResults<'a> {
    pub metadata: AnalysisMetadata,
    pub comparison: &'a Comparison,
}

/// Results manager for presenting a finished comparison
pub struct ResultsManager {
    comparison: Comparison,
    out_dir: Option<PathBuf>,
}

impl ResultsManager {
    /// Create a new results manager
    pub fn new(comparison: Comparison, out_dir: Option<PathBuf>) -> Self {
        Self {
            comparison,
            out_dir,
        }
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    fn metadata(&self) -> AnalysisMetadata {
        AnalysisMetadata {
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            bin_width: self.comparison.bin_width,
            total_runs: self.comparison.runs.len() + self.comparison.failures.len(),
            failed_runs: self.comparison.failures.len(),
            out_dir: self.out_dir.clone(),
            system_info: SystemInfo::default(),
        }
    }

    /// Serialize the comparison, with metadata, as pretty JSON
    pub fn write_json<W: Write>(&self, mut out: W) -> Result<()> {
        let document = FinalAnalysisResults {
            metadata: self.metadata(),
            comparison: &self.comparison,
        };
        serde_json::to_writer_pretty(&mut out, &document)?;
        writeln!(out)?;
        out.flush()?;
        debug!("Wrote JSON for {} runs", self.comparison.runs.len());
        Ok(())
    }

    fn summary_row(run: &RunResult) -> Vec<String> {
        let totals = &run.totals;
        vec![
            run.label.clone(),
            format_ratio(totals.mean_fairness),
            format_ratio(totals.mean_cv),
            totals.arrivals.to_string(),
            format_count(totals.drops),
            format_count(totals.redirects),
            format_optional_seconds(totals.latency_p50),
            format_optional_seconds(totals.latency_p95),
            run.diagnostics.len().to_string(),
        ]
    }

    /// Write the cross-run comparison table
    pub fn write_summary<W: Write>(&self, mut out: W) -> Result<()> {
        let rows: Vec<Vec<String>> = self
            .comparison
            .runs
            .values()
            .map(Self::summary_row)
            .collect();

        let widths: Vec<usize> = SUMMARY_HEADERS
            .iter()
            .enumerate()
            .map(|(i, header)| {
                rows.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(
            out,
            "Load balancer comparison (bin width {}s)",
            self.comparison.bin_width
        )?;
        writeln!(out, "{}", format_table_separator(&widths))?;
        writeln!(out, "{}", format_table_row(&SUMMARY_HEADERS, &widths))?;
        writeln!(out, "{}", format_table_separator(&widths))?;
        for row in &rows {
            let columns: Vec<&str> = row.iter().map(String::as_str).collect();
            writeln!(out, "{}", format_table_row(&columns, &widths))?;
        }
        writeln!(out, "{}", format_table_separator(&widths))?;

        let overview = &self.comparison.overview;
        if let Some(best) = &overview.best_fairness {
            writeln!(out, "Best mean fairness: {}", best)?;
        }
        if let Some(fewest) = &overview.fewest_drops {
            writeln!(out, "Fewest drops: {}", fewest)?;
        }
        for failure in &self.comparison.failures {
            writeln!(out, "Excluded {}: {}", failure.label, failure.error)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Emit the comparison on stdout, as JSON or as the summary table
    pub fn finalize(&self, json: bool) -> Result<()> {
        info!(
            "Finalizing results: {} runs analysed, {} excluded",
            self.comparison.overview.analysed, self.comparison.overview.failed
        );
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        if json {
            self.write_json(handle)
        } else {
            self.write_summary(handle)
        }
    }
}
