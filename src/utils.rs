//! # Utility Functions and Helper Module
//!
//! Small helpers shared by configuration and presentation.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: human-readable display of durations, ratios and counts,
//!   with `-` standing in for values that are undefined or unavailable
//! - **Validation**: configuration checks that raise [`ConfigError`]
//! - **Display Helpers**: fixed-width table rows and separators
//!
//! ## Usage Examples
//!
//! ```rust
//! use lb_analyzer::utils::*;
//!
//! assert_eq!(format_seconds(0.0015), "1.50ms");
//! assert_eq!(format_ratio(Some(0.91234)), "0.912");
//! assert_eq!(format_ratio(None), "-");
//! assert!(validate_percentiles(&[50.0, 95.0]).is_ok());
//! ```

use crate::error::ConfigError;

/// Format a duration given in seconds with an appropriate unit
///
/// ## Unit Selection Logic
///
/// - **< 1ms**: microseconds (e.g., "750.00μs")
/// - **< 1s**: milliseconds (e.g., "1.50ms")
/// - **otherwise**: seconds (e.g., "2.25s")
///
/// Negative or non-finite input is shown as-is in seconds.
///
/// ## Examples
///
/// ```rust
/// # use lb_analyzer::utils::format_seconds;
/// assert_eq!(format_seconds(0.00075), "750.00μs");
/// assert_eq!(format_seconds(0.25), "250.00ms");
/// assert_eq!(format_seconds(2.25), "2.25s");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        format!("{}s", seconds)
    } else if seconds < 1e-3 {
        format!("{:.2}μs", seconds * 1e6)
    } else if seconds < 1.0 {
        format!("{:.2}ms", seconds * 1e3)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Optional duration in seconds, `-` when absent.
pub fn format_optional_seconds(seconds: Option<f64>) -> String {
    seconds.map(format_seconds).unwrap_or_else(|| "-".to_string())
}

/// Dimensionless ratio to three decimals, `-` when undefined.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}

/// Event count, `-` when the source was absent.
pub fn format_count(value: Option<u64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

/// Validate the histogram bin count
///
/// At least one bin is required; the upper end is left to the caller since
/// the count only bounds output size.
pub fn validate_histogram_bins(bins: usize) -> Result<(), ConfigError> {
    if bins == 0 {
        return Err(ConfigError::InvalidHistogramBins);
    }
    Ok(())
}

/// Validate percentile marker levels
///
/// Each level must lie strictly inside (0, 100). The bounds are excluded
/// because the empirical CDF starts at 0 and never reaches 1, so neither
/// extreme names a crossing.
pub fn validate_percentiles(percentiles: &[f64]) -> Result<(), ConfigError> {
    match percentiles
        .iter()
        .find(|&&p| !(p.is_finite() && p > 0.0 && p < 100.0))
    {
        Some(&p) => Err(ConfigError::InvalidPercentile(p)),
        None => Ok(()),
    }
}

/// Format a table row with fixed column widths
///
/// Columns beyond the width list default to 10 characters.
///
/// ```rust
/// # use lb_analyzer::utils::{format_table_row, format_table_separator};
/// let widths = [6, 8];
/// assert_eq!(format_table_separator(&widths), "+--------+----------+");
/// assert_eq!(format_table_row(&["run", "0.912"], &widths), "| run    | 0.912    |");
/// ```
pub fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut row = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        row.push_str(&format!(" {:width$} |", column, width = width));
    }
    row
}

/// Format a table separator matching [`format_table_row`]
pub fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}
