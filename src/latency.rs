//! # Per-Server Latency Profiles
//!
//! Box-plot style quantiles of request duration for each server. Durations
//! are recorded into an HDR histogram at microsecond resolution with three
//! significant figures, so a profile costs the same regardless of how many
//! requests a server handled.

use crate::model::{RequestRecord, ServerId};
use anyhow::Result;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Quantile summary of request durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyProfile {
    pub requests: u64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

/// Latency collector using HDR histogram for bounded-memory quantiles
pub struct LatencyCollector {
    histogram: Histogram<u64>,
}

impl LatencyCollector {
    /// Create a new latency collector
    pub fn new() -> Result<Self> {
        Ok(Self {
            histogram: Histogram::<u64>::new(3)?,
        })
    }

    /// Record a duration in seconds; negative and non-finite values are
    /// ignored.
    pub fn record(&mut self, seconds: f64) -> Result<()> {
        if seconds.is_finite() && seconds >= 0.0 {
            let micros = (seconds * MICROS_PER_SECOND).round() as u64;
            self.histogram.record(micros)?;
        }
        Ok(())
    }

    /// Summarise the recorded durations; `None` if nothing was recorded.
    pub fn profile(&self) -> Option<LatencyProfile> {
        if self.histogram.is_empty() {
            return None;
        }
        let at = |p: f64| self.histogram.value_at_percentile(p) as f64 / MICROS_PER_SECOND;
        Some(LatencyProfile {
            requests: self.histogram.len(),
            min: self.histogram.min() as f64 / MICROS_PER_SECOND,
            p25: at(25.0),
            median: at(50.0),
            p75: at(75.0),
            p95: at(95.0),
            p99: at(99.0),
            max: self.histogram.max() as f64 / MICROS_PER_SECOND,
        })
    }
}

/// Latency profile of every server that served at least one request.
pub fn server_latency_profiles(
    records: &[RequestRecord],
) -> Result<BTreeMap<ServerId, LatencyProfile>> {
    let mut collectors: BTreeMap<ServerId, LatencyCollector> = BTreeMap::new();
    for record in records {
        let collector = match collectors.entry(record.server_id) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => e.insert(LatencyCollector::new()?),
        };
        collector.record(record.duration)?;
    }

    Ok(collectors
        .into_iter()
        .filter_map(|(server, collector)| collector.profile().map(|p| (server, p)))
        .collect())
}
