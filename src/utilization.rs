//! # Utilization Sampler
//!
//! Joins snapshot samples with the static server table to produce a
//! dimensionless utilization value, `connections / max_connections`, per
//! (server, time) sample.
//!
//! Snapshots whose server is unknown, or whose server has zero connection
//! capacity, are excluded. Each exclusion is recorded as a
//! [`Diagnostic`] (one per server, with the number of snapshots dropped)
//! rather than being folded in as utilization 0.

use crate::model::{Diagnostic, ServerConfig, ServerId, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Utilization of one server at one snapshot instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub time: f64,
    pub server_id: ServerId,
    /// Never negative; may exceed 1.0 when a server is over-admitted.
    pub utilization: f64,
}

/// Sampler output: the resolvable samples plus the recorded omissions.
#[derive(Debug, Clone, Default)]
pub struct UtilizationSamples {
    pub samples: Vec<UtilizationSample>,
    pub omissions: Vec<Diagnostic>,
}

/// Compute utilization samples for every snapshot with a resolvable,
/// non-zero capacity. Output order follows input order.
pub fn sample_utilization(snapshots: &[Snapshot], servers: &[ServerConfig]) -> UtilizationSamples {
    let capacity: HashMap<ServerId, u32> = servers
        .iter()
        .map(|s| (s.id, s.max_connections))
        .collect();

    let mut samples = Vec::with_capacity(snapshots.len());
    let mut unknown: BTreeMap<ServerId, usize> = BTreeMap::new();
    let mut zero_capacity: BTreeMap<ServerId, usize> = BTreeMap::new();

    for snap in snapshots {
        match capacity.get(&snap.server_id) {
            None => *unknown.entry(snap.server_id).or_default() += 1,
            Some(0) => *zero_capacity.entry(snap.server_id).or_default() += 1,
            Some(&max) => samples.push(UtilizationSample {
                time: snap.time,
                server_id: snap.server_id,
                utilization: snap.connections as f64 / max as f64,
            }),
        }
    }

    let mut omissions = Vec::new();
    for (server_id, snapshots) in unknown {
        let diagnostic = Diagnostic::UnknownServer {
            server_id,
            snapshots,
        };
        warn!("{}", diagnostic);
        omissions.push(diagnostic);
    }
    for (server_id, snapshots) in zero_capacity {
        let diagnostic = Diagnostic::ZeroCapacityServer {
            server_id,
            snapshots,
        };
        warn!("{}", diagnostic);
        omissions.push(diagnostic);
    }

    debug!(
        "Sampled utilization for {} of {} snapshots",
        samples.len(),
        snapshots.len()
    );

    UtilizationSamples { samples, omissions }
}
