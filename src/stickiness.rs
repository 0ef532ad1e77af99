//! # Session Stickiness Classifier
//!
//! Measures how much traffic is still served by the server a session started
//! on, as a proxy for session-affinity stability under redirection.
//!
//! 1. A session's **initial server** is the server of its request with the
//!    smallest `start_time`. Equal start times resolve to the record that
//!    appears first in the input.
//! 2. A request is *stickied* when its server equals its session's initial
//!    server.
//! 3. Requests are grouped by the bin of their `start_time`, and each bin
//!    reports `stickied / total`.
//!
//! Bins are keyed on `start_time` so that stickiness lines up with the
//! request-start axis used for latency, not with snapshot instants.

use crate::bucket::{BinIndex, TimeBucketer};
use crate::model::{RequestRecord, ServerId, SessionId};
use crate::series::MetricSeries;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Map each session to its initial server.
pub fn initial_servers(records: &[RequestRecord]) -> HashMap<SessionId, ServerId> {
    let mut first: HashMap<SessionId, (f64, ServerId)> = HashMap::new();
    for record in records {
        first
            .entry(record.session_id)
            .and_modify(|(start, server)| {
                // strict: an equal start never displaces the first-seen record
                if record.start_time < *start {
                    *start = record.start_time;
                    *server = record.server_id;
                }
            })
            .or_insert((record.start_time, record.server_id));
    }
    first
        .into_iter()
        .map(|(session, (_, server))| (session, server))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct BinTally {
    stickied: u64,
    total: u64,
}

/// Per-bin fraction of requests served by their session's initial server.
///
/// Every value lies in `[0, 1]`. Bins without requests are not emitted.
pub fn stickiness_series(records: &[RequestRecord], bucketer: &TimeBucketer) -> MetricSeries {
    let initial = initial_servers(records);

    let mut bins: BTreeMap<BinIndex, BinTally> = BTreeMap::new();
    for record in records {
        let tally = bins.entry(bucketer.index(record.start_time)).or_default();
        tally.total += 1;
        if initial.get(&record.session_id) == Some(&record.server_id) {
            tally.stickied += 1;
        }
    }

    debug!(
        "Classified {} requests from {} sessions into {} bins",
        records.len(),
        initial.len(),
        bins.len()
    );

    // a bin exists only once a request landed in it, so total >= 1
    let values = bins
        .into_iter()
        .map(|(index, tally)| (index, Some(tally.stickied as f64 / tally.total as f64)))
        .collect();

    MetricSeries::from_bins(bucketer, values)
}
