//! # Telemetry Data Model
//!
//! Typed, immutable records produced by the data loader for one simulation
//! run. The analysis components only borrow these tables and derive new
//! values from them; nothing in the crate mutates a loaded record.

use serde::{Deserialize, Serialize};

/// Server identifier as emitted by the simulator (1-based).
pub type ServerId = u32;

/// Session identifier as emitted by the simulator.
pub type SessionId = u64;

/// A request entering the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalEvent {
    pub time: f64,
    pub session_id: Option<SessionId>,
}

/// Periodic sample of a server's live connection count and measured delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub server_id: ServerId,
    pub connections: u32,
    pub one_way_delay: f64,
}

/// A completed request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub server_id: ServerId,
    pub session_id: SessionId,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

impl RequestRecord {
    /// Build a record, deriving `duration` from the endpoints when absent.
    pub fn new(
        server_id: ServerId,
        session_id: SessionId,
        start_time: f64,
        end_time: f64,
        duration: Option<f64>,
    ) -> Self {
        Self {
            server_id,
            session_id,
            start_time,
            end_time,
            duration: duration.unwrap_or(end_time - start_time),
        }
    }
}

/// A request that could not be admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub server_id: ServerId,
    pub session_id: Option<SessionId>,
    pub time: f64,
    pub reason: String,
}

/// A session reassignment to a different server.
///
/// `server_id` is the server that received the session; `from_server` is the
/// one it left, when the simulator recorded it. Rate analysis tallies both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedirectEvent {
    pub time: f64,
    pub session_id: Option<SessionId>,
    pub from_server: Option<ServerId>,
    pub server_id: Option<ServerId>,
}

/// Static per-server capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: ServerId,
    pub capacity_mbps: f64,
    pub base_delay: f64,
    pub max_connections: u32,
}

/// Per-server outcome counters written by the simulator at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: ServerId,
    pub picked: u64,
    pub served: u64,
    pub dropped: u64,
}

/// Which optional sources a run provides.
///
/// Computed once per run and consulted by the comparator to gate every
/// metric that depends on an optional table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub drops: bool,
    pub redirects: bool,
    pub summary: bool,
}

/// The complete table set for one run.
///
/// Optional tables are `None` when the source was absent, which is distinct
/// from `Some(vec![])` (present but empty).
#[derive(Debug, Clone, Default)]
pub struct RunTables {
    pub arrivals: Vec<ArrivalEvent>,
    pub snapshots: Vec<Snapshot>,
    pub requests: Vec<RequestRecord>,
    pub servers: Vec<ServerConfig>,
    pub drops: Option<Vec<DropEvent>>,
    pub redirects: Option<Vec<RedirectEvent>>,
    pub summary: Option<Vec<ServerSummary>>,
}

impl RunTables {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            drops: self.drops.is_some(),
            redirects: self.redirects.is_some(),
            summary: self.summary.is_some(),
        }
    }

    /// Server ids of the configured fleet, ascending.
    pub fn fleet(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.servers.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Non-fatal data-quality finding recorded while analysing a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Snapshots referenced a server missing from the server table.
    UnknownServer { server_id: ServerId, snapshots: usize },
    /// Server has `max_connections = 0`; its utilization is undefined.
    ZeroCapacityServer { server_id: ServerId, snapshots: usize },
    /// Drops were recorded in a bin with no arrivals, or more drops than
    /// arrivals.
    DropArrivalMismatch { bin: f64, arrivals: u64, drops: u64 },
    /// Redirect events without a destination server.
    UnattributedRedirects { count: usize },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownServer {
                server_id,
                snapshots,
            } => write!(
                f,
                "server {} has no configuration; {} snapshots excluded from utilization",
                server_id, snapshots
            ),
            Diagnostic::ZeroCapacityServer {
                server_id,
                snapshots,
            } => write!(
                f,
                "server {} has max_connections = 0; {} snapshots excluded from utilization",
                server_id, snapshots
            ),
            Diagnostic::DropArrivalMismatch {
                bin,
                arrivals,
                drops,
            } => write!(
                f,
                "bin {}: {} drops against {} arrivals; drop percentage undefined",
                bin, drops, arrivals
            ),
            Diagnostic::UnattributedRedirects { count } => {
                write!(f, "{} redirects carry no destination server", count)
            }
        }
    }
}
