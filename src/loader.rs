//! # CSV Run Loader
//!
//! Reads one simulator run directory into a typed [`RunTables`]. This is the
//! only module that touches the filesystem; the analysis components work on
//! the in-memory tables it returns.
//!
//! ## Layout
//!
//! | File | Required | Columns (aliases) |
//! |---|---|---|
//! | `arrivals.csv` | yes | `time_s` (`time`), `session_id` |
//! | `snapshots.csv` | yes | `time_s`, `server_id`, `connections`, `owd_ms` (`one_way_delay`) |
//! | `requests.csv` | yes | `server_id`, `session_id`, `start_s`, `end_s`, `duration` |
//! | `servers.csv` | yes | `id`, `mbps`, `owd_ms`, `max_conn` |
//! | `drops.csv` | no | `server_id`, `session_id`, `time_s`, `reason` |
//! | `redirects.csv` | no | `session_id`, `from_id`, `to_id` (`server_id`), `time_s` |
//! | `summary.csv` | no | `id`, `picked`, `served`, `dropped` |
//!
//! Optional files that do not exist load as `None`. Extra columns are
//! ignored. A redirects table may carry both `to_id` and `server_id`; the
//! destination is `to_id` when it is filled in, else `server_id`.

use crate::error::LoadError;
use crate::model::{
    ArrivalEvent, DropEvent, RedirectEvent, RequestRecord, RunTables, ServerConfig, ServerId,
    ServerSummary, SessionId, Snapshot,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const ARRIVALS: &str = "arrivals";
pub const SNAPSHOTS: &str = "snapshots";
pub const REQUESTS: &str = "requests";
pub const SERVERS: &str = "servers";
pub const DROPS: &str = "drops";
pub const REDIRECTS: &str = "redirects";
pub const SUMMARY: &str = "summary";

#[derive(Debug, Deserialize)]
struct ArrivalRow {
    #[serde(alias = "time_s")]
    time: f64,
    session_id: Option<SessionId>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    #[serde(alias = "time_s")]
    time: f64,
    server_id: ServerId,
    connections: u32,
    #[serde(alias = "owd_ms")]
    one_way_delay: f64,
}

#[derive(Debug, Deserialize)]
struct RequestRow {
    server_id: ServerId,
    session_id: SessionId,
    #[serde(alias = "start_s")]
    start_time: f64,
    #[serde(alias = "end_s")]
    end_time: f64,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ServerRow {
    id: ServerId,
    #[serde(alias = "mbps")]
    capacity_mbps: f64,
    #[serde(alias = "owd_ms")]
    base_delay: f64,
    #[serde(alias = "max_conn")]
    max_connections: u32,
}

#[derive(Debug, Deserialize)]
struct DropRow {
    server_id: ServerId,
    session_id: Option<SessionId>,
    #[serde(alias = "time_s")]
    time: f64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct RedirectRow {
    #[serde(alias = "time_s")]
    time: f64,
    session_id: Option<SessionId>,
    from_id: Option<ServerId>,
    // not an alias; simulator files may carry both columns
    to_id: Option<ServerId>,
    server_id: Option<ServerId>,
}

/// Read `<dir>/<table>.csv`, or `None` if the file does not exist.
fn read_table<R: DeserializeOwned>(
    dir: &Path,
    table: &'static str,
) -> Result<Option<Vec<R>>, LoadError> {
    let path = dir.join(format!("{}.csv", table));
    if !path.is_file() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|source| LoadError::Csv { table, source })?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<R>, csv::Error>>()
        .map_err(|source| LoadError::Csv { table, source })?;

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(Some(rows))
}

fn require<R: DeserializeOwned>(dir: &Path, table: &'static str) -> Result<Vec<R>, LoadError> {
    read_table(dir, table)?.ok_or_else(|| LoadError::MissingTable {
        table,
        path: dir.join(format!("{}.csv", table)),
    })
}

/// Reject non-finite timestamps; row numbers are 1-based data rows.
fn check_finite<'a, I>(table: &'static str, times: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a f64>,
{
    for (i, t) in times.into_iter().enumerate() {
        if !t.is_finite() {
            return Err(LoadError::InvalidValue {
                table,
                row: i + 1,
                reason: format!("non-finite timestamp {}", t),
            });
        }
    }
    Ok(())
}

/// Load every table of the run stored in `dir`.
pub fn load_run(dir: &Path) -> Result<RunTables, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingRunDirectory(dir.to_path_buf()));
    }

    let arrivals: Vec<ArrivalRow> = require(dir, ARRIVALS)?;
    check_finite(ARRIVALS, arrivals.iter().map(|r| &r.time))?;

    let snapshots: Vec<SnapshotRow> = require(dir, SNAPSHOTS)?;
    check_finite(SNAPSHOTS, snapshots.iter().map(|r| &r.time))?;

    let requests: Vec<RequestRow> = require(dir, REQUESTS)?;
    check_finite(REQUESTS, requests.iter().map(|r| &r.start_time))?;

    let servers: Vec<ServerRow> = require(dir, SERVERS)?;

    let drops: Option<Vec<DropRow>> = read_table(dir, DROPS)?;
    if let Some(rows) = &drops {
        check_finite(DROPS, rows.iter().map(|r| &r.time))?;
    }

    let redirects: Option<Vec<RedirectRow>> = read_table(dir, REDIRECTS)?;
    if let Some(rows) = &redirects {
        check_finite(REDIRECTS, rows.iter().map(|r| &r.time))?;
    }

    let summary: Option<Vec<ServerSummary>> = read_table(dir, SUMMARY)?;

    Ok(RunTables {
        arrivals: arrivals
            .into_iter()
            .map(|r| ArrivalEvent {
                time: r.time,
                session_id: r.session_id,
            })
            .collect(),
        snapshots: snapshots
            .into_iter()
            .map(|r| Snapshot {
                time: r.time,
                server_id: r.server_id,
                connections: r.connections,
                one_way_delay: r.one_way_delay,
            })
            .collect(),
        requests: requests
            .into_iter()
            .map(|r| {
                RequestRecord::new(r.server_id, r.session_id, r.start_time, r.end_time, r.duration)
            })
            .collect(),
        servers: servers
            .into_iter()
            .map(|r| ServerConfig {
                id: r.id,
                capacity_mbps: r.capacity_mbps,
                base_delay: r.base_delay,
                max_connections: r.max_connections,
            })
            .collect(),
        drops: drops.map(|rows| {
            rows.into_iter()
                .map(|r| DropEvent {
                    server_id: r.server_id,
                    session_id: r.session_id,
                    time: r.time,
                    reason: r.reason,
                })
                .collect()
        }),
        redirects: redirects.map(|rows| {
            rows.into_iter()
                .map(|r| RedirectEvent {
                    time: r.time,
                    session_id: r.session_id,
                    from_server: r.from_id,
                    server_id: r.to_id.or(r.server_id),
                })
                .collect()
        }),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn required_tables(dir: &Path) {
        write(dir, "arrivals.csv", "time_s,session_id\n0.10000,1\n0.50000,2\n");
        write(
            dir,
            "snapshots.csv",
            "time_s,server_id,connections,owd_ms\n0.00000,1,0,10.00000\n0.00000,2,1,12.50000\n",
        );
        write(
            dir,
            "requests.csv",
            "server_id,session_id,start_s,end_s,duration\n1,1,0.10000,0.30000,0.20000\n",
        );
        write(dir, "servers.csv", "id,mbps,owd_ms,max_conn\n1,100.0,10.0,50\n2,50.0,12.0,25\n");
    }

    #[test]
    fn test_load_simulator_layout() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        write(
            tmp.path(),
            "drops.csv",
            "server_id,session_id,time_s,reason\n2,5,0.70000,max_conn\n",
        );
        write(
            tmp.path(),
            "redirects.csv",
            "session_id,from_id,to_id,time_s\n1,1,2,0.40000\n",
        );

        let tables = load_run(tmp.path()).unwrap();
        assert_eq!(tables.arrivals.len(), 2);
        assert_eq!(tables.snapshots[1].one_way_delay, 12.5);
        assert_eq!(tables.requests[0].duration, 0.2);
        assert_eq!(tables.servers[1].max_connections, 25);

        let drops = tables.drops.as_ref().unwrap();
        assert_eq!(drops[0].reason, "max_conn");
        let redirects = tables.redirects.as_ref().unwrap();
        assert_eq!(redirects[0].from_server, Some(1));
        assert_eq!(redirects[0].server_id, Some(2));
        assert!(tables.summary.is_none());
    }

    #[test]
    fn test_optional_tables_absent() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        let caps = load_run(tmp.path()).unwrap().capabilities();
        assert!(!caps.drops);
        assert!(!caps.redirects);
        assert!(!caps.summary);
    }

    #[test]
    fn test_alias_columns_and_derived_duration() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        write(
            tmp.path(),
            "requests.csv",
            "server_id,session_id,start_time,end_time\n2,9,1.0,1.75\n",
        );
        write(tmp.path(), "redirects.csv", "time,server_id\n3.0,\n");

        let tables = load_run(tmp.path()).unwrap();
        assert_eq!(tables.requests[0].duration, 0.75);
        assert_eq!(tables.redirects.unwrap()[0].server_id, None);
    }

    #[test]
    fn test_redirect_destination_columns_together() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        write(
            tmp.path(),
            "redirects.csv",
            "session_id,from_id,to_id,server_id,time_s
             1,1,2,2,0.5
             2,2,,3,0.7
             3,3,1,,0.9
",
        );

        let redirects = load_run(tmp.path()).unwrap().redirects.unwrap();
        let to: Vec<_> = redirects.iter().map(|r| r.server_id).collect();
        assert_eq!(to, vec![Some(2), Some(3), Some(1)]);
        assert_eq!(redirects[1].from_server, Some(2));
    }

    #[test]
    fn test_missing_required_table() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        fs::remove_file(tmp.path().join("servers.csv")).unwrap();

        match load_run(tmp.path()) {
            Err(LoadError::MissingTable { table, .. }) => assert_eq!(table, SERVERS),
            other => panic!("expected missing table, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_malformed_row() {
        let tmp = TempDir::new().unwrap();
        required_tables(tmp.path());
        write(tmp.path(), "arrivals.csv", "time_s,session_id\nsoon,1\n");

        let err = load_run(tmp.path()).unwrap_err();
        assert_eq!(err.table(), Some(ARRIVALS));
    }

    #[test]
    fn test_missing_directory() {
        let err = load_run(Path::new("/definitely/not/a/run")).unwrap_err();
        assert!(matches!(err, LoadError::MissingRunDirectory(_)));
    }
}
