use anyhow::Result;
use clap::Parser;
use lb_analyzer::{compare_runs, load_run, AnalysisConfig, Args, MetricName, ResultsManager};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SERVERS: &str = "id,mbps,owd_ms,max_conn\n1,100.0,10.0,10\n2,50.0,20.0,20\n";

const SNAPSHOTS: &str = "time_s,server_id,connections,owd_ms\n\
0.00000,1,5,10.00000\n\
0.00000,2,10,20.00000\n\
1.00000,1,4,11.00000\n\
1.00000,2,2,24.00000\n\
2.00000,1,0,10.00000\n\
2.00000,2,0,20.00000\n";

const ARRIVALS: &str = "time_s,session_id\n0.10000,1\n0.20000,2\n0.60000,3\n1.10000,4\n1.50000,5\n";

const REQUESTS: &str = "server_id,session_id,start_s,end_s,duration\n\
1,1,0.10000,0.15000,0.05000\n\
2,2,0.20000,0.30000,0.10000\n\
1,3,0.60000,0.62000,0.02000\n\
2,1,1.10000,1.30000,0.20000\n";

fn write_run(root: &Path, name: &str, files: &[(&str, &str)]) -> Result<()> {
    let dir = root.join(name);
    fs::create_dir_all(&dir)?;
    for (file, body) in files {
        fs::write(dir.join(file), body)?;
    }
    Ok(())
}

fn base_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("servers.csv", SERVERS),
        ("snapshots.csv", SNAPSHOTS),
        ("arrivals.csv", ARRIVALS),
        ("requests.csv", REQUESTS),
    ]
}

/// Three runs: one with every optional table, one with no drops.csv, and one
/// missing servers.csv. The broken run is excluded; the others are analysed.
#[test]
fn compare_runs_end_to_end() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = tmp.path();

    let mut full = base_files();
    full.push((
        "drops.csv",
        "server_id,session_id,time_s,reason\n1,6,1.20000,max_conn\n",
    ));
    full.push((
        "redirects.csv",
        "session_id,from_id,to_id,time_s\n1,1,2,1.10000\n",
    ));
    full.push((
        "summary.csv",
        "id,picked,served,dropped\n1,3,2,1\n2,2,2,0\n",
    ));
    write_run(root, "full", &full)?;
    write_run(root, "nodrops", &base_files())?;

    let broken: Vec<_> = base_files()
        .into_iter()
        .filter(|(file, _)| *file != "servers.csv")
        .collect();
    write_run(root, "broken", &broken)?;

    let args = Args::try_parse_from([
        "lb-analyzer".to_string(),
        "--jobs".to_string(),
        "2".to_string(),
        root.join("full").display().to_string(),
        root.join("nodrops").display().to_string(),
        root.join("broken").display().to_string(),
    ])?;
    let config = AnalysisConfig::from_args(&args)?;
    let comparison = compare_runs(&config, load_run)?;

    assert_eq!(comparison.runs.len(), 2);
    assert_eq!(comparison.failures.len(), 1);
    assert_eq!(comparison.failures[0].label, "broken");
    assert!(comparison.failures[0].error.contains("servers"));

    let full = &comparison.runs["full"];
    // bin 0: utilization [0.5, 0.5]
    assert_eq!(full.series[&MetricName::Fairness].get(0.0), Some(1.0));
    assert_eq!(
        full.series[&MetricName::CoefficientOfVariation].get(0.0),
        Some(0.0)
    );
    // bin 2: every server idle, fairness undefined
    assert!(full.series[&MetricName::Fairness].get(2.0).is_none());
    assert_eq!(full.series[&MetricName::Fairness].undefined, vec![2.0]);

    let pct = &full.series[&MetricName::DropPercentage];
    assert_eq!(pct.get(0.0), Some(0.0));
    assert_eq!(pct.get(1.0), Some(50.0));
    assert_eq!(full.totals.drops, Some(1));
    assert_eq!(full.totals.redirects, Some(1));
    // the redirect left server 1 for server 2
    let away = full.redirects_away_per_server.as_ref().unwrap();
    assert_eq!(away.per_server[&1], 1);
    assert_eq!(full.outcomes[0].picked, Some(3));

    // session 1 moved from server 1 to server 2 in bin 1
    let stickiness = &full.series[&MetricName::Stickiness];
    assert_eq!(stickiness.get(0.0), Some(1.0));
    assert_eq!(stickiness.get(1.0), Some(0.0));

    let nodrops = &comparison.runs["nodrops"];
    assert!(!nodrops.series.contains_key(&MetricName::Drops));
    assert!(!nodrops.series.contains_key(&MetricName::DropPercentage));
    assert!(!nodrops.series.contains_key(&MetricName::Redirects));
    assert_eq!(nodrops.totals.drops, None);
    assert_eq!(nodrops.latency.count, 4);
    assert_eq!(nodrops.latency.percentile(50.0), Some(0.1));

    assert_eq!(comparison.overview.fewest_drops.as_deref(), Some("full"));
    Ok(())
}

#[test]
fn json_handoff_contains_every_run() -> Result<()> {
    let tmp = TempDir::new()?;
    write_run(tmp.path(), "only", &base_files())?;

    let args = Args::try_parse_from([
        "lb-analyzer".to_string(),
        "--json".to_string(),
        "-b".to_string(),
        "0.5".to_string(),
        tmp.path().join("only").display().to_string(),
    ])?;
    let config = AnalysisConfig::from_args(&args)?;
    let manager = ResultsManager::new(compare_runs(&config, load_run)?, config.out_dir.clone());

    let mut out = Vec::new();
    manager.write_json(&mut out)?;
    let doc: serde_json::Value = serde_json::from_slice(&out)?;

    assert_eq!(doc["metadata"]["bin_width"], 0.5);
    let run = &doc["comparison"]["runs"]["only"];
    assert!(run["series"]["arrivals"]["points"].is_array());
    assert!(run["series"]["active_sessions"]["points"].is_array());
    assert!(run["delay_distributions"]["1"]["histogram"].is_array());
    // server 2 reported 10, 2, 0 connections
    assert_eq!(run["connection_distributions"]["2"]["count"], 3);
    assert_eq!(run["connection_distributions"]["2"]["max"], 10.0);
    assert_eq!(run["connection_distributions"]["1"]["min"], 0.0);
    assert_eq!(run["latency"]["count"], 4);
    Ok(())
}

#[test]
fn duplicate_run_names_are_disambiguated() -> Result<()> {
    let tmp = TempDir::new()?;
    write_run(&tmp.path().join("a"), "run", &base_files())?;
    write_run(&tmp.path().join("b"), "run", &base_files())?;

    let args = Args::try_parse_from([
        "lb-analyzer".to_string(),
        tmp.path().join("a/run").display().to_string(),
        tmp.path().join("b/run").display().to_string(),
    ])?;
    let config = AnalysisConfig::from_args(&args)?;
    let comparison = compare_runs(&config, load_run)?;

    assert_eq!(
        comparison.runs.keys().cloned().collect::<Vec<_>>(),
        vec!["run".to_string(), "run#2".to_string()]
    );
    Ok(())
}
