use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lb_analyzer::bucket::TimeBucketer;
use lb_analyzer::distribution::build_distribution;
use lb_analyzer::fairness::aggregate_fairness;
use lb_analyzer::model::{RequestRecord, ServerConfig, Snapshot};
use lb_analyzer::stickiness::stickiness_series;
use lb_analyzer::utilization::sample_utilization;

const SERVERS: u32 = 16;

// 10 snapshot rounds per second across the fleet
fn synthetic_snapshots(seconds: u32) -> Vec<Snapshot> {
    let mut snapshots = Vec::with_capacity((seconds * 10 * SERVERS) as usize);
    for tick in 0..seconds * 10 {
        for server_id in 1..=SERVERS {
            snapshots.push(Snapshot {
                time: tick as f64 * 0.1,
                server_id,
                connections: (tick * 7 + server_id * 13) % 50,
                one_way_delay: 10.0 + (server_id % 5) as f64,
            });
        }
    }
    snapshots
}

fn synthetic_servers() -> Vec<ServerConfig> {
    (1..=SERVERS)
        .map(|id| ServerConfig {
            id,
            capacity_mbps: 100.0,
            base_delay: 10.0,
            max_connections: 50,
        })
        .collect()
}

// sessions hop to another server every fourth request
fn synthetic_requests(count: u64) -> Vec<RequestRecord> {
    (0..count)
        .map(|i| {
            let session = i % 1000;
            let hop = ((i / 1000) % 4 == 3) as u64;
            let server = ((session + hop) % SERVERS as u64) as u32 + 1;
            let start = i as f64 * 0.01;
            RequestRecord::new(server, session, start, start + 0.05, None)
        })
        .collect()
}

fn bench_fairness(c: &mut Criterion) {
    let mut group = c.benchmark_group("fairness_aggregation");
    let bucketer = TimeBucketer::new(1.0).unwrap();
    let servers = synthetic_servers();

    for seconds in [60u32, 600] {
        let snapshots = synthetic_snapshots(seconds);
        let samples = sample_utilization(&snapshots, &servers).samples;

        group.bench_with_input(BenchmarkId::new("sample", seconds), &snapshots, |b, s| {
            b.iter(|| sample_utilization(black_box(s), black_box(&servers)))
        });
        group.bench_with_input(BenchmarkId::new("aggregate", seconds), &samples, |b, s| {
            b.iter(|| aggregate_fairness(black_box(s), &bucketer))
        });
    }

    group.finish();
}

fn bench_stickiness(c: &mut Criterion) {
    let mut group = c.benchmark_group("stickiness");
    let bucketer = TimeBucketer::new(1.0).unwrap();

    for count in [10_000u64, 100_000] {
        let requests = synthetic_requests(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &requests, |b, r| {
            b.iter(|| stickiness_series(black_box(r), &bucketer))
        });
    }

    group.finish();
}

fn bench_distribution(c: &mut Criterion) {
    let requests = synthetic_requests(100_000);
    let durations: Vec<f64> = requests
        .iter()
        .enumerate()
        .map(|(i, r)| r.duration * (1.0 + (i % 97) as f64 / 10.0))
        .collect();

    c.bench_function("latency_distribution_100k", |b| {
        b.iter(|| build_distribution(black_box(&durations), 40, &[50.0, 95.0]))
    });
}

criterion_group!(benches, bench_fairness, bench_stickiness, bench_distribution);
criterion_main!(benches);
