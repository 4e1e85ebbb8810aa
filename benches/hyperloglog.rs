use cardinality_harness::{Evaluation, EvaluationConfig, HashOracle, HyperLogLog, StreamMode};
use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use pprof::criterion::{Output, PProfProfiler};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};

/// Insert and estimate operations are benchmarked against cardinalities ranging from 1 to
/// `DEFAULT_MAX_CARDINALITY` or environment variable `N` (if defined) with cardinality
/// multiplied by 16 with every iteration.
const DEFAULT_MAX_CARDINALITY: usize = 1 << 20;
/// Precisions benchmarked
const PRECISIONS: [u8; 4] = [4, 10, 14, 18];

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Protobuf));
    targets = benchmark
}
criterion_main!(benches);

fn benchmark(c: &mut Criterion) {
    let max_cardinality = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CARDINALITY);

    let cardinalities: Vec<usize> = (0..)
        .map(|c| 1 << (4 * c))
        .take_while(|&c| c <= max_cardinality)
        .collect();

    let hashes = hashed_keys(max_cardinality);

    let mut group = c.benchmark_group("add");
    for &cardinality in &cardinalities {
        group.throughput(Throughput::Elements(cardinality as u64));
        for precision in PRECISIONS {
            bench_add(&mut group, precision, &hashes[..cardinality]);
        }
    }
    group.finish();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(1));
    for precision in PRECISIONS {
        let mut hll = HyperLogLog::new(precision);
        hashes.iter().for_each(|&h| hll.add(h));
        group.bench_with_input(BenchmarkId::from_parameter(precision), &hll, |b, hll| {
            b.iter(|| black_box(hll).estimate())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("hash");
    let keys: Vec<String> = (0..1024).map(|i| format!("user{:06}", i)).collect();
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("hash_str", |b| {
        let oracle = HashOracle::new(123);
        b.iter(|| {
            keys.iter()
                .fold(0u32, |acc, k| acc ^ oracle.hash_str(black_box(k)))
        })
    });
    group.finish();

    let mut group = c.benchmark_group("evaluation");
    group.sample_size(10);
    group.bench_function("trials_4_n_20000_step_0.05", |b| {
        b.iter(|| {
            Evaluation::run(EvaluationConfig {
                trials: 4,
                stream_len: 20_000,
                ..Default::default()
            })
        })
    });
    group.finish();

    if let Ok(bench_results_path) = std::env::var("BENCH_RESULTS_PATH") {
        let results: Vec<StatRecord> = cardinalities
            .iter()
            .map(|&cardinality| StatRecord {
                cardinality,
                p4: measure_error(4, cardinality),
                p10: measure_error(10, cardinality),
                p14: measure_error(14, cardinality),
                p18: measure_error(18, cardinality),
            })
            .collect();

        let table_config = Settings::default().with(Style::markdown());
        std::fs::write(
            format!("{}/relative_error.md", bench_results_path),
            Table::new(results).with(table_config).to_string(),
        )
        .unwrap();
    }
}

fn hashed_keys(n: usize) -> Vec<u32> {
    let oracle = HashOracle::new(0x5eed);
    (0..n)
        .map(|i| oracle.hash(&(i as u64).to_le_bytes()))
        .collect()
}

fn bench_add(group: &mut BenchmarkGroup<WallTime>, precision: u8, hashes: &[u32]) {
    group.bench_with_input(
        BenchmarkId::new(format!("p{}", precision), hashes.len()),
        &hashes,
        |b, &hashes| {
            b.iter(|| {
                let mut hll = HyperLogLog::new(precision);
                for &h in hashes {
                    hll.add(black_box(h));
                }
                hll
            });
        },
    );
}

/// Mean absolute relative error of the uncorrected estimator over independent hash seeds
fn measure_error(precision: u8, cardinality: usize) -> String {
    let n = 20;
    let mut total_relative_error: f64 = 0.0;
    for seed in 0..n {
        let oracle = HashOracle::new(seed);
        let mut hll = HyperLogLog::new(precision);
        for i in 0..cardinality {
            hll.add(oracle.hash(&(i as u64).to_le_bytes()));
        }
        total_relative_error += (hll.estimate() - cardinality as f64).abs() / cardinality as f64;
    }
    let avg_relative_error = total_relative_error / (n as f64);

    if avg_relative_error < 1.0 {
        format!("{:.4}", avg_relative_error)
    } else {
        format!("{:.2e}", avg_relative_error)
    }
}

#[derive(Tabled)]
struct StatRecord {
    cardinality: usize,
    p4: String,
    p10: String,
    p14: String,
    p18: String,
}
