//! `hll-eval` runs a checkpointed HyperLogLog evaluation and writes per-trial and summary CSV files.

use std::path::PathBuf;

use anyhow::Context as _;
use cardinality_harness::harness::{hash_seed, register_load_cv, DEFAULT_TAIL};
use cardinality_harness::report::{aggregate_table, write_report};
use cardinality_harness::{Evaluation, EvaluationConfig, HashOracle, KeyStream, StreamMode};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Evaluate HyperLogLog accuracy against exact distinct counts on synthetic key streams.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Global seed all trial seeds are derived from.
    #[arg(long, default_value_t = 123)]
    seed: u64,

    /// Number of independent trials (streams).
    #[arg(long, default_value_t = 20)]
    streams: usize,

    /// Number of keys per stream.
    #[arg(long, default_value_t = 200_000)]
    n: usize,

    /// Checkpoint step as a fraction of the stream, clamped into (0, 1].
    #[arg(long, default_value_t = 0.05, allow_negative_numbers = true)]
    step: f64,

    /// Sketch precision B, clamped into [4, 18].
    #[arg(short = 'B', long = "precision", alias = "B", default_value_t = 14)]
    precision: u8,

    /// Stream generation mode: `uniform` or `mixed` (anything else selects `mixed`).
    #[arg(long, default_value = "mixed")]
    mode: String,

    /// Directory for per-trial CSV files.
    #[arg(long = "out", default_value = "data/runs")]
    out_dir: PathBuf,

    /// Path of the aggregated summary CSV file.
    #[arg(long, default_value = "data/summary.csv")]
    summary: PathBuf,

    /// Number of trailing checkpoints compared against the theoretical error bounds.
    #[arg(long, default_value_t = DEFAULT_TAIL)]
    tail: usize,

    /// Run trials on the calling thread only.
    #[arg(long)]
    sequential: bool,
}

impl Cli {
    fn config(&self) -> EvaluationConfig {
        EvaluationConfig {
            seed: self.seed,
            trials: self.streams,
            stream_len: self.n,
            step: self.step,
            precision: self.precision,
            mode: StreamMode::from_selector(&self.mode),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let requested = cli.config();
    let config = requested.clone().normalized();
    if config.precision != requested.precision {
        warn!(
            requested = requested.precision,
            effective = config.precision,
            "Precision clamped into supported range."
        );
    }
    if config.step != requested.step {
        warn!(
            requested = requested.step,
            effective = config.step,
            "Checkpoint step clamped into (0, 1]."
        );
    }

    info!(
        seed = config.seed,
        trials = config.trials,
        stream_len = config.stream_len,
        step = config.step,
        precision = config.precision,
        mode = %config.mode,
        "Starting evaluation."
    );

    if config.trials > 0 {
        let seed = config.trial_seed(0);
        let stream = KeyStream::generate(seed, config.stream_len, config.mode);
        let oracle = HashOracle::new(hash_seed(seed));
        let cv = register_load_cv(stream.iter(), &oracle, config.precision);
        info!(register_load_cv = cv, "Register load uniformity of the first stream.");
    }

    let evaluation = if cli.sequential {
        Evaluation::run_sequential(config)
    } else {
        Evaluation::run(config)
    };

    write_report(&evaluation, &cli.out_dir, &cli.summary).context("failed to write report")?;

    println!("{}", aggregate_table(evaluation.aggregates()));
    println!("{}", evaluation.summary());
    let check = evaluation.theory_check(cli.tail);
    println!("{}", check);
    if !check.within_classical_bound(2.0) {
        warn!(
            empirical_rse_max = check.empirical_rse_max,
            bound = 2.0 * check.summary.rse_132,
            "Empirical relative standard error exceeds twice the classical bound."
        );
    }
    Ok(())
}
