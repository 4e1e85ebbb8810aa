use std::process::Command;

use cardinality_harness::hyperloglog::{alpha, classical_standard_error, relative_standard_error};
use cardinality_harness::report::{SUMMARY_CSV_HEADER, TRIAL_CSV_HEADER};
use cardinality_harness::{Evaluation, EvaluationConfig, StreamMode};
use test_case::test_case;

#[test_case(StreamMode::Uniform; "uniform")]
#[test_case(StreamMode::Mixed; "mixed")]
fn test_bias_and_spread_over_trials(mode: StreamMode) {
    let evaluation = Evaluation::run(EvaluationConfig {
        seed: 7,
        trials: 20,
        stream_len: 20_000,
        step: 0.25,
        precision: 10,
        mode,
    });
    let m = 1 << 10;
    let last = evaluation.aggregates().last().unwrap();
    assert_eq!(last.fraction, 1.0);

    let bias = (last.mean_estimate - last.mean_true).abs() / last.mean_true;
    assert!(
        bias < 3.0 * relative_standard_error(m),
        "bias {} for {:?}",
        bias,
        last
    );
    assert!(
        last.empirical_rse() <= 2.0 * classical_standard_error(m),
        "spread {} for {:?}",
        last.empirical_rse(),
        last
    );
}

#[test]
fn test_precision_14_mixed_stream() {
    let evaluation = Evaluation::run(EvaluationConfig {
        seed: 123,
        trials: 1,
        stream_len: 200_000,
        step: 0.05,
        precision: 14,
        mode: StreamMode::Mixed,
    });
    assert_eq!(evaluation.checkpoints().len(), 20);

    let record = &evaluation.trials()[0];
    assert_eq!(record.samples.len(), 20);
    assert!(record
        .samples
        .windows(2)
        .all(|w| w[0].true_count <= w[1].true_count));

    let last = record.last().unwrap();
    assert_eq!(last.prefix_len, 200_000);
    assert!(last.true_count < 200_000);
    assert!(
        last.relative_error().abs() < 0.03,
        "relative error {} at {:?}",
        last.relative_error(),
        last
    );

    let summary = evaluation.summary();
    assert_eq!(summary.m, 16384);
    assert_eq!(
        summary.to_string(),
        "B=14 m=16384 theo_rse_1=0.008141 theo_rse_2=0.010313"
    );
}

#[test]
fn test_zero_length_stream() {
    let evaluation = Evaluation::run(EvaluationConfig {
        stream_len: 0,
        trials: 3,
        precision: 8,
        ..Default::default()
    });
    let empty_estimate = alpha(256) * 256.0;
    for record in evaluation.trials() {
        assert_eq!(record.samples.len(), 20);
        for sample in &record.samples {
            assert_eq!(sample.prefix_len, 0);
            assert_eq!(sample.true_count, 0);
            assert_eq!(sample.relative_error(), 0.0);
            assert!((sample.estimate - empty_estimate).abs() < 1e-9);
        }
    }
    for aggregate in evaluation.aggregates() {
        assert_eq!(aggregate.mean_true, 0.0);
        assert!(aggregate.std_dev_estimate < 1e-9);
    }
}

#[test]
fn test_no_trials() {
    let evaluation = Evaluation::run(EvaluationConfig {
        trials: 0,
        ..Default::default()
    });
    assert!(evaluation.trials().is_empty());
}

#[test]
fn test_runs_are_deterministic() {
    let config = EvaluationConfig {
        seed: 99,
        trials: 4,
        stream_len: 5_000,
        step: 0.1,
        precision: 12,
        mode: StreamMode::Mixed,
    };
    let parallel = Evaluation::run(config.clone());
    assert_eq!(parallel, Evaluation::run(config.clone()));
    assert_eq!(parallel, Evaluation::run_sequential(config.clone()));

    let other = Evaluation::run(EvaluationConfig { seed: 100, ..config });
    assert_ne!(parallel.trials()[0].samples, other.trials()[0].samples);
}

#[test]
fn test_cli_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let run_dir = dir.path().join("runs");
    let summary = dir.path().join("summary.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_hll-eval"))
        .args(["--seed", "5", "--streams", "2", "--n", "2000", "--step", "0.5", "-B", "8"])
        .arg("--out")
        .arg(&run_dir)
        .arg("--summary")
        .arg(&summary)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("B=8 m=256 theo_rse_1=0.065125 theo_rse_2=0.082500"));
    assert!(stdout.contains("empirical_rse_mean_last2="));

    for t in 1..=2 {
        let run = std::fs::read_to_string(run_dir.join(format!("run_{}.csv", t))).unwrap();
        let mut lines = run.lines();
        assert_eq!(lines.next(), Some(TRIAL_CSV_HEADER));
        assert_eq!(lines.count(), 2);
    }
    let summary = std::fs::read_to_string(summary).unwrap();
    assert!(summary.starts_with(SUMMARY_CSV_HEADER));
    assert!(summary.lines().nth(2).unwrap().starts_with("2,1.000000,"));
}
