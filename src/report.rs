//! Rendering of evaluation results into CSV files and console tables.
//!
//! Per-trial files (`run_{t}.csv`) hold one row per checkpoint:
//! `t,processed_fraction,true_F0,estimate_Nt,rel_error`.
//!
//! The summary file holds one row per checkpoint aggregated over all trials:
//! `t,processed_fraction,mean_true_F0,mean_estimate_Nt,sigma_estimate_Nt`.
//!
//! `t` is 1-based and all floating point values use six decimals.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use tracing::info;

use crate::harness::{AggregateRecord, Evaluation, TrialRecord};

/// Header of per-trial CSV files
pub const TRIAL_CSV_HEADER: &str = "t,processed_fraction,true_F0,estimate_Nt,rel_error";
/// Header of the summary CSV file
pub const SUMMARY_CSV_HEADER: &str =
    "t,processed_fraction,mean_true_F0,mean_estimate_Nt,sigma_estimate_Nt";

/// Report error
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ReportError {
    /// Output directory could not be created.
    #[snafu(display("Failed to create directory '{}': {}", path.display(), source))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output file could not be written.
    #[snafu(display("Failed to write file '{}': {}", path.display(), source))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render samples of `record` as CSV
pub fn trial_csv(record: &TrialRecord) -> String {
    let mut out = String::from(TRIAL_CSV_HEADER);
    out.push('\n');
    for sample in &record.samples {
        out.push_str(&format!(
            "{},{:.6},{},{:.6},{:.6}\n",
            sample.index + 1,
            sample.fraction,
            sample.true_count,
            sample.estimate,
            sample.relative_error()
        ));
    }
    out
}

/// Render `aggregates` as CSV
pub fn summary_csv(aggregates: &[AggregateRecord]) -> String {
    let mut out = String::from(SUMMARY_CSV_HEADER);
    out.push('\n');
    for record in aggregates {
        out.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.6}\n",
            record.index + 1,
            record.fraction,
            record.mean_true,
            record.mean_estimate,
            record.std_dev_estimate
        ));
    }
    out
}

/// Write `contents` to `path`, creating missing parent directories
pub fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(CreateDirectory { path: parent })?;
    }
    fs::write(path, contents).context(WriteFile { path })?;
    info!("Saved {}.", path.display());
    Ok(())
}

/// Write every trial of `evaluation` into `run_dir` and the aggregates into `summary_path`.
///
/// Returns paths of all written files, trial files first.
pub fn write_report(
    evaluation: &Evaluation,
    run_dir: &Path,
    summary_path: &Path,
) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(run_dir).context(CreateDirectory { path: run_dir })?;

    let mut written = Vec::with_capacity(evaluation.trials().len() + 1);
    for record in evaluation.trials() {
        let path = run_dir.join(format!("run_{}.csv", record.trial + 1));
        write_file(&path, &trial_csv(record))?;
        written.push(path);
    }

    write_file(summary_path, &summary_csv(evaluation.aggregates()))?;
    written.push(summary_path.to_path_buf());
    Ok(written)
}

#[derive(Tabled)]
struct AggregateRow {
    t: usize,
    processed_fraction: String,
    mean_true_f0: String,
    mean_estimate: String,
    sigma_estimate: String,
    empirical_rse: String,
}

/// Render `aggregates` as a markdown table
pub fn aggregate_table(aggregates: &[AggregateRecord]) -> String {
    let rows = aggregates.iter().map(|r| AggregateRow {
        t: r.index + 1,
        processed_fraction: format!("{:.2}", r.fraction),
        mean_true_f0: format!("{:.1}", r.mean_true),
        mean_estimate: format!("{:.1}", r.mean_estimate),
        sigma_estimate: format!("{:.1}", r.std_dev_estimate),
        empirical_rse: format!("{:.4}", r.empirical_rse()),
    });

    let table_config = Settings::default().with(Style::markdown());
    Table::new(rows).with(table_config).to_string()
}
