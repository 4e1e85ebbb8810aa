//! ## Evaluation harness
//! Drives synthetic key streams through a [`HyperLogLog`] sketch and compares its estimates
//! with exact distinct counts at checkpointed prefixes of every stream.
//!
//! Each trial moves through `Idle -> Streaming -> Checkpointed* -> Done`:
//! - `Idle`: the trial owns a freshly generated stream, hash oracle and empty sketch,
//!   all derived from a per-trial seed.
//! - `Streaming`: only keys exposed since the previous checkpoint are hashed and added,
//!   keys are never fed twice.
//! - `Checkpointed`: the exact distinct count of the whole prefix and the current
//!   estimate are recorded.
//! - `Done`: the final (`1.0`) checkpoint has been recorded and the record is frozen.
//!
//! Trials share no mutable state and run in parallel, aggregation waits for all of them.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::checkpoint::{clamp_step, prefix_len, Checkpoints, DEFAULT_STEP};
use crate::exact::distinct_count;
use crate::hash::{HashOracle, GOLDEN_GAMMA};
use crate::hyperloglog::{
    classical_standard_error, clamp_precision, relative_standard_error, HyperLogLog,
};
use crate::stats::{bucket_cv, mean, population_std_dev, relative_error};
use crate::stream::{KeyStream, StreamMode};

/// Odd stride separating per-trial seeds
pub const TRIAL_SEED_STRIDE: u64 = 1_000_003;
/// Number of trailing checkpoints considered by [`TheoryCheck`] by default
pub const DEFAULT_TAIL: usize = 5;

/// Parameters of an evaluation run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationConfig {
    /// Global seed all trial seeds are derived from
    pub seed: u64,
    /// Number of independent trials
    pub trials: usize,
    /// Number of keys in every trial's stream
    pub stream_len: usize,
    /// Checkpoint step fraction in `(0, 1]`
    pub step: f64,
    /// Sketch precision in `[4..18]`
    pub precision: u8,
    /// Stream generation mode
    pub mode: StreamMode,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            trials: 20,
            stream_len: 200_000,
            step: DEFAULT_STEP,
            precision: 14,
            mode: StreamMode::Mixed,
        }
    }
}

impl EvaluationConfig {
    /// Return configuration with step and precision clamped into their valid ranges
    pub fn normalized(mut self) -> Self {
        self.step = clamp_step(self.step);
        self.precision = clamp_precision(self.precision);
        self
    }

    /// Return checkpoints derived from the configured step
    pub fn checkpoints(&self) -> Checkpoints {
        Checkpoints::from_step(self.step)
    }

    /// Return seed of trial `index`
    #[inline]
    pub fn trial_seed(&self, index: usize) -> u64 {
        trial_seed(self.seed, index)
    }
}

/// Seed of trial `index` derived from the global `seed`
#[inline]
pub fn trial_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(TRIAL_SEED_STRIDE.wrapping_mul(index as u64 + 1))
}

/// Hash seed used by a trial seeded with `trial_seed`
#[inline]
pub fn hash_seed(trial_seed: u64) -> u64 {
    trial_seed ^ GOLDEN_GAMMA
}

/// Exact count and estimate observed at one checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckpointSample {
    /// Checkpoint index, 0-based
    pub index: usize,
    /// Processed fraction of the stream
    pub fraction: f64,
    /// Number of keys processed so far
    pub prefix_len: usize,
    /// Exact number of distinct keys in the prefix
    pub true_count: u64,
    /// Sketch estimate after processing the prefix
    pub estimate: f64,
}

impl CheckpointSample {
    /// Signed relative error of the estimate, `0.0` when the prefix has no distinct keys
    #[inline]
    pub fn relative_error(&self) -> f64 {
        relative_error(self.estimate, self.true_count)
    }
}

/// Samples of one finished trial in checkpoint order
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialRecord {
    /// Trial index, 0-based
    pub trial: usize,
    /// Seed the trial's stream was generated with
    pub seed: u64,
    /// One sample per checkpoint
    pub samples: Vec<CheckpointSample>,
}

impl TrialRecord {
    /// Return the full-stream sample
    #[inline]
    pub fn last(&self) -> Option<&CheckpointSample> {
        self.samples.last()
    }
}

/// Lifecycle of a [`Trial`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    Streaming,
    Checkpointed,
    Done,
}

/// One stream/sketch pair advanced checkpoint by checkpoint
pub struct Trial {
    index: usize,
    seed: u64,
    stream: KeyStream,
    oracle: HashOracle,
    sketch: HyperLogLog,
    checkpoints: Checkpoints,
    /// Number of keys already added to the sketch
    processed: usize,
    samples: Vec<CheckpointSample>,
    state: TrialState,
}

impl Trial {
    /// Create trial `index` of `config`, generating its stream
    pub fn new(index: usize, config: &EvaluationConfig) -> Self {
        let seed = config.trial_seed(index);
        let stream = KeyStream::generate(seed, config.stream_len, config.mode);
        Self::with_stream(index, seed, stream, config.precision, config.checkpoints())
    }

    /// Create trial over a caller supplied `stream`
    pub fn with_stream(
        index: usize,
        seed: u64,
        stream: KeyStream,
        precision: u8,
        checkpoints: Checkpoints,
    ) -> Self {
        Self {
            index,
            seed,
            stream,
            oracle: HashOracle::new(hash_seed(seed)),
            sketch: HyperLogLog::new(precision),
            samples: Vec::with_capacity(checkpoints.len()),
            checkpoints,
            processed: 0,
            state: TrialState::Idle,
        }
    }

    /// Return current state
    #[inline]
    pub fn state(&self) -> TrialState {
        self.state
    }

    /// Return whether all checkpoints were recorded
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == TrialState::Done
    }

    /// Return the trial's stream
    #[inline]
    pub fn stream(&self) -> &KeyStream {
        &self.stream
    }

    /// Return the trial's sketch
    #[inline]
    pub fn sketch(&self) -> &HyperLogLog {
        &self.sketch
    }

    /// Return samples recorded so far
    #[inline]
    pub fn samples(&self) -> &[CheckpointSample] {
        &self.samples
    }

    /// Process keys up to the next checkpoint and record its sample.
    ///
    /// Returns `None` once the trial is done.
    pub fn advance(&mut self) -> Option<CheckpointSample> {
        let index = self.samples.len();
        let Some(&fraction) = self.checkpoints.fractions().get(index) else {
            self.state = TrialState::Done;
            return None;
        };

        self.state = TrialState::Streaming;
        let k = prefix_len(fraction, self.stream.len());
        let prefix = self.stream.prefix(k);
        for key in &prefix[self.processed.min(k)..] {
            self.sketch.add(self.oracle.hash_str(key));
        }
        self.processed = self.processed.max(k);

        let sample = CheckpointSample {
            index,
            fraction,
            prefix_len: k,
            true_count: distinct_count(prefix.iter().map(String::as_str)) as u64,
            estimate: self.sketch.estimate(),
        };
        debug!(
            trial = self.index,
            checkpoint = index,
            fraction,
            true_count = sample.true_count,
            estimate = sample.estimate,
            "Recorded checkpoint."
        );
        self.samples.push(sample);

        self.state = if self.samples.len() == self.checkpoints.len() {
            TrialState::Done
        } else {
            TrialState::Checkpointed
        };
        Some(sample)
    }

    /// Advance through all remaining checkpoints and return the trial's record
    pub fn finish(mut self) -> TrialRecord {
        while self.advance().is_some() {}
        if let Some(last) = self.samples.last() {
            info!(
                trial = self.index,
                seed = self.seed,
                true_count = last.true_count,
                estimate = last.estimate,
                relative_error = last.relative_error(),
                "Trial finished."
            );
        }
        TrialRecord {
            trial: self.index,
            seed: self.seed,
            samples: self.samples,
        }
    }
}

/// Cross-trial statistics of one checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateRecord {
    /// Checkpoint index, 0-based
    pub index: usize,
    /// Processed fraction of the stream
    pub fraction: f64,
    /// Mean exact distinct count
    pub mean_true: f64,
    /// Mean estimate
    pub mean_estimate: f64,
    /// Population standard deviation of estimates
    pub std_dev_estimate: f64,
}

impl AggregateRecord {
    /// Empirical relative standard error `std_dev / mean` of the estimates
    #[inline]
    pub fn empirical_rse(&self) -> f64 {
        if self.mean_estimate == 0.0 {
            return 0.0;
        }
        self.std_dev_estimate / self.mean_estimate
    }
}

/// Aggregate `trials` per checkpoint index
pub fn aggregate(trials: &[TrialRecord]) -> Vec<AggregateRecord> {
    let checkpoints = trials.iter().map(|t| t.samples.len()).min().unwrap_or(0);
    (0..checkpoints)
        .map(|i| {
            let true_counts: Vec<f64> = trials
                .iter()
                .map(|t| t.samples[i].true_count as f64)
                .collect();
            let estimates: Vec<f64> = trials.iter().map(|t| t.samples[i].estimate).collect();
            AggregateRecord {
                index: i,
                fraction: trials[0].samples[i].fraction,
                mean_true: mean(&true_counts),
                mean_estimate: mean(&estimates),
                std_dev_estimate: population_std_dev(&estimates),
            }
        })
        .collect()
}

/// Sketch dimensions and theoretical relative standard errors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub precision: u8,
    pub m: usize,
    /// `1.042 / sqrt(m)`
    pub rse_1042: f64,
    /// `1.32 / sqrt(m)`
    pub rse_132: f64,
}

impl Summary {
    /// Summary for `precision`, clamped into the supported range
    pub fn for_precision(precision: u8) -> Self {
        let precision = clamp_precision(precision);
        let m = 1usize << precision;
        Self {
            precision,
            m,
            rse_1042: relative_standard_error(m),
            rse_132: classical_standard_error(m),
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "B={} m={} theo_rse_1={:.6} theo_rse_2={:.6}",
            self.precision, self.m, self.rse_1042, self.rse_132
        )
    }
}

/// Empirical relative standard error of the last checkpoints against the theoretical bounds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TheoryCheck {
    pub summary: Summary,
    /// Number of trailing checkpoints considered
    pub tail: usize,
    pub empirical_rse_mean: f64,
    pub empirical_rse_max: f64,
}

impl TheoryCheck {
    /// Compare the last `tail` aggregate records with the bounds in `summary`
    pub fn new(summary: Summary, aggregates: &[AggregateRecord], tail: usize) -> Self {
        let tail = tail.min(aggregates.len());
        let rse: Vec<f64> = aggregates[aggregates.len() - tail..]
            .iter()
            .map(AggregateRecord::empirical_rse)
            .collect();
        Self {
            summary,
            tail,
            empirical_rse_mean: mean(&rse),
            empirical_rse_max: rse.iter().copied().fold(0.0, f64::max),
        }
    }

    /// Return whether the empirical RSE stays under `factor` times the classical bound
    #[inline]
    pub fn within_classical_bound(&self, factor: f64) -> bool {
        self.empirical_rse_max <= factor * self.summary.rse_132
    }
}

impl std::fmt::Display for TheoryCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "empirical_rse_mean_last{}={:.6} empirical_rse_max_last{}={:.6}",
            self.tail, self.empirical_rse_mean, self.tail, self.empirical_rse_max
        )
    }
}

/// Finished evaluation: trial records and their per-checkpoint aggregates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    config: EvaluationConfig,
    checkpoints: Checkpoints,
    trials: Vec<TrialRecord>,
    aggregates: Vec<AggregateRecord>,
}

impl Evaluation {
    /// Run all trials of `config` in parallel and aggregate them
    pub fn run(config: EvaluationConfig) -> Self {
        let config = config.normalized();
        let trials = (0..config.trials)
            .into_par_iter()
            .map(|i| Trial::new(i, &config).finish())
            .collect();
        Self::from_trials(config, trials)
    }

    /// Run all trials of `config` on the calling thread and aggregate them
    pub fn run_sequential(config: EvaluationConfig) -> Self {
        let config = config.normalized();
        let trials = (0..config.trials)
            .map(|i| Trial::new(i, &config).finish())
            .collect();
        Self::from_trials(config, trials)
    }

    /// Aggregate already finished `trials`
    pub fn from_trials(config: EvaluationConfig, trials: Vec<TrialRecord>) -> Self {
        let config = config.normalized();
        let aggregates = aggregate(&trials);
        info!(
            trials = trials.len(),
            checkpoints = aggregates.len(),
            "Aggregated evaluation."
        );
        Self {
            checkpoints: config.checkpoints(),
            config,
            trials,
            aggregates,
        }
    }

    /// Return effective (normalized) configuration
    #[inline]
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Return checkpoints every trial was sampled at
    #[inline]
    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    /// Return trial records in trial order
    #[inline]
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Return per-checkpoint aggregates
    #[inline]
    pub fn aggregates(&self) -> &[AggregateRecord] {
        &self.aggregates
    }

    /// Return sketch dimensions and theoretical bounds
    #[inline]
    pub fn summary(&self) -> Summary {
        Summary::for_precision(self.config.precision)
    }

    /// Compare the last `tail` checkpoints with the theoretical bounds
    #[inline]
    pub fn theory_check(&self, tail: usize) -> TheoryCheck {
        TheoryCheck::new(self.summary(), &self.aggregates, tail)
    }
}

/// Number of `keys` hashed into every register index for `precision`
pub fn register_loads<'a, I>(keys: I, oracle: &HashOracle, precision: u8) -> Vec<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let sketch = HyperLogLog::new(precision);
    let mut loads = vec![0u32; sketch.m()];
    for key in keys {
        let (idx, _) = sketch.decode_hash(oracle.hash_str(key));
        loads[idx] += 1;
    }
    loads
}

/// Coefficient of variation of register loads, a uniformity check of the hash for `precision`
pub fn register_load_cv<'a, I>(keys: I, oracle: &HashOracle, precision: u8) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    bucket_cv(&register_loads(keys, oracle, precision))
}
