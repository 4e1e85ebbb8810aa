//! `cardinality-harness` estimates the number of distinct keys in a stream with a fixed-memory
//! HyperLogLog sketch and measures how accurate that estimate is.
//!
//! The evaluation harness feeds synthetic key streams through the sketch at checkpointed
//! prefixes, compares every estimate with an exact distinct count, and aggregates error
//! statistics over independent trials against the theoretical `1.042 / sqrt(m)` and
//! `1.32 / sqrt(m)` relative standard errors.
//!
//! ```
//! use cardinality_harness::{HashOracle, HyperLogLog};
//!
//! let oracle = HashOracle::new(42);
//! let mut sketch = HyperLogLog::new(12);
//! for i in 0..10_000 {
//!     sketch.add(oracle.hash_str(&format!("key{}", i)));
//! }
//! let error = (sketch.estimate() - 10_000.0).abs() / 10_000.0;
//! assert!(error < 0.1);
//! ```
pub mod checkpoint;
pub mod exact;
pub mod harness;
pub mod hash;
pub mod hyperloglog;
pub mod report;
#[cfg(feature = "with_serde")]
mod serde;
pub mod stats;
pub mod stream;

pub use checkpoint::Checkpoints;
pub use exact::distinct_count;
pub use harness::{
    AggregateRecord, CheckpointSample, Evaluation, EvaluationConfig, Summary, TheoryCheck, Trial,
    TrialRecord, TrialState,
};
pub use hash::HashOracle;
pub use hyperloglog::HyperLogLog;
pub use stream::{KeyStream, StreamMode};
