//! ## Checkpoints
//! Fractions of a stream at which exact and estimated counts are compared.
//!
//! Checkpoints are `s, 2s, 3s, ...` for a step `s` in `(0, 1]`, clamped at `1.0`.
//! The sequence is strictly increasing and always ends at exactly `1.0`, so every
//! trial reports a full-stream estimate.

/// Step used when the configured step is not positive
pub const DEFAULT_STEP: f64 = 0.05;
/// Tolerance for treating an accumulated fraction as the end of the stream
const EPSILON: f64 = 1e-12;

/// Ordered checkpoint fractions in `(0, 1]`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoints {
    step: f64,
    fractions: Vec<f64>,
}

impl Checkpoints {
    /// Derive checkpoints from `step`, clamping it into `(0, 1]` first
    pub fn from_step(step: f64) -> Self {
        let step = clamp_step(step);
        let mut fractions = Vec::new();
        for k in 1u32.. {
            let fraction = f64::from(k) * step;
            if fraction >= 1.0 - EPSILON {
                break;
            }
            fractions.push(fraction);
        }
        fractions.push(1.0);
        Self { step, fractions }
    }

    /// Return effective (clamped) step
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Return checkpoint fractions
    #[inline]
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// Return number of checkpoints
    #[inline]
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    /// Checkpoint sets always hold at least the final `1.0` checkpoint
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    /// Return prefix lengths of a stream with `stream_len` keys for every checkpoint
    pub fn prefix_lens(&self, stream_len: usize) -> Vec<usize> {
        self.fractions
            .iter()
            .map(|&f| prefix_len(f, stream_len))
            .collect()
    }
}

impl Default for Checkpoints {
    fn default() -> Self {
        Self::from_step(DEFAULT_STEP)
    }
}

/// Clamp `step` into `(0, 1]`; non-positive or non-finite steps fall back to [`DEFAULT_STEP`]
#[inline]
pub fn clamp_step(step: f64) -> f64 {
    if step.is_nan() || step <= 0.0 {
        DEFAULT_STEP
    } else {
        step.min(1.0)
    }
}

/// Number of keys covered by `fraction` of a stream with `stream_len` keys
#[inline]
pub fn prefix_len(fraction: f64, stream_len: usize) -> usize {
    let fraction = fraction.clamp(0.0, 1.0);
    ((fraction * stream_len as f64).floor() as usize).min(stream_len)
}
