//! ## HyperLogLog sketch
//! Estimates cardinality of a stream of 32-bit hashes using `M = 2^B` registers.
//!
//! [Original HyperLogLog paper](https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//!
//! Hash layout for precision `B`:
//! - bits 31..(32 - B)  - register index (top `B` bits)
//! - bits (31 - B)..0   - tail used for rank computation (`32 - B` bits)
//!
//! Rank of a hash is `1 + leading zeros of the tail`, counted within the `32 - B` bit
//! field and capped at `32 - B + 1` when the tail is zero. Each register keeps the
//! maximum rank it has observed, so registers never decrease.
//!
//! The estimate is the classical harmonic mean estimator `alpha(M) * M^2 / sum(2^-reg)`
//! without small-range or large-range corrections.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

/// Minimum supported precision
pub const MIN_PRECISION: u8 = 4;
/// Maximum supported precision
pub const MAX_PRECISION: u8 = 18;

/// HyperLogLog sketch with runtime precision in `[MIN_PRECISION..MAX_PRECISION]` range.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(try_from = "crate::serde::RawHyperLogLog"))]
pub struct HyperLogLog {
    /// Number of bits used for register indices
    pub(crate) precision: u8,
    /// Register ranks, exactly `2^precision` entries
    pub(crate) registers: Vec<u8>,
}

impl HyperLogLog {
    /// Creates new empty `HyperLogLog` with given `precision`.
    ///
    /// Out of range precision is clamped into `[MIN_PRECISION..MAX_PRECISION]`,
    /// the effective value is available via [`HyperLogLog::precision`].
    #[inline]
    pub fn new(precision: u8) -> Self {
        let precision = clamp_precision(precision);
        Self {
            precision,
            registers: vec![0u8; 1 << precision],
        }
    }

    /// Return effective (clamped) precision
    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Return number of registers
    #[inline]
    pub fn m(&self) -> usize {
        self.registers.len()
    }

    /// Return register ranks
    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Return maximum rank a register may hold for this precision
    #[inline]
    pub fn max_rank(&self) -> u8 {
        32 - self.precision + 1
    }

    /// Return whether no hash has been added yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Return number of registers which are still zero
    #[inline]
    pub fn zero_registers(&self) -> usize {
        self.registers.iter().filter(|&&r| r == 0).count()
    }

    /// Return register index and rank of hashed value `h`
    #[inline]
    pub fn decode_hash(&self, h: u32) -> (usize, u8) {
        let width = 32 - u32::from(self.precision);
        let idx = (h >> width) as usize;
        let tail = h << self.precision;
        (idx, rank(tail, width))
    }

    /// Add hashed value into `HyperLogLog`
    #[inline]
    pub fn add(&mut self, h: u32) {
        let (idx, new_rank) = self.decode_hash(h);
        // SAFETY: `idx` has at most `precision` bits, so it is below `registers.len()`.
        let register = unsafe { self.registers.get_unchecked_mut(idx) };
        if new_rank > *register {
            *register = new_rank;
        }
    }

    /// Return cardinality estimate
    #[inline]
    pub fn estimate(&self) -> f64 {
        let m = self.m();
        let sum: f64 = self
            .registers
            .iter()
            .map(|&r| 1.0 / ((1u64 << r) as f64))
            .sum();
        alpha(m) * (m as f64) * (m as f64) / sum
    }

    /// Return memory size of `HyperLogLog`
    #[inline]
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.registers.as_slice())
    }
}

impl Debug for HyperLogLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {:.0}, size: {} }}",
            self.precision,
            self.estimate(),
            self.size_of()
        )
    }
}

/// Clamp `precision` into `[MIN_PRECISION..MAX_PRECISION]` range
#[inline]
pub fn clamp_precision(precision: u8) -> u8 {
    precision.clamp(MIN_PRECISION, MAX_PRECISION)
}

/// Rank of a left-aligned `tail` holding `width` significant bits:
/// one plus the number of leading zeros within those bits, capped at `width + 1`.
#[inline]
pub fn rank(tail: u32, width: u32) -> u8 {
    (tail.leading_zeros().min(width) + 1) as u8
}

/// Parameter for bias correction
#[inline]
pub fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

/// Asymptotic relative standard error `1.042 / sqrt(m)`
#[inline]
pub fn relative_standard_error(m: usize) -> f64 {
    1.042 / (m as f64).sqrt()
}

/// Classical (looser) relative standard error bound `1.32 / sqrt(m)`
#[inline]
pub fn classical_standard_error(m: usize) -> f64 {
    1.32 / (m as f64).sqrt()
}
