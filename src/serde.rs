//! # Serde support
//!
//! With the `with_serde` feature enabled, the sketch, the evaluation configuration and all
//! evaluation records derive `serde`'s `Serialize` and `Deserialize`, so results can be
//! stored or handed to external tooling for plotting.
//!
//! `HyperLogLog` serializes as its precision plus the raw register array. Deserialized
//! sketches are accepted only when the precision is in range, the register array length
//! matches it, and no register exceeds the maximum rank.

use std::fmt::{Display, Formatter};

use ::serde::Deserialize;

use crate::hyperloglog::{HyperLogLog, MAX_PRECISION, MIN_PRECISION};

/// Unvalidated sketch fields as read from a serialized form
#[derive(Deserialize)]
pub(crate) struct RawHyperLogLog {
    precision: u8,
    registers: Vec<u8>,
}

/// Serialized sketch error
#[derive(Debug, PartialEq)]
pub enum SketchError {
    InvalidPrecision(u8),
    InvalidRegisterCount(usize),
    InvalidRank(u8),
}

impl Display for SketchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SketchError::InvalidPrecision(p) => write!(f, "precision {} is out of bounds", p),
            SketchError::InvalidRegisterCount(n) => {
                write!(f, "register count {} does not match precision", n)
            }
            SketchError::InvalidRank(r) => write!(f, "register rank {} is out of bounds", r),
        }
    }
}

impl TryFrom<RawHyperLogLog> for HyperLogLog {
    type Error = SketchError;

    fn try_from(raw: RawHyperLogLog) -> Result<Self, Self::Error> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&raw.precision) {
            return Err(SketchError::InvalidPrecision(raw.precision));
        }
        if raw.registers.len() != 1 << raw.precision {
            return Err(SketchError::InvalidRegisterCount(raw.registers.len()));
        }
        let max_rank = 32 - raw.precision + 1;
        if let Some(&rank) = raw.registers.iter().find(|&&r| r > max_rank) {
            return Err(SketchError::InvalidRank(rank));
        }
        Ok(HyperLogLog {
            precision: raw.precision,
            registers: raw.registers,
        })
    }
}
