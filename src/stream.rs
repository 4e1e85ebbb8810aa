//! ## Synthetic key streams
//! Finite, ordered sequences of string keys generated once per trial.
//!
//! Keys are drawn from the alphabet `a-z A-Z 0-9 -` and are at most 30 characters long.
//! Two generation modes are supported:
//! - `Uniform`: every key is a random string with length uniform in `[1..30]`.
//! - `Mixed`: 70% random strings, 20% dictionary-like keys (`user000042`, `item...`,
//!   `sess...`) and 10% skewed "hot" keys drawn from 128 buckets (`hot-17`).
//!
//! The random generator is owned by a single [`KeyStream::generate`] call and is
//! never shared, so streams built for different trials are independent and
//! reproducible from their seed alone.

use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Index;
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::checkpoint::{prefix_len, Checkpoints};

/// Symbols allowed in generated keys
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";
/// Maximum key length
const MAX_KEY_LEN: usize = 30;
/// Number of distinct hot keys in mixed mode
const HOT_BUCKETS: usize = 128;
/// Prefixes of dictionary-like keys
const DICT_PREFIXES: [&str; 3] = ["user", "item", "sess"];
/// Upper bound (inclusive) of dictionary-like key ids
const DICT_MAX_ID: u32 = 999_999;
/// Share of random strings in mixed mode
const MIXED_RANDOM_SHARE: f64 = 0.70;
/// Cumulative share of random and dictionary-like keys in mixed mode
const MIXED_DICT_SHARE: f64 = 0.90;

/// Stream generation mode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "lowercase"))]
pub enum StreamMode {
    Uniform,
    #[default]
    Mixed,
}

impl StreamMode {
    /// Parse a mode selector; anything other than `uniform` selects `Mixed`
    pub fn from_selector(selector: &str) -> Self {
        if selector.eq_ignore_ascii_case("uniform") {
            StreamMode::Uniform
        } else {
            StreamMode::Mixed
        }
    }
}

impl FromStr for StreamMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_selector(s))
    }
}

impl Display for StreamMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamMode::Uniform => f.write_str("uniform"),
            StreamMode::Mixed => f.write_str("mixed"),
        }
    }
}

/// Key generation policies supported by `KeyStream`
#[enum_dispatch]
pub(crate) enum KeyGenerator {
    Uniform(UniformKeys),
    Mixed(MixedKeys),
}

/// Key generation trait which must be implemented by all generation policies.
#[enum_dispatch(KeyGenerator)]
pub(crate) trait KeySource {
    fn next_key(&mut self, rng: &mut StdRng) -> String;
}

impl From<StreamMode> for KeyGenerator {
    fn from(mode: StreamMode) -> Self {
        match mode {
            StreamMode::Uniform => UniformKeys.into(),
            StreamMode::Mixed => MixedKeys.into(),
        }
    }
}

/// Random strings only
pub(crate) struct UniformKeys;

impl KeySource for UniformKeys {
    #[inline]
    fn next_key(&mut self, rng: &mut StdRng) -> String {
        random_string(rng)
    }
}

/// Random strings mixed with dictionary-like and hot keys
pub(crate) struct MixedKeys;

impl KeySource for MixedKeys {
    #[inline]
    fn next_key(&mut self, rng: &mut StdRng) -> String {
        let p: f64 = rng.gen();
        if p < MIXED_RANDOM_SHARE {
            random_string(rng)
        } else if p < MIXED_DICT_SHARE {
            dict_like_key(rng)
        } else {
            hot_key(rng.gen_range(0..HOT_BUCKETS))
        }
    }
}

/// Immutable, ordered sequence of string keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyStream {
    keys: Vec<String>,
}

impl KeyStream {
    /// Generate stream of `len` keys using `mode`, seeded with `seed`
    pub fn generate(seed: u64, len: usize, mode: StreamMode) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = KeyGenerator::from(mode);
        let keys = (0..len).map(|_| generator.next_key(&mut rng)).collect();
        Self { keys }
    }

    /// Create stream from caller supplied keys
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Return number of keys in the stream
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Return whether the stream has no keys
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Return key at position `i`
    #[inline]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.keys.get(i).map(String::as_str)
    }

    /// Iterate over keys in stream order
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    /// Return first `k` keys (or the whole stream if shorter)
    #[inline]
    pub fn prefix(&self, k: usize) -> &[String] {
        &self.keys[..k.min(self.keys.len())]
    }

    /// Return keys covered by `fraction` of the stream, `fraction` is clamped into `[0, 1]`
    #[inline]
    pub fn prefix_by_fraction(&self, fraction: f64) -> &[String] {
        self.prefix(prefix_len(fraction, self.len()))
    }

    /// Return strictly increasing prefix lengths for checkpoints every `step` of the stream.
    ///
    /// The last length is always the full stream length. Non-positive steps yield no splits.
    pub fn split_indices_by_fraction(&self, step: f64) -> Vec<usize> {
        if step.is_nan() || step <= 0.0 {
            return Vec::new();
        }
        let mut indices = Checkpoints::from_step(step).prefix_lens(self.len());
        indices.dedup();
        indices
    }
}

impl Index<usize> for KeyStream {
    type Output = str;

    #[inline]
    fn index(&self, i: usize) -> &str {
        &self.keys[i]
    }
}

/// Replace characters outside of the alphabet with `-` and truncate to `MAX_KEY_LEN`
fn sanitize(key: &str) -> String {
    key.chars()
        .take(MAX_KEY_LEN)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// Random string of alphabet symbols with length uniform in `[1..MAX_KEY_LEN]`
fn random_string(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..=MAX_KEY_LEN);
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

/// Dictionary-like key such as `user000042`
fn dict_like_key(rng: &mut StdRng) -> String {
    let prefix = DICT_PREFIXES[rng.gen_range(0..DICT_PREFIXES.len())];
    let id = rng.gen_range(0..=DICT_MAX_ID);
    sanitize(&format!("{}{:06}", prefix, id))
}

/// Hot key for `bucket`
fn hot_key(bucket: usize) -> String {
    sanitize(&format!("hot-{}", bucket))
}
