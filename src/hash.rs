//! ## Hash oracle
//! Maps arbitrary byte-string keys to well-distributed `u32` values for a given seed.
//!
//! The key bytes are first folded with 64-bit FNV-1a, then the result is xor-ed with
//! the seed and passed through the SplitMix64 finalizer, which provides the avalanche
//! the sketch relies on. The low 32 bits of the finalized value are returned.
//!
//! The function is pure with respect to `(seed, key)` and uses only wrapping integer
//! arithmetic, so outputs are identical across runs and platforms.

/// FNV-1a 64-bit offset basis
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a 64-bit prime
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// SplitMix64 increment (golden ratio), also used to decorrelate per-trial hash seeds.
pub const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seeded hash function producing 32-bit register inputs for the sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HashOracle {
    seed: u64,
}

impl HashOracle {
    /// Creates new hash oracle for given `seed`
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Return seed of this hash oracle
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Hash `key` into a 32-bit value
    #[inline]
    pub fn hash(&self, key: &[u8]) -> u32 {
        let mixed = splitmix64(fnv1a64(key) ^ self.seed);
        (mixed & 0xffff_ffff) as u32
    }

    /// Hash string `key` into a 32-bit value
    #[inline]
    pub fn hash_str(&self, key: &str) -> u32 {
        self.hash(key.as_bytes())
    }
}

/// 64-bit FNV-1a over `bytes`
#[inline]
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |h, &b| {
        (h ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// SplitMix64 finalizer
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN_GAMMA);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    // Reference values of the FNV-1a 64 test suite.
    #[test_case(b"" => 0xcbf2_9ce4_8422_2325; "empty")]
    #[test_case(b"a" => 0xaf63_dc4c_8601_ec8c; "single byte")]
    #[test_case(b"foobar" => 0x8594_4171_f739_67e8; "foobar")]
    fn test_fnv1a64(input: &[u8]) -> u64 {
        fnv1a64(input)
    }

    #[test]
    fn test_splitmix64_zero() {
        // First output of the SplitMix64 generator seeded with 0.
        assert_eq!(splitmix64(0), 0xe220_a839_7b1d_cdaf);
    }

    #[test]
    fn test_deterministic() {
        let a = HashOracle::new(777);
        let b = HashOracle::new(777);
        for key in ["", "user000042", "hot-17", "Zq-9"] {
            assert_eq!(a.hash_str(key), b.hash_str(key));
        }
    }

    #[test]
    fn test_seed_changes_output() {
        let a = HashOracle::new(1);
        let b = HashOracle::new(2);
        let differing = (0..100)
            .filter(|i| {
                let key = format!("key{}", i);
                a.hash_str(&key) != b.hash_str(&key)
            })
            .count();
        assert!(differing >= 99);
    }

    #[test]
    fn test_avalanche() {
        // Flipping one input bit should flip roughly half of the output bits on average.
        let oracle = HashOracle::new(123);
        let mut total_flipped = 0u32;
        let mut samples = 0u32;
        for i in 0u32..256 {
            let key = i.to_le_bytes();
            let h = oracle.hash(&key);
            for bit in 0..32 {
                let flipped = (i ^ (1 << bit)).to_le_bytes();
                total_flipped += (h ^ oracle.hash(&flipped)).count_ones();
                samples += 1;
            }
        }
        let avg = f64::from(total_flipped) / f64::from(samples);
        assert!((14.0..18.0).contains(&avg), "average flipped bits = {}", avg);
    }
}
