//! ## Exact cardinality oracle
//! Computes the true number of distinct keys in a finite sequence. Used as ground truth only.

use std::hash::{BuildHasherDefault, Hash};

use hashbrown::HashSet;
use wyhash::WyHash;

/// Return number of distinct keys yielded by `keys`
#[inline]
pub fn distinct_count<I, K>(keys: I) -> usize
where
    I: IntoIterator<Item = K>,
    K: Hash + Eq,
{
    let keys = keys.into_iter();
    let mut seen: HashSet<K, BuildHasherDefault<WyHash>> =
        HashSet::with_capacity_and_hasher(keys.size_hint().0, BuildHasherDefault::default());
    seen.extend(keys);
    seen.len()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[] => 0; "empty")]
    #[test_case(&["a"] => 1; "single key")]
    #[test_case(&["a", "a", "a"] => 1; "repeated key")]
    #[test_case(&["a", "b", "a", "c", "b"] => 3; "mixed duplicates")]
    #[test_case(&["hot-1", "Hot-1", "hot-1 "] => 3; "case and whitespace are distinct")]
    fn test_distinct_count(keys: &[&str]) -> usize {
        distinct_count(keys.iter())
    }

    #[test]
    fn test_distinct_count_owned() {
        let keys: Vec<String> = (0..1000).map(|i| format!("item{}", i % 250)).collect();
        assert_eq!(distinct_count(keys.iter().map(String::as_str)), 250);
        assert_eq!(distinct_count(keys), 250);
    }
}
