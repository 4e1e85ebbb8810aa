#![no_main]

use cardinality_harness::{HashOracle, HyperLogLog};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = data[0];
    let oracle = HashOracle::new(wyhash(data, 0));
    let mut hll = HyperLogLog::new(precision);
    let mut previous = hll.registers().to_vec();

    for chunk in data[1..].chunks(4) {
        hll.add(oracle.hash(chunk));
        assert!(hll
            .registers()
            .iter()
            .zip(&previous)
            .all(|(now, before)| now >= before && *now <= hll.max_rank()));
        previous.copy_from_slice(hll.registers());

        let estimate = hll.estimate();
        assert!(estimate.is_finite() && estimate > 0.0);
        assert_eq!(estimate.to_bits(), hll.estimate().to_bits());
    }
});
