#![no_main]

use cardinality_harness::HyperLogLog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut hll) = serde_json::from_slice::<HyperLogLog>(data) {
        assert_eq!(hll.m(), 1 << hll.precision());
        hll.add(1);
        assert!(hll.registers().iter().all(|&r| r <= hll.max_rank()));
        assert!(hll.estimate() > 0.0);
    }
});
