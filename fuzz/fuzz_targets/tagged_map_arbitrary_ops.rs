#![no_main]

use libfuzzer_sys::fuzz_target;
use limitmap::builder::LimitMapBuilder;

// Fuzz arbitrary operation sequences on TaggedLimitMap
//
// Every step re-checks that the slot array, key index and classification
// index agree, which exercises the two-level swap-with-last bookkeeping.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let capacity = (data[0] as usize % 24).max(1);
    let mut builder = LimitMapBuilder::new(capacity).seed(u64::from(data[2]));
    if data[1] & 1 == 1 {
        builder = builder.growable(true);
    }
    let mut map = builder.build_tagged::<u8, u8, u8>();

    let mut idx = 3;
    while idx + 3 < data.len() {
        let op = data[idx] % 5;
        let key = data[idx + 1];
        let dim_a = data[idx + 2] % 4;
        let dim_b = data[idx + 3] % 3;

        match op {
            0 | 1 => {
                let existed = map.contains(&key);
                map.set(key, u16::from(key), dim_a, dim_b)
                    .expect("force-accept never rejects");
                if !existed {
                    assert_eq!(map.class_of(&key), Some((&dim_a, &dim_b)));
                }
            }
            2 => {
                map.remove(&key);
                assert!(map.class_of(&key).is_none());
            }
            3 => {
                let present = map.contains(&key);
                assert_eq!(map.retag(&key, dim_a, dim_b), present);
            }
            4 => {
                let n = usize::from(dim_a) * 3;
                let len = map.len();
                match map.sample(&key, n) {
                    Some(picks) => assert_eq!(picks.len(), n.min(len)),
                    None => assert!(!map.contains(&key)),
                }
            }
            _ => unreachable!(),
        }

        assert!(map.check_invariants().is_ok());
        idx += 4;
    }
});
