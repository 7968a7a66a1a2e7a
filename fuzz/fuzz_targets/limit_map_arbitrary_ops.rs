#![no_main]

use libfuzzer_sys::fuzz_target;
use limitmap::builder::LimitMapBuilder;
use limitmap::policy::random::OnExhausted;

// Fuzz arbitrary operation sequences on LimitMap
//
// Header bytes pick capacity, growth, probe budget and exhaustion mode; the
// rest drives set, get, remove, random_one, randoms and clear.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let capacity = (data[0] as usize % 32).max(1);
    let growable = data[1] & 1 == 1;
    let on_exhausted = if data[1] & 2 == 2 {
        OnExhausted::Reject
    } else {
        OnExhausted::ForceAccept
    };
    let cover_max_try = (data[2] as usize % 8).max(1);

    let mut builder = LimitMapBuilder::new(capacity)
        .cover_max_try(cover_max_try)
        .on_exhausted(on_exhausted)
        .cover_rule(|v: &u32| v % 3 != 0)
        .select_rule(|v: &u32| v % 2 == 0)
        .seed(u64::from(data[3]));
    if growable {
        builder = builder.max_capacity(capacity * 4);
    }
    let mut map = builder.build::<u8>();

    let mut idx = 4;
    while idx + 2 < data.len() {
        let op = data[idx] % 6;
        let key = data[idx + 1];
        let value = u32::from(data[idx + 2]);

        match op {
            0 => {
                if map.set(key, value).is_ok() {
                    assert_eq!(map.peek(&key), Some(&value));
                } else {
                    assert_eq!(on_exhausted, OnExhausted::Reject);
                    assert!(!map.contains(&key));
                }
            }
            1 => {
                assert_eq!(map.get(&key).is_some(), map.contains(&key));
            }
            2 => {
                let before = map.len();
                if map.remove(&key).is_some() {
                    assert_eq!(map.len(), before - 1);
                }
                assert!(!map.contains(&key));
            }
            3 => {
                assert_eq!(map.random_one().is_some(), !map.is_empty());
            }
            4 => {
                let limit = usize::from(key % 16);
                let len = map.len();
                let picks = map.randoms(limit, usize::from(data[idx + 2] % 32));
                assert_eq!(picks.len(), limit.min(len));
            }
            5 => {
                if key == 0 {
                    map.clear();
                    assert!(map.is_empty());
                }
            }
            _ => unreachable!(),
        }

        assert!(map.len() <= map.capacity());
        if let Some(ceiling) = map.max_capacity() {
            assert!(map.capacity() <= ceiling);
        }
        assert!(map.check_invariants().is_ok());

        idx += 3;
    }
});
