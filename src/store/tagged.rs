//! Limit map with a two-level classification index and stratified sampling.
//!
//! Every entry carries a class tag `(dim_a, dim_b)`. The tags are kept in a
//! [`ClassIndex`] keyed by slot number, so the index must follow every slot
//! movement of the underlying [`LimitMap`]:
//!
//! ```text
//!   set (append)      slot s          → classes.insert(s, a, b)
//!   set (evict)       victim slot s   → classes.remove(s); classes.insert(s, a, b)
//!   remove            slot s, last l  → classes.remove(s); classes.relocate(l, s)
//! ```
//!
//! [`sample`](TaggedLimitMap::sample) draws from the key's own class first and
//! tops up from the whole population (see [`policy::sample::stratified`]).
//!
//! [`policy::sample::stratified`]: crate::policy::sample::stratified
//!
//! ## Example Usage
//!
//! ```
//! use limitmap::store::tagged::TaggedLimitMap;
//!
//! let mut peers: TaggedLimitMap<u32, String, &str, &str> = TaggedLimitMap::new(16);
//! peers.set(1, "n1".into(), "eu", "west").unwrap();
//! peers.set(2, "n2".into(), "eu", "west").unwrap();
//! peers.set(3, "n3".into(), "us", "east").unwrap();
//!
//! // (eu, west) holds two entries, enough to satisfy the request alone
//! let near = peers.sample(&1, 2).unwrap();
//! assert_eq!(near.len(), 2);
//! assert!(near.iter().all(|v| *v == "n1" || *v == "n2"));
//! ```

use std::fmt;
use std::hash::Hash;

use rand::Rng;

use crate::builder::LimitMapConfig;
use crate::ds::class_index::ClassIndex;
use crate::ds::slot_store::SlotStore;
use crate::error::{ConfigError, InvariantError};
use crate::policy::sample;
use crate::store::limit::{LimitMap, Placement};
use crate::store::traits::{SetOutcome, StoreFull, StoreMetrics};
use crate::traits::{CoverRule, SelectRule};

/// [`LimitMap`] whose entries are classified by `(A, B)`.
pub struct TaggedLimitMap<K, V, A, B> {
    map: LimitMap<K, V>,
    classes: ClassIndex<A, B>,
}

impl<K, V, A, B> TaggedLimitMap<K, V, A, B>
where
    K: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    /// Creates a fixed-capacity tagged map.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::from_map(LimitMap::new(capacity))
    }

    /// Creates a tagged map that doubles its slots instead of evicting.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_growth(capacity: usize) -> Self {
        Self::from_map(LimitMap::with_growth(capacity))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize, growable: bool) -> Result<Self, ConfigError> {
        LimitMap::try_new(capacity, growable).map(Self::from_map)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: LimitMapConfig) -> Result<Self, ConfigError> {
        LimitMap::from_config(config).map(Self::from_map)
    }

    /// Wraps an empty map.
    pub(crate) fn from_map(map: LimitMap<K, V>) -> Self {
        debug_assert!(map.is_empty(), "tagged map built over a populated map");
        let classes = ClassIndex::with_capacity(map.capacity());
        Self { map, classes }
    }

    pub fn set_cover_rule(&mut self, rule: impl CoverRule<V> + 'static) {
        self.map.set_cover_rule(rule);
    }

    pub fn set_select_rule(&mut self, rule: impl SelectRule<V> + 'static) {
        self.map.set_select_rule(rule);
    }

    pub fn set_cover_max_try(&mut self, max_tries: usize) {
        self.map.set_cover_max_try(max_tries);
    }

    #[inline]
    pub fn cover_max_try(&self) -> usize {
        self.map.cover_max_try()
    }

    /// Inserts or replaces `key` under class `(dim_a, dim_b)`.
    ///
    /// Replacing an existing key changes only its value; its class stays as
    /// it was (use [`retag`](Self::retag) to move it).
    ///
    /// # Errors
    ///
    /// Returns [`StoreFull`] when the map rejects the new key.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        dim_a: A,
        dim_b: B,
    ) -> Result<SetOutcome<K, V>, StoreFull> {
        Ok(match self.map.place(key, value)? {
            Placement::Updated(previous) => SetOutcome::Updated(previous),
            Placement::Appended(slot) => {
                self.classes.insert(slot, dim_a, dim_b);
                SetOutcome::Inserted
            },
            Placement::Replaced { slot, key, value } => {
                self.classes.remove(slot);
                self.classes.insert(slot, dim_a, dim_b);
                SetOutcome::Evicted { key, value }
            },
        })
    }

    /// Moves `key` to class `(dim_a, dim_b)`. Returns `false` if absent.
    pub fn retag(&mut self, key: &K, dim_a: A, dim_b: B) -> bool {
        let Some(slot) = self.map.store().slot_of(key) else {
            return false;
        };
        self.classes.remove(slot);
        self.classes.insert(slot, dim_a, dim_b);
        true
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.peek(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains(key)
    }

    /// Removes `key` and its classification.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.map.remove_entry(key)?;
        self.classes.remove(removed.slot);
        if let Some(from) = removed.moved_from {
            self.classes.relocate(from, removed.slot);
        }
        Some(removed.value)
    }

    /// Class tag of `key`.
    pub fn class_of(&self, key: &K) -> Option<(&A, &B)> {
        let slot = self.map.store().slot_of(key)?;
        self.classes.class_of(slot)
    }

    /// Number of entries tagged `(dim_a, dim_b)`.
    #[inline]
    pub fn class_len(&self, dim_a: &A, dim_b: &B) -> usize {
        self.classes.class_len(dim_a, dim_b)
    }

    /// Every non-empty class with its member count.
    pub fn classes(&self) -> impl Iterator<Item = (&A, &B, usize)> {
        self.classes
            .classes()
            .map(|(dim_a, dim_b, slots)| (dim_a, dim_b, slots.len()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    #[inline]
    pub fn max_capacity(&self) -> Option<usize> {
        self.map.max_capacity()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.map.is_full()
    }

    pub fn keys(&self) -> Vec<K> {
        self.map.keys()
    }

    pub fn values(&self) -> Vec<&V> {
        self.map.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }

    pub fn random_one(&mut self) -> Option<&V> {
        self.map.random_one()
    }

    pub fn random_one_with<R: Rng>(&self, rng: &mut R) -> Option<&V> {
        self.map.random_one_with(rng)
    }

    pub fn randoms(&mut self, limit: usize, max_try: usize) -> Vec<&V> {
        self.map.randoms(limit, max_try)
    }

    pub fn randoms_with<R: Rng>(&self, rng: &mut R, limit: usize, max_try: usize) -> Vec<&V> {
        self.map.randoms_with(rng, limit, max_try)
    }

    /// Draws `n` distinct values, preferring `key`'s class.
    ///
    /// Up to `n` members of the class are taken in random order (the entry
    /// for `key` itself included); any shortfall is filled from the rest of
    /// the map. Fewer than `n` values come back only when the map holds
    /// fewer than `n` entries. Returns `None` if `key` is absent.
    pub fn sample(&mut self, key: &K, n: usize) -> Option<Vec<&V>> {
        let (store, rng) = self.map.store_and_rng();
        let slot = store.slot_of(key)?;
        let (dim_a, dim_b) = self.classes.class_of(slot)?;
        let class = self.classes.bucket(dim_a, dim_b);
        Some(values_at(store, sample::stratified(rng, class, store.len(), n)))
    }

    /// [`sample`](Self::sample) drawing from a caller-owned RNG.
    pub fn sample_with<R: Rng>(&self, rng: &mut R, key: &K, n: usize) -> Option<Vec<&V>> {
        let store = self.map.store();
        let slot = store.slot_of(key)?;
        let (dim_a, dim_b) = self.classes.class_of(slot)?;
        let class = self.classes.bucket(dim_a, dim_b);
        Some(values_at(store, sample::stratified(rng, class, store.len(), n)))
    }

    /// Draws `n` distinct values preferring class `(dim_a, dim_b)`.
    ///
    /// An unknown class contributes nothing and the whole draw comes from
    /// the population.
    pub fn sample_class(&mut self, dim_a: &A, dim_b: &B, n: usize) -> Vec<&V> {
        let (store, rng) = self.map.store_and_rng();
        let class = self.classes.bucket(dim_a, dim_b);
        values_at(store, sample::stratified(rng, class, store.len(), n))
    }

    pub fn sample_class_with<R: Rng>(
        &self,
        rng: &mut R,
        dim_a: &A,
        dim_b: &B,
        n: usize,
    ) -> Vec<&V> {
        let store = self.map.store();
        let class = self.classes.bucket(dim_a, dim_b);
        values_at(store, sample::stratified(rng, class, store.len(), n))
    }

    /// Removes every entry and classification.
    pub fn clear(&mut self) {
        self.map.clear();
        self.classes.clear();
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.map.metrics()
    }

    /// Verifies the slot store, key index and classification index together.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.map.check_invariants()?;
        self.classes.check_invariants(self.map.len())
    }

    #[cfg(feature = "concurrency")]
    pub(crate) fn map_mut(&mut self) -> &mut LimitMap<K, V> {
        &mut self.map
    }
}

fn values_at<K, V>(store: &SlotStore<K, V>, slots: Vec<usize>) -> Vec<&V>
where
    K: Eq + Hash + Clone,
{
    slots
        .into_iter()
        .filter_map(|slot| store.value_at(slot))
        .collect()
}

impl<K, V, A, B> fmt::Debug for TaggedLimitMap<K, V, A, B>
where
    K: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedLimitMap")
            .field("map", &self.map)
            .field("classes", &self.classes().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::random::{seeded_rng, OnExhausted};
    use rustc_hash::FxHashSet;

    type Peers = TaggedLimitMap<u32, u32, &'static str, &'static str>;

    fn seeded(capacity: usize) -> Peers {
        let config = LimitMapConfig {
            seed: Some(17),
            ..LimitMapConfig::new(capacity)
        };
        TaggedLimitMap::from_config(config).unwrap()
    }

    fn assert_distinct(values: &[&u32]) {
        let unique: FxHashSet<_> = values.iter().collect();
        assert_eq!(unique.len(), values.len(), "duplicates in {:?}", values);
    }

    mod classification {
        use super::*;

        #[test]
        fn set_records_class() {
            let mut map = seeded(4);
            map.set(1, 10, "eu", "west").unwrap();
            map.set(2, 20, "eu", "east").unwrap();
            assert_eq!(map.class_of(&1), Some((&"eu", &"west")));
            assert_eq!(map.class_of(&2), Some((&"eu", &"east")));
            assert_eq!(map.class_of(&3), None);
            assert_eq!(map.class_len(&"eu", &"west"), 1);
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn update_keeps_class() {
            let mut map = seeded(4);
            map.set(1, 10, "eu", "west").unwrap();
            assert_eq!(map.set(1, 11, "us", "east"), Ok(SetOutcome::Updated(10)));
            assert_eq!(map.class_of(&1), Some((&"eu", &"west")));
            assert_eq!(map.class_len(&"us", &"east"), 0);
        }

        #[test]
        fn retag_moves_between_buckets() {
            let mut map = seeded(4);
            map.set(1, 10, "eu", "west").unwrap();
            map.set(2, 20, "eu", "west").unwrap();
            assert!(map.retag(&1, "us", "east"));
            assert_eq!(map.class_len(&"eu", &"west"), 1);
            assert_eq!(map.class_len(&"us", &"east"), 1);
            assert!(!map.retag(&9, "us", "east"));
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn classes_lists_counts() {
            let mut map = seeded(8);
            map.set(1, 1, "a", "x").unwrap();
            map.set(2, 2, "a", "x").unwrap();
            map.set(3, 3, "b", "y").unwrap();
            let mut classes: Vec<_> = map.classes().map(|(a, b, n)| (*a, *b, n)).collect();
            classes.sort_unstable();
            assert_eq!(classes, vec![("a", "x", 2), ("b", "y", 1)]);
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn remove_last_slot_drops_class() {
            let mut map = seeded(4);
            map.set(1, 10, "eu", "west").unwrap();
            map.set(2, 20, "us", "east").unwrap();
            assert_eq!(map.remove(&2), Some(20));
            assert_eq!(map.class_len(&"us", &"east"), 0);
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn remove_middle_relocates_moved_class() {
            let mut map = seeded(4);
            map.set(1, 10, "eu", "west").unwrap();
            map.set(2, 20, "eu", "west").unwrap();
            map.set(3, 30, "us", "east").unwrap();
            // Key 3 moves from slot 2 into slot 0.
            assert_eq!(map.remove(&1), Some(10));
            assert_eq!(map.keys(), vec![3, 2]);
            assert_eq!(map.class_of(&3), Some((&"us", &"east")));
            assert_eq!(map.class_of(&2), Some((&"eu", &"west")));
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn remove_missing_is_none() {
            let mut map = seeded(2);
            assert_eq!(map.remove(&5), None);
        }

        #[test]
        fn clear_drops_classes() {
            let mut map = seeded(3);
            map.set(1, 1, "a", "b").unwrap();
            map.clear();
            assert_eq!(map.classes().count(), 0);
            assert!(map.check_invariants().is_ok());
        }
    }

    mod eviction {
        use super::*;

        #[test]
        fn eviction_reclassifies_slot() {
            let mut map = seeded(3);
            map.set(1, 10, "a", "x").unwrap();
            map.set(2, 20, "a", "x").unwrap();
            map.set(3, 30, "a", "x").unwrap();
            let outcome = map.set(4, 40, "b", "y").unwrap();
            let (victim, _) = outcome.into_evicted().unwrap();
            assert!(!map.contains(&victim));
            assert_eq!(map.class_len(&"a", &"x"), 2);
            assert_eq!(map.class_len(&"b", &"y"), 1);
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn rejection_leaves_classes_alone() {
            let config = LimitMapConfig {
                seed: Some(4),
                cover_max_try: 3,
                on_exhausted: OnExhausted::Reject,
                ..LimitMapConfig::new(2)
            };
            let mut map: Peers = TaggedLimitMap::from_config(config).unwrap();
            map.set_cover_rule(|_: &u32| false);
            map.set(1, 1, "a", "x").unwrap();
            map.set(2, 2, "a", "x").unwrap();
            assert_eq!(map.set(3, 3, "b", "y"), Err(StoreFull));
            assert_eq!(map.class_len(&"b", &"y"), 0);
            assert!(map.check_invariants().is_ok());
        }
    }

    mod sampling {
        use super::*;

        fn populated() -> Peers {
            let mut map = seeded(32);
            for i in 0..5 {
                map.set(i, i, "eu", "west").unwrap();
            }
            for i in 5..20 {
                map.set(i, i, "us", "east").unwrap();
            }
            map
        }

        #[test]
        fn sample_absent_key_is_none() {
            let mut map = populated();
            assert!(map.sample(&99, 3).is_none());
        }

        #[test]
        fn sample_within_class() {
            let mut map = populated();
            let picks = map.sample(&0, 3).unwrap();
            assert_eq!(picks.len(), 3);
            assert_distinct(&picks);
            assert!(picks.iter().all(|v| **v < 5));
        }

        #[test]
        fn sample_fills_from_population() {
            let mut map = populated();
            let picks = map.sample(&1, 8).unwrap();
            assert_eq!(picks.len(), 8);
            assert_distinct(&picks);
            assert_eq!(picks.iter().filter(|v| ***v < 5).count(), 5);
        }

        #[test]
        fn sample_caps_at_population() {
            let mut map = populated();
            let picks = map.sample(&1, 100).unwrap();
            assert_eq!(picks.len(), 20);
            assert_distinct(&picks);
        }

        #[test]
        fn sample_class_unknown_draws_population() {
            let mut map = populated();
            let picks = map.sample_class(&"ap", &"south", 4);
            assert_eq!(picks.len(), 4);
            assert_distinct(&picks);
        }

        #[test]
        fn sample_with_external_rng() {
            let map = populated();
            let mut rng = seeded_rng(Some(23));
            let picks = map.sample_with(&mut rng, &7, 4).unwrap();
            assert!(picks.iter().all(|v| **v >= 5));
            let class = map.sample_class_with(&mut rng, &"eu", &"west", 5);
            let mut values: Vec<u32> = class.into_iter().copied().collect();
            values.sort_unstable();
            assert_eq!(values, vec![0, 1, 2, 3, 4]);
        }

        #[test]
        fn sample_after_removals_stays_consistent() {
            let mut map = populated();
            for k in [0, 6, 2, 19] {
                map.remove(&k);
            }
            let picks = map.sample(&1, 3).unwrap();
            assert_eq!(picks.len(), 3);
            assert!(picks.iter().all(|v| [1, 3, 4].contains(*v)));
        }
    }
}
