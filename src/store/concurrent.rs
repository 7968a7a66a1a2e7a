//! Thread-safe limit maps.
//!
//! Each wrapper guards its whole map (slot store, key index and, for the
//! tagged variant, classification index) with one `parking_lot::RwLock`.
//! Mutations take the write lock for their full duration; lookups,
//! enumeration and sampling take the read lock. Values are returned by clone
//! since references cannot outlive the guard.
//!
//! Sampling under a read lock cannot use the map's own RNG, so each wrapper
//! keeps a second generator behind a `Mutex`, derived from the map's RNG at
//! construction (a seeded map stays reproducible).
//!
//! ```text
//!   ┌────────────────────────────────────────────────┐
//!   │ ConcurrentLimitMap<K, V>                       │
//!   │   inner: RwLock<LimitMap<K, V>>                │
//!   │   rng:   Mutex<SmallRng>   (read-side draws)   │
//!   └────────────────────────────────────────────────┘
//!   lock order: inner, then rng
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use limitmap::store::concurrent::ConcurrentLimitMap;
//!
//! let map = Arc::new(ConcurrentLimitMap::new(100));
//! let handles: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || {
//!             for i in 0..10 {
//!                 map.set(t * 10 + i, i).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(map.len(), 40);
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::{Mutex, RwLock};
use rand::rngs::SmallRng;

use crate::builder::LimitMapConfig;
use crate::error::{ConfigError, InvariantError};
use crate::store::limit::LimitMap;
use crate::store::tagged::TaggedLimitMap;
use crate::store::traits::{SetOutcome, StoreFull, StoreMetrics};
use crate::traits::{ConcurrentCache, CoverRule, SelectRule};

// ---------------------------------------------------------------------------
// ConcurrentLimitMap
// ---------------------------------------------------------------------------

/// [`LimitMap`] behind a single reader/writer lock.
pub struct ConcurrentLimitMap<K, V> {
    inner: RwLock<LimitMap<K, V>>,
    rng: Mutex<SmallRng>,
}

impl<K, V> ConcurrentLimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::from(LimitMap::new(capacity))
    }

    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_growth(capacity: usize) -> Self {
        Self::from(LimitMap::with_growth(capacity))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize, growable: bool) -> Result<Self, ConfigError> {
        LimitMap::try_new(capacity, growable).map(Self::from)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: LimitMapConfig) -> Result<Self, ConfigError> {
        LimitMap::from_config(config).map(Self::from)
    }

    pub fn set(&self, key: K, value: V) -> Result<SetOutcome<K, V>, StoreFull> {
        let mut map = self.inner.write();
        map.set(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        map.get(key).cloned()
    }

    /// Runs `f` on the value for `key` under the read lock.
    pub fn get_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let map = self.inner.read();
        map.get(key).map(f)
    }

    /// Runs `f` on the value for `key` under the write lock.
    pub fn get_mut_with<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut map = self.inner.write();
        map.get_mut(key).map(f)
    }

    pub fn contains(&self, key: &K) -> bool {
        let map = self.inner.read();
        map.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write();
        map.remove(key)
    }

    pub fn len(&self) -> usize {
        let map = self.inner.read();
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        let map = self.inner.read();
        map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        let map = self.inner.read();
        map.capacity()
    }

    pub fn max_capacity(&self) -> Option<usize> {
        let map = self.inner.read();
        map.max_capacity()
    }

    pub fn is_full(&self) -> bool {
        let map = self.inner.read();
        map.is_full()
    }

    pub fn keys(&self) -> Vec<K> {
        let map = self.inner.read();
        map.keys()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        map.values().into_iter().cloned().collect()
    }

    pub fn random_one(&self) -> Option<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.random_one_with(&mut *rng).cloned()
    }

    pub fn randoms(&self, limit: usize, max_try: usize) -> Vec<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.randoms_with(&mut *rng, limit, max_try)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn set_cover_rule(&self, rule: impl CoverRule<V> + 'static) {
        self.inner.write().set_cover_rule(rule);
    }

    pub fn set_select_rule(&self, rule: impl SelectRule<V> + 'static) {
        self.inner.write().set_select_rule(rule);
    }

    pub fn set_cover_max_try(&self, max_tries: usize) {
        self.inner.write().set_cover_max_try(max_tries);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.inner.read().metrics()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }

    pub fn into_inner(self) -> LimitMap<K, V> {
        self.inner.into_inner()
    }
}

impl<K, V> From<LimitMap<K, V>> for ConcurrentLimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from(mut map: LimitMap<K, V>) -> Self {
        let rng = map.fork_rng();
        Self {
            inner: RwLock::new(map),
            rng: Mutex::new(rng),
        }
    }
}

impl<K, V> fmt::Debug for ConcurrentLimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.inner.read();
        f.debug_struct("ConcurrentLimitMap")
            .field("inner", &*map)
            .finish_non_exhaustive()
    }
}

impl<K, V> ConcurrentCache for ConcurrentLimitMap<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
}

// ---------------------------------------------------------------------------
// ConcurrentTaggedLimitMap
// ---------------------------------------------------------------------------

/// [`TaggedLimitMap`] behind a single reader/writer lock.
///
/// The classification index lives under the same lock as the slots, so a
/// sample never observes a class bucket out of step with the slot array.
pub struct ConcurrentTaggedLimitMap<K, V, A, B> {
    inner: RwLock<TaggedLimitMap<K, V, A, B>>,
    rng: Mutex<SmallRng>,
}

impl<K, V, A, B> ConcurrentTaggedLimitMap<K, V, A, B>
where
    K: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::from(TaggedLimitMap::new(capacity))
    }

    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_growth(capacity: usize) -> Self {
        Self::from(TaggedLimitMap::with_growth(capacity))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize, growable: bool) -> Result<Self, ConfigError> {
        TaggedLimitMap::try_new(capacity, growable).map(Self::from)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: LimitMapConfig) -> Result<Self, ConfigError> {
        TaggedLimitMap::from_config(config).map(Self::from)
    }

    pub fn set(
        &self,
        key: K,
        value: V,
        dim_a: A,
        dim_b: B,
    ) -> Result<SetOutcome<K, V>, StoreFull> {
        let mut map = self.inner.write();
        map.set(key, value, dim_a, dim_b)
    }

    pub fn retag(&self, key: &K, dim_a: A, dim_b: B) -> bool {
        let mut map = self.inner.write();
        map.retag(key, dim_a, dim_b)
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        map.get(key).cloned()
    }

    pub fn get_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let map = self.inner.read();
        map.get(key).map(f)
    }

    pub fn contains(&self, key: &K) -> bool {
        let map = self.inner.read();
        map.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write();
        map.remove(key)
    }

    pub fn class_of(&self, key: &K) -> Option<(A, B)> {
        let map = self.inner.read();
        map.class_of(key)
            .map(|(dim_a, dim_b)| (dim_a.clone(), dim_b.clone()))
    }

    pub fn class_len(&self, dim_a: &A, dim_b: &B) -> usize {
        let map = self.inner.read();
        map.class_len(dim_a, dim_b)
    }

    pub fn len(&self) -> usize {
        let map = self.inner.read();
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        let map = self.inner.read();
        map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        let map = self.inner.read();
        map.capacity()
    }

    pub fn max_capacity(&self) -> Option<usize> {
        let map = self.inner.read();
        map.max_capacity()
    }

    pub fn is_full(&self) -> bool {
        let map = self.inner.read();
        map.is_full()
    }

    pub fn keys(&self) -> Vec<K> {
        let map = self.inner.read();
        map.keys()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        map.values().into_iter().cloned().collect()
    }

    pub fn random_one(&self) -> Option<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.random_one_with(&mut *rng).cloned()
    }

    pub fn randoms(&self, limit: usize, max_try: usize) -> Vec<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.randoms_with(&mut *rng, limit, max_try)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Stratified sample around `key`'s class; `None` if `key` is absent.
    pub fn sample(&self, key: &K, n: usize) -> Option<Vec<V>>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.sample_with(&mut *rng, key, n)
            .map(|values| values.into_iter().cloned().collect())
    }

    pub fn sample_class(&self, dim_a: &A, dim_b: &B, n: usize) -> Vec<V>
    where
        V: Clone,
    {
        let map = self.inner.read();
        let mut rng = self.rng.lock();
        map.sample_class_with(&mut *rng, dim_a, dim_b, n)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn set_cover_rule(&self, rule: impl CoverRule<V> + 'static) {
        self.inner.write().set_cover_rule(rule);
    }

    pub fn set_select_rule(&self, rule: impl SelectRule<V> + 'static) {
        self.inner.write().set_select_rule(rule);
    }

    pub fn set_cover_max_try(&self, max_tries: usize) {
        self.inner.write().set_cover_max_try(max_tries);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.inner.read().metrics()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }

    pub fn into_inner(self) -> TaggedLimitMap<K, V, A, B> {
        self.inner.into_inner()
    }
}

impl<K, V, A, B> From<TaggedLimitMap<K, V, A, B>> for ConcurrentTaggedLimitMap<K, V, A, B>
where
    K: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    fn from(mut map: TaggedLimitMap<K, V, A, B>) -> Self {
        let rng = map.map_mut().fork_rng();
        Self {
            inner: RwLock::new(map),
            rng: Mutex::new(rng),
        }
    }
}

impl<K, V, A, B> fmt::Debug for ConcurrentTaggedLimitMap<K, V, A, B>
where
    K: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.inner.read();
        f.debug_struct("ConcurrentTaggedLimitMap")
            .field("inner", &*map)
            .finish_non_exhaustive()
    }
}

impl<K, V, A, B> ConcurrentCache for ConcurrentTaggedLimitMap<K, V, A, B>
where
    K: Send + Sync,
    V: Send + Sync,
    A: Send + Sync,
    B: Send + Sync,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::random::OnExhausted;

    fn seeded<K: Eq + Hash + Clone>(capacity: usize) -> ConcurrentLimitMap<K, String> {
        let config = LimitMapConfig {
            seed: Some(31),
            ..LimitMapConfig::new(capacity)
        };
        ConcurrentLimitMap::from_config(config).unwrap()
    }

    fn assert_concurrent<T: ConcurrentCache>() {}

    mod basic {
        use super::*;

        #[test]
        fn set_get_remove() {
            let map = seeded(4);
            assert_eq!(map.set(1u32, "one".into()), Ok(SetOutcome::Inserted));
            assert_eq!(map.get(&1), Some("one".to_string()));
            assert_eq!(map.get_with(&1, String::len), Some(3));
            assert!(map.contains(&1));
            assert_eq!(map.remove(&1), Some("one".to_string()));
            assert!(map.is_empty());
        }

        #[test]
        fn get_mut_with_edits_value() {
            let map = seeded(4);
            map.set(1u32, "a".into()).unwrap();
            map.get_mut_with(&1, |v| v.push('b'));
            assert_eq!(map.get(&1), Some("ab".to_string()));
        }

        #[test]
        fn eviction_under_lock() {
            let map = seeded(3);
            for i in 0..10u32 {
                map.set(i, i.to_string()).unwrap();
            }
            assert_eq!(map.len(), 3);
            assert!(map.is_full());
            assert_eq!(map.metrics().evictions, 7);
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn rejection_passes_through() {
            let config = LimitMapConfig {
                cover_max_try: 2,
                on_exhausted: OnExhausted::Reject,
                ..LimitMapConfig::new(1)
            };
            let map: ConcurrentLimitMap<u8, u8> = ConcurrentLimitMap::from_config(config).unwrap();
            map.set_cover_rule(|_: &u8| false);
            map.set(1, 1).unwrap();
            assert_eq!(map.set(2, 2), Err(StoreFull));
        }

        #[test]
        fn sampling_clones_values() {
            let map = seeded(10);
            for i in 0..10u32 {
                map.set(i, i.to_string()).unwrap();
            }
            assert!(map.random_one().is_some());
            map.set_select_rule(|v: &String| v.len() == 1);
            assert_eq!(map.randoms(4, 1_000).len(), 4);
            assert_eq!(map.values().len(), 10);
            assert_eq!(map.keys().len(), 10);
        }

        #[test]
        fn into_inner_returns_map() {
            let map = seeded(2);
            map.set("k", "v".into()).unwrap();
            let inner = map.into_inner();
            assert_eq!(inner.peek(&"k"), Some(&"v".to_string()));
        }

        #[test]
        fn wrappers_are_concurrent_caches() {
            assert_concurrent::<ConcurrentLimitMap<u64, String>>();
            assert_concurrent::<ConcurrentTaggedLimitMap<u64, String, u8, u8>>();
        }
    }

    mod tagged {
        use super::*;

        #[test]
        fn classes_follow_mutations() {
            let map: ConcurrentTaggedLimitMap<u32, u32, u8, u8> = ConcurrentTaggedLimitMap::new(8);
            map.set(1, 10, 0, 0).unwrap();
            map.set(2, 20, 0, 0).unwrap();
            map.set(3, 30, 1, 0).unwrap();
            assert_eq!(map.class_of(&3), Some((1, 0)));
            assert_eq!(map.class_len(&0, &0), 2);

            assert!(map.retag(&3, 0, 0));
            assert_eq!(map.class_len(&0, &0), 3);
            map.remove(&1);
            assert_eq!(map.class_len(&0, &0), 2);
            assert!(map.check_invariants().is_ok());
        }

        #[test]
        fn sample_returns_owned_values() {
            let map: ConcurrentTaggedLimitMap<u32, u32, u8, u8> = ConcurrentTaggedLimitMap::new(8);
            for i in 0..6 {
                map.set(i, i, (i % 2) as u8, 0).unwrap();
            }
            let picks = map.sample(&0, 3).unwrap();
            assert!(picks.iter().all(|v| v % 2 == 0));
            assert!(map.sample(&42, 3).is_none());
            assert_eq!(map.sample_class(&1, &0, 10).len(), 6);
        }
    }
}
