//! Bounded key-value store with random-probe replacement.
//!
//! [`LimitMap`] keeps its entries in a dense slot array indexed by key. It
//! never holds more than its logical capacity: once full, each new key
//! replaces a randomly probed victim (see [`policy::random`](crate::policy::random)).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          LimitMap<K, V>                                 │
//! │                                                                         │
//! │   ┌──────────────────────┐   ┌──────────────────┐   ┌───────────────┐   │
//! │   │ SlotStore<K, V>      │   │ RandomProbe      │   │ SmallRng      │   │
//! │   │  elements [0, len)   │   │  max_tries       │   │  seeded once  │   │
//! │   │  index K → slot      │   │  on_exhausted    │   │               │   │
//! │   └──────────────────────┘   └──────────────────┘   └───────────────┘   │
//! │                                                                         │
//! │   cover_rule:  Option<Box<dyn CoverRule<V>>>    (eviction admission)    │
//! │   select_rule: Option<Box<dyn SelectRule<V>>>   (sampling filter)       │
//! │   metrics:     StoreCounters                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! set(key, value)
//! ───────────────
//!
//!   key indexed?            ──yes──► replace value in place      → Updated
//!   free slot?              ──yes──► append at slot len          → Inserted
//!   growable & below cap?   ──yes──► double slots, append        → Inserted
//!   probe victim            ──ok───► reuse victim's slot         → Evicted
//!                           ──none─► Err(StoreFull)
//! ```
//!
//! ## Operations
//!
//! | Operation     | Time      | Notes                                   |
//! |---------------|-----------|-----------------------------------------|
//! | `get`         | O(1)      | Index lookup, counts hit/miss           |
//! | `set`         | O(1)*     | *Amortized; eviction ≤ `max_tries` probes|
//! | `remove`      | O(1)      | Swap-with-last compaction               |
//! | `random_one`  | O(1)      | Uniform over occupied slots             |
//! | `randoms`     | O(limit)* | *Expected; filtered by select rule      |
//! | `keys`/`values`| O(n)     | Slot order                              |
//!
//! ## Example Usage
//!
//! ```
//! use limitmap::store::limit::LimitMap;
//! use limitmap::store::traits::SetOutcome;
//!
//! let mut peers: LimitMap<String, u32> = LimitMap::new(3);
//! for (i, name) in ["a", "b", "c"].iter().enumerate() {
//!     peers.set(name.to_string(), i as u32).unwrap();
//! }
//! assert!(peers.is_full());
//!
//! // A fourth peer displaces a random one
//! let outcome = peers.set("d".to_string(), 9).unwrap();
//! assert!(matches!(outcome, SetOutcome::Evicted { .. }));
//! assert_eq!(peers.len(), 3);
//! assert_eq!(peers.get(&"d".to_string()), Some(&9));
//! ```
//!
//! ## Thread Safety
//!
//! `LimitMap` is `Send + Sync` but has no interior locking; use
//! [`ConcurrentLimitMap`](crate::store::concurrent::ConcurrentLimitMap) for
//! shared access.

use std::fmt;
use std::hash::Hash;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::builder::LimitMapConfig;
use crate::ds::slot_store::{Removed, SlotStore};
use crate::error::{ConfigError, InvariantError};
use crate::policy::random::{seeded_rng, OnExhausted, Probe, RandomProbe};
use crate::policy::sample;
use crate::store::traits::{SetOutcome, StoreCounters, StoreFull, StoreMetrics};
use crate::traits::{CoreCache, CoverRule, MutableCache, SelectRule};

/// Where `place` put a key. Shared with the tagged variant, which needs the
/// slot numbers to keep its classification index in step.
#[derive(Debug)]
pub(crate) enum Placement<K, V> {
    Updated(V),
    Appended(usize),
    Replaced { slot: usize, key: K, value: V },
}

/// Bounded dense-array map with random-probe replacement.
pub struct LimitMap<K, V> {
    store: SlotStore<K, V>,
    policy: RandomProbe,
    cover_rule: Option<Box<dyn CoverRule<V>>>,
    select_rule: Option<Box<dyn SelectRule<V>>>,
    rng: SmallRng,
    metrics: StoreCounters,
}

impl<K, V> LimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a fixed-capacity map.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`try_new`](Self::try_new) for a
    /// fallible constructor.
    ///
    /// # Example
    ///
    /// ```
    /// use limitmap::store::limit::LimitMap;
    ///
    /// let map: LimitMap<String, i32> = LimitMap::new(100);
    /// assert_eq!(map.capacity(), 100);
    /// assert!(map.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity, false) {
            Ok(map) => map,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a map that starts with `capacity` slots and doubles them
    /// whenever it runs out. It never evicts.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_growth(capacity: usize) -> Self {
        match Self::try_new(capacity, true) {
            Ok(map) => map,
            Err(err) => panic!("{}", err),
        }
    }

    /// Fallible constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize, growable: bool) -> Result<Self, ConfigError> {
        Self::from_config(LimitMapConfig {
            growable,
            ..LimitMapConfig::new(capacity)
        })
    }

    /// Builds a map from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: LimitMapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: SlotStore::new(config.capacity, config.growth()),
            policy: RandomProbe::new(config.cover_max_try, config.on_exhausted),
            cover_rule: None,
            select_rule: None,
            rng: seeded_rng(config.seed),
            metrics: StoreCounters::default(),
        })
    }

    /// Installs the eviction admission rule.
    pub fn set_cover_rule(&mut self, rule: impl CoverRule<V> + 'static) {
        self.cover_rule = Some(Box::new(rule));
    }

    /// Installs the sampling filter used by [`randoms`](Self::randoms).
    pub fn set_select_rule(&mut self, rule: impl SelectRule<V> + 'static) {
        self.select_rule = Some(Box::new(rule));
    }

    /// Sets the eviction probe budget (clamped to at least one probe).
    pub fn set_cover_max_try(&mut self, max_tries: usize) {
        self.policy.set_max_tries(max_tries);
    }

    #[inline]
    pub fn cover_max_try(&self) -> usize {
        self.policy.max_tries()
    }

    #[inline]
    pub fn on_exhausted(&self) -> OnExhausted {
        self.policy.on_exhausted()
    }

    /// Inserts or replaces `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFull`] only when the map is full, configured with
    /// [`OnExhausted::Reject`], and no probed entry passed the cover rule.
    ///
    /// # Example
    ///
    /// ```
    /// use limitmap::store::limit::LimitMap;
    /// use limitmap::store::traits::SetOutcome;
    ///
    /// let mut map = LimitMap::new(2);
    /// assert_eq!(map.set("k", 1), Ok(SetOutcome::Inserted));
    /// assert_eq!(map.set("k", 2), Ok(SetOutcome::Updated(1)));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Result<SetOutcome<K, V>, StoreFull> {
        Ok(match self.place(key, value)? {
            Placement::Updated(previous) => SetOutcome::Updated(previous),
            Placement::Appended(_) => SetOutcome::Inserted,
            Placement::Replaced { key, value, .. } => SetOutcome::Evicted { key, value },
        })
    }

    pub(crate) fn place(&mut self, key: K, value: V) -> Result<Placement<K, V>, StoreFull> {
        if let Some(slot_value) = self.store.get_mut(&key) {
            let previous = std::mem::replace(slot_value, value);
            self.metrics.inc_update();
            return Ok(Placement::Updated(previous));
        }

        if !self.store.has_free_slot() && self.store.can_grow() {
            self.store.grow();
            self.metrics.inc_growth();
        }

        let (key, value) = match self.store.push(key, value) {
            Ok(slot) => {
                self.metrics.inc_insert();
                return Ok(Placement::Appended(slot));
            },
            Err(entry) => entry,
        };

        let store = &self.store;
        let rule = self.cover_rule.as_deref();
        let probe = self.policy.select(&mut self.rng, store.len(), |slot| match rule {
            None => true,
            Some(rule) => store
                .value_at(slot)
                .is_some_and(|value| rule.should_cover(value)),
        });
        self.metrics.add_probes(probe.probes());

        let Some(slot) = probe.slot() else {
            self.metrics.inc_rejection();
            log::debug!(
                "rejected new key: no evictable entry within {} probes",
                probe.probes()
            );
            return Err(StoreFull);
        };

        let (evicted_key, evicted_value) = self.store.replace_at(slot, key, value);
        self.metrics.inc_eviction();
        if let Probe::Forced { probes, .. } = probe {
            log::trace!("forced eviction of slot {} after {} probes", slot, probes);
        } else {
            log::trace!("evicted slot {} after {} probes", slot, probe.probes());
        }
        Ok(Placement::Replaced {
            slot,
            key: evicted_key,
            value: evicted_value,
        })
    }

    /// Returns the value for `key`, recording a hit or miss.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let value = self.store.get(key);
        self.metrics.record_lookup(value.is_some());
        value
    }

    /// Returns the value for `key` without touching metrics.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.store.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.store.get_mut(key)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.store.contains(key)
    }

    /// Removes `key`, returning its value.
    ///
    /// The last occupied slot is moved into the vacated one, so removal is
    /// O(1) wherever the key sits.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|removed| removed.value)
    }

    pub(crate) fn remove_entry(&mut self, key: &K) -> Option<Removed<K, V>> {
        let removed = self.store.remove(key)?;
        self.metrics.inc_remove();
        Some(removed)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of slots currently allocated.
    ///
    /// For a fixed map this is the configured capacity; a growable map
    /// reports its current (possibly grown) slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.slots()
    }

    /// Upper bound on `len`, or `None` when growth is unbounded.
    #[inline]
    pub fn max_capacity(&self) -> Option<usize> {
        self.store.ceiling()
    }

    /// `true` when a new key can only be admitted by evicting another.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.store.is_full()
    }

    /// Keys in slot order.
    pub fn keys(&self) -> Vec<K> {
        self.store.keys().cloned().collect()
    }

    /// Values in slot order.
    pub fn values(&self) -> Vec<&V> {
        self.store.values().collect()
    }

    /// Iterates `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.store.iter()
    }

    /// Returns a uniformly random value, or `None` when empty.
    pub fn random_one(&mut self) -> Option<&V> {
        let slot = sample::random_slot(&mut self.rng, self.store.len())?;
        self.store.value_at(slot)
    }

    /// [`random_one`](Self::random_one) drawing from a caller-owned RNG.
    pub fn random_one_with<R: Rng>(&self, rng: &mut R) -> Option<&V> {
        let slot = sample::random_slot(rng, self.store.len())?;
        self.store.value_at(slot)
    }

    /// Returns up to `limit` distinct values at random.
    ///
    /// Draws are filtered by the select rule until `max_try` draws have been
    /// made; after that any unchosen entry is taken. If the map holds no more
    /// than `limit` entries, all values are returned.
    ///
    /// # Example
    ///
    /// ```
    /// use limitmap::store::limit::LimitMap;
    ///
    /// let mut map = LimitMap::new(10);
    /// for i in 0..10u32 {
    ///     map.set(i, i).unwrap();
    /// }
    /// map.set_select_rule(|v: &u32| v % 2 == 0);
    ///
    /// let picks = map.randoms(3, 1_000);
    /// assert_eq!(picks.len(), 3);
    /// assert!(picks.iter().all(|v| *v % 2 == 0));
    /// ```
    pub fn randoms(&mut self, limit: usize, max_try: usize) -> Vec<&V> {
        collect_randoms(
            &self.store,
            self.select_rule.as_deref(),
            &mut self.rng,
            limit,
            max_try,
        )
    }

    /// [`randoms`](Self::randoms) drawing from a caller-owned RNG.
    pub fn randoms_with<R: Rng>(&self, rng: &mut R, limit: usize, max_try: usize) -> Vec<&V> {
        collect_randoms(&self.store, self.select_rule.as_deref(), rng, limit, max_try)
    }

    /// Removes every entry. Allocated slots and metrics are kept.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Returns a snapshot of the map's metrics.
    pub fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }

    /// Verifies that the key index and slot array agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.store.check_invariants()
    }

    pub(crate) fn install_rules(
        &mut self,
        cover_rule: Option<Box<dyn CoverRule<V>>>,
        select_rule: Option<Box<dyn SelectRule<V>>>,
    ) {
        if cover_rule.is_some() {
            self.cover_rule = cover_rule;
        }
        if select_rule.is_some() {
            self.select_rule = select_rule;
        }
    }

    /// A second generator derived from this map's RNG, for samplers that
    /// run outside `&mut self`.
    #[cfg(feature = "concurrency")]
    pub(crate) fn fork_rng(&mut self) -> SmallRng {
        seeded_rng(Some(self.rng.random()))
    }

    pub(crate) fn store(&self) -> &SlotStore<K, V> {
        &self.store
    }

    pub(crate) fn store_and_rng(&mut self) -> (&SlotStore<K, V>, &mut SmallRng) {
        (&self.store, &mut self.rng)
    }
}

fn collect_randoms<'a, K, V, R>(
    store: &'a SlotStore<K, V>,
    rule: Option<&dyn SelectRule<V>>,
    rng: &mut R,
    limit: usize,
    max_try: usize,
) -> Vec<&'a V>
where
    K: Eq + Hash + Clone,
    R: Rng,
{
    sample::random_slots(rng, store.len(), limit, max_try, |slot| match rule {
        None => true,
        Some(rule) => store.value_at(slot).is_some_and(|value| rule.check(value)),
    })
    .into_iter()
    .filter_map(|slot| store.value_at(slot))
    .collect()
}

impl<K, V> fmt::Debug for LimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimitMap")
            .field("len", &self.store.len())
            .field("capacity", &self.store.slots())
            .field("max_capacity", &self.store.ceiling())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<K, V> CoreCache<K, V> for LimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    #[inline]
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.set(key, value) {
            Ok(SetOutcome::Updated(previous)) => Some(previous),
            _ => None,
        }
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        LimitMap::get(self, key)
    }

    #[inline]
    fn contains(&self, key: &K) -> bool {
        LimitMap::contains(self, key)
    }

    #[inline]
    fn len(&self) -> usize {
        LimitMap::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        LimitMap::capacity(self)
    }

    fn clear(&mut self) {
        LimitMap::clear(self);
    }
}

impl<K, V> MutableCache<K, V> for LimitMap<K, V>
where
    K: Eq + Hash + Clone,
{
    #[inline]
    fn remove(&mut self, key: &K) -> Option<V> {
        LimitMap::remove(self, key)
    }
}
