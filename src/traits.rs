//! # Store Trait Hierarchy
//!
//! Two families of traits live here:
//!
//! - **Cache traits** give the limit maps a uniform surface so generic code
//!   can drive either variant.
//! - **Rule traits** are the caller-supplied predicates consulted by the
//!   eviction policy ([`CoverRule`]) and the sampling engine ([`SelectRule`]).
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────┐
//!   │            CoreCache<K, V>              │
//!   │                                         │
//!   │  insert(&mut, K, V) → Option<V>         │
//!   │  get(&mut, &K) → Option<&V>             │
//!   │  contains / len / is_empty / capacity   │
//!   │  clear(&mut)                            │
//!   └──────────────────┬──────────────────────┘
//!                      │
//!                      ▼
//!   ┌─────────────────────────────────────────┐
//!   │           MutableCache<K, V>            │
//!   │                                         │
//!   │  remove(&K) → Option<V>                 │
//!   │  remove_batch(&[K])                     │
//!   └─────────────────────────────────────────┘
//!
//!   ┌──────────────────────┐   ┌──────────────────────┐
//!   │    CoverRule<V>      │   │    SelectRule<V>     │
//!   │ should_cover(&V)     │   │ check(&V)            │
//!   │ "may this victim go" │   │ "may this be drawn"  │
//!   └──────────────────────┘   └──────────────────────┘
//!        blanket impl for Fn(&V) -> bool + Send + Sync
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use limitmap::store::limit::LimitMap;
//! use limitmap::traits::{CoreCache, MutableCache};
//!
//! fn warm<C: CoreCache<u64, String>>(cache: &mut C, data: &[(u64, String)]) {
//!     for (key, value) in data {
//!         cache.insert(*key, value.clone());
//!     }
//! }
//!
//! let mut map = LimitMap::new(16);
//! warm(&mut map, &[(1, "one".to_string()), (2, "two".to_string())]);
//! assert_eq!(CoreCache::len(&map), 2);
//! assert_eq!(MutableCache::remove(&mut map, &1), Some("one".to_string()));
//! ```

/// Caller-supplied eviction admission predicate.
///
/// Consulted with the value stored in a randomly probed slot when the store
/// is full. Returning `true` lets that entry be evicted. Once the probe
/// budget is spent the last probe is accepted regardless (unless the store
/// is configured to reject instead).
///
/// Any `Fn(&V) -> bool + Send + Sync` closure is a `CoverRule`.
///
/// # Example
///
/// ```
/// use limitmap::store::limit::LimitMap;
///
/// let mut map: LimitMap<&str, u32> = LimitMap::new(2);
/// // Only entries with a low score may be displaced
/// map.set_cover_rule(|score: &u32| *score < 10);
/// ```
pub trait CoverRule<V>: Send + Sync {
    /// Returns `true` if the entry holding `value` may be evicted.
    fn should_cover(&self, value: &V) -> bool;
}

impl<V, F> CoverRule<V> for F
where
    F: Fn(&V) -> bool + Send + Sync,
{
    #[inline]
    fn should_cover(&self, value: &V) -> bool {
        self(value)
    }
}

/// Caller-supplied sampling predicate.
///
/// Consulted with each randomly drawn value during filtered sampling;
/// returning `false` asks the sampler to draw again (within its budget).
///
/// Any `Fn(&V) -> bool + Send + Sync` closure is a `SelectRule`.
pub trait SelectRule<V>: Send + Sync {
    /// Returns `true` if `value` is an acceptable sample.
    fn check(&self, value: &V) -> bool;
}

impl<V, F> SelectRule<V> for F
where
    F: Fn(&V) -> bool + Send + Sync,
{
    #[inline]
    fn check(&self, value: &V) -> bool {
        self(value)
    }
}

/// Core cache operations shared by both limit map variants.
///
/// `insert` goes through the store's replacement policy. A store configured
/// to reject on an exhausted probe budget drops the offered entry here;
/// call the store's own `set` to observe rejections.
pub trait CoreCache<K, V> {
    /// Inserts a key-value pair, returning the previous value if it existed.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Gets a reference to a value by key.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Checks if a key exists.
    fn contains(&self, key: &K) -> bool;

    /// Returns the current number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the cache contains no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries the cache can currently hold.
    fn capacity(&self) -> usize;

    /// Removes all entries.
    fn clear(&mut self);
}

/// Caches that support removal of arbitrary keys.
pub trait MutableCache<K, V>: CoreCache<K, V> {
    /// Removes a key, returning its value if present.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes several keys, returning each result in order.
    fn remove_batch(&mut self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.remove(key)).collect()
    }
}

/// Marker for store types that are safe to share across threads.
pub trait ConcurrentCache: Send + Sync {}
