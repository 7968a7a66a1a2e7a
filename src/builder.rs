//! Configuration and builder for every limit map variant.
//!
//! [`LimitMapConfig`] is the plain-data description of a store; the
//! [`LimitMapBuilder`] wraps it together with the caller's rules and produces
//! any of the four store types.
//!
//! ## Example
//!
//! ```rust
//! use limitmap::builder::LimitMapBuilder;
//! use limitmap::policy::random::OnExhausted;
//!
//! let mut map = LimitMapBuilder::new(64)
//!     .cover_max_try(8)
//!     .on_exhausted(OnExhausted::Reject)
//!     .cover_rule(|hits: &u32| *hits < 3)
//!     .seed(7)
//!     .build::<String>();
//!
//! map.set("peer".to_string(), 0).unwrap();
//! assert_eq!(map.cover_max_try(), 8);
//! ```

use std::fmt;
use std::hash::Hash;

use crate::ds::slot_store::Growth;
use crate::error::ConfigError;
use crate::policy::random::{OnExhausted, DEFAULT_COVER_MAX_TRY};
use crate::store::limit::LimitMap;
use crate::store::tagged::TaggedLimitMap;
use crate::traits::{CoverRule, SelectRule};

#[cfg(feature = "concurrency")]
use crate::store::concurrent::{ConcurrentLimitMap, ConcurrentTaggedLimitMap};

/// Capacity used by [`LimitMapConfig::default`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Plain construction parameters for a limit map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitMapConfig {
    /// Initial slot count. Must be non-zero.
    pub capacity: usize,
    /// Double the slot count instead of evicting when full.
    pub growable: bool,
    /// Ceiling for a growable map; `None` grows without bound.
    pub max_capacity: Option<usize>,
    /// Eviction probe budget. Must be non-zero.
    pub cover_max_try: usize,
    /// Behavior when the probe budget runs out.
    pub on_exhausted: OnExhausted,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl LimitMapConfig {
    /// A fixed-capacity configuration with default probing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            growable: false,
            max_capacity: None,
            cover_max_try: DEFAULT_COVER_MAX_TRY,
            on_exhausted: OnExhausted::default(),
            seed: None,
        }
    }

    /// Checks the parameters against each other.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a zero capacity or probe budget, a ceiling
    /// on a non-growable map, or a ceiling below the initial capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        if self.cover_max_try == 0 {
            return Err(ConfigError::new("cover_max_try must be > 0"));
        }
        if let Some(max_capacity) = self.max_capacity {
            if !self.growable {
                return Err(ConfigError::new(
                    "max_capacity is only meaningful for a growable map",
                ));
            }
            if max_capacity < self.capacity {
                return Err(ConfigError::new(format!(
                    "max_capacity ({}) must be >= capacity ({})",
                    max_capacity, self.capacity
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn growth(&self) -> Growth {
        if self.growable {
            Growth::Doubling {
                ceiling: self.max_capacity,
            }
        } else {
            Growth::Fixed
        }
    }
}

impl Default for LimitMapConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Builder for limit maps holding values of type `V`.
///
/// The value type is fixed up front because the rules inspect values; key
/// and dimension types are chosen at `build` time.
pub struct LimitMapBuilder<V> {
    config: LimitMapConfig,
    cover_rule: Option<Box<dyn CoverRule<V>>>,
    select_rule: Option<Box<dyn SelectRule<V>>>,
}

impl<V> LimitMapBuilder<V> {
    /// Starts a builder for a fixed map of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self::from_config(LimitMapConfig::new(capacity))
    }

    pub fn from_config(config: LimitMapConfig) -> Self {
        Self {
            config,
            cover_rule: None,
            select_rule: None,
        }
    }

    pub fn growable(mut self, growable: bool) -> Self {
        self.config.growable = growable;
        self
    }

    /// Caps growth at `max_capacity` slots. Implies `growable(true)`.
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.config.growable = true;
        self.config.max_capacity = Some(max_capacity);
        self
    }

    pub fn cover_max_try(mut self, cover_max_try: usize) -> Self {
        self.config.cover_max_try = cover_max_try;
        self
    }

    pub fn on_exhausted(mut self, on_exhausted: OnExhausted) -> Self {
        self.config.on_exhausted = on_exhausted;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn cover_rule(mut self, rule: impl CoverRule<V> + 'static) -> Self {
        self.cover_rule = Some(Box::new(rule));
        self
    }

    pub fn select_rule(mut self, rule: impl SelectRule<V> + 'static) -> Self {
        self.select_rule = Some(Box::new(rule));
        self
    }

    /// The configuration collected so far.
    pub fn config(&self) -> &LimitMapConfig {
        &self.config
    }

    /// Builds a [`LimitMap`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build<K>(self) -> Result<LimitMap<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        let mut map = LimitMap::from_config(self.config)?;
        map.install_rules(self.cover_rule, self.select_rule);
        Ok(map)
    }

    /// Builds a [`TaggedLimitMap`] classified by `(A, B)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build_tagged<K, A, B>(self) -> Result<TaggedLimitMap<K, V, A, B>, ConfigError>
    where
        K: Eq + Hash + Clone,
        A: Eq + Hash + Clone,
        B: Eq + Hash + Clone,
    {
        let map = self.try_build::<K>()?;
        Ok(TaggedLimitMap::from_map(map))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build<K>(self) -> LimitMap<K, V>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build() {
            Ok(map) => map,
            Err(err) => panic!("invalid limit map configuration: {}", err),
        }
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_tagged<K, A, B>(self) -> TaggedLimitMap<K, V, A, B>
    where
        K: Eq + Hash + Clone,
        A: Eq + Hash + Clone,
        B: Eq + Hash + Clone,
    {
        match self.try_build_tagged() {
            Ok(map) => map,
            Err(err) => panic!("invalid limit map configuration: {}", err),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<V> LimitMapBuilder<V>
where
    V: Send + Sync,
{
    /// Builds a [`ConcurrentLimitMap`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build_concurrent<K>(self) -> Result<ConcurrentLimitMap<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + Sync,
    {
        self.try_build::<K>().map(ConcurrentLimitMap::from)
    }

    /// Builds a [`ConcurrentTaggedLimitMap`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build_concurrent_tagged<K, A, B>(
        self,
    ) -> Result<ConcurrentTaggedLimitMap<K, V, A, B>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + Sync,
        A: Eq + Hash + Clone + Send + Sync,
        B: Eq + Hash + Clone + Send + Sync,
    {
        self.try_build_tagged::<K, A, B>()
            .map(ConcurrentTaggedLimitMap::from)
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_concurrent<K>(self) -> ConcurrentLimitMap<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync,
    {
        match self.try_build_concurrent() {
            Ok(map) => map,
            Err(err) => panic!("invalid limit map configuration: {}", err),
        }
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_concurrent_tagged<K, A, B>(self) -> ConcurrentTaggedLimitMap<K, V, A, B>
    where
        K: Eq + Hash + Clone + Send + Sync,
        A: Eq + Hash + Clone + Send + Sync,
        B: Eq + Hash + Clone + Send + Sync,
    {
        match self.try_build_concurrent_tagged() {
            Ok(map) => map,
            Err(err) => panic!("invalid limit map configuration: {}", err),
        }
    }
}

impl<V> fmt::Debug for LimitMapBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimitMapBuilder")
            .field("config", &self.config)
            .field("cover_rule", &self.cover_rule.is_some())
            .field("select_rule", &self.select_rule.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::{SetOutcome, StoreFull};

    mod validation {
        use super::*;

        #[test]
        fn default_config_is_valid() {
            let config = LimitMapConfig::default();
            assert_eq!(config.capacity, DEFAULT_CAPACITY);
            assert_eq!(config.cover_max_try, DEFAULT_COVER_MAX_TRY);
            assert_eq!(config.on_exhausted, OnExhausted::ForceAccept);
            assert!(config.validate().is_ok());
            assert_eq!(config.growth(), Growth::Fixed);
        }

        #[test]
        fn zero_capacity_fails() {
            let err = LimitMapConfig::new(0).validate().unwrap_err();
            assert!(err.message().contains("capacity"));
        }

        #[test]
        fn zero_probe_budget_fails() {
            let config = LimitMapConfig {
                cover_max_try: 0,
                ..LimitMapConfig::new(4)
            };
            let err = config.validate().unwrap_err();
            assert!(err.message().contains("cover_max_try"));
        }

        #[test]
        fn ceiling_below_capacity_fails() {
            let config = LimitMapConfig {
                growable: true,
                max_capacity: Some(3),
                ..LimitMapConfig::new(4)
            };
            assert!(config.validate().unwrap_err().message().contains("capacity"));
        }

        #[test]
        fn ceiling_without_growth_fails() {
            let config = LimitMapConfig {
                max_capacity: Some(8),
                ..LimitMapConfig::new(4)
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn growable_config_maps_to_doubling() {
            let config = LimitMapConfig {
                growable: true,
                max_capacity: Some(32),
                ..LimitMapConfig::new(4)
            };
            assert_eq!(
                config.growth(),
                Growth::Doubling {
                    ceiling: Some(32)
                }
            );
        }
    }

    mod building {
        use super::*;

        #[test]
        fn builder_applies_settings() {
            let map = LimitMapBuilder::<u32>::new(4)
                .max_capacity(16)
                .cover_max_try(3)
                .on_exhausted(OnExhausted::Reject)
                .build::<u64>();
            assert_eq!(map.capacity(), 4);
            assert_eq!(map.max_capacity(), Some(16));
            assert_eq!(map.cover_max_try(), 3);
            assert_eq!(map.on_exhausted(), OnExhausted::Reject);
        }

        #[test]
        fn builder_installs_cover_rule() {
            let mut map = LimitMapBuilder::new(2)
                .cover_max_try(2)
                .on_exhausted(OnExhausted::Reject)
                .cover_rule(|_: &u8| false)
                .seed(5)
                .build::<&str>();
            map.set("a", 1).unwrap();
            map.set("b", 2).unwrap();
            assert_eq!(map.set("c", 3), Err(StoreFull));
        }

        #[test]
        fn builder_installs_select_rule() {
            let mut map = LimitMapBuilder::new(20)
                .select_rule(|v: &u32| *v >= 10)
                .seed(1)
                .build::<u32>();
            for i in 0..20 {
                map.set(i, i).unwrap();
            }
            assert!(map.randoms(5, 100_000).iter().all(|v| **v >= 10));
        }

        #[test]
        fn builder_builds_tagged() {
            let mut map = LimitMapBuilder::new(4).build_tagged::<u8, &str, u8>();
            assert_eq!(map.set(1, 10u32, "eu", 1), Ok(SetOutcome::Inserted));
            assert_eq!(map.class_len(&"eu", &1), 1);
        }

        #[test]
        fn invalid_builder_reports_error() {
            let err = LimitMapBuilder::<u8>::new(4)
                .cover_max_try(0)
                .try_build::<u8>()
                .unwrap_err();
            assert!(err.message().contains("cover_max_try"));
        }

        #[test]
        #[should_panic(expected = "invalid limit map configuration")]
        fn build_panics_on_invalid_config() {
            let _ = LimitMapBuilder::<u8>::new(0).build::<u8>();
        }

        #[test]
        fn debug_hides_rules() {
            let builder = LimitMapBuilder::<u8>::new(4).cover_rule(|_: &u8| true);
            let dbg = format!("{:?}", builder);
            assert!(dbg.contains("cover_rule: true"));
            assert!(dbg.contains("select_rule: false"));
        }

        #[cfg(feature = "concurrency")]
        #[test]
        fn builder_builds_concurrent_variants() {
            let map = LimitMapBuilder::new(8).seed(2).build_concurrent::<u64>();
            map.set(1, "one".to_string()).unwrap();
            assert_eq!(map.get(&1), Some("one".to_string()));

            let tagged = LimitMapBuilder::new(8).build_concurrent_tagged::<u64, u8, u8>();
            tagged.set(1, 5u16, 0, 0).unwrap();
            assert_eq!(tagged.class_len(&0, &0), 1);
        }
    }
}
