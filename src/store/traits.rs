//! Outcome, error and metrics types shared by the limit map variants.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of a successful `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome<K, V> {
    /// The key was new and took a free (or newly grown) slot.
    Inserted,
    /// The key existed; its value was replaced in place. Carries the old value.
    Updated(V),
    /// The key was new and the store was full; the returned entry was
    /// evicted and the new key took its slot.
    Evicted { key: K, value: V },
}

impl<K, V> SetOutcome<K, V> {
    /// `true` if the key was not present before the call.
    #[inline]
    pub fn is_new_key(&self) -> bool {
        !matches!(self, SetOutcome::Updated(_))
    }

    /// The evicted entry, if any.
    pub fn into_evicted(self) -> Option<(K, V)> {
        match self {
            SetOutcome::Evicted { key, value } => Some((key, value)),
            _ => None,
        }
    }
}

/// Error returned when a full store cannot admit a new key.
///
/// Only produced when the store is configured with
/// [`OnExhausted::Reject`](crate::policy::random::OnExhausted::Reject) and no
/// probed entry was admitted by the cover rule within the probe budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFull;

impl fmt::Display for StoreFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot set into a full limit map")
    }
}

impl std::error::Error for StoreFull {}

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,
    pub evictions: u64,
    /// New keys refused because no victim was admitted.
    pub rejections: u64,
    /// Slot array growth steps.
    pub growths: u64,
    /// Total victim probes across all evictions and rejections.
    pub probes: u64,
}

/// Metrics counters using atomics so shared-lock readers can record hits.
///
/// All counters use `Ordering::Relaxed`.
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
    rejections: AtomicU64,
    growths: AtomicU64,
    probes: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            growths: self.growths.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_growth(&self) {
        self.growths.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_probes(&self, probes: usize) {
        self.probes.fetch_add(probes as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_helpers() {
        let inserted: SetOutcome<&str, i32> = SetOutcome::Inserted;
        assert!(inserted.is_new_key());
        assert!(!SetOutcome::<&str, i32>::Updated(1).is_new_key());

        let evicted = SetOutcome::Evicted { key: "old", value: 3 };
        assert!(evicted.is_new_key());
        assert_eq!(evicted.into_evicted(), Some(("old", 3)));
        assert_eq!(inserted.into_evicted(), None);
    }

    #[test]
    fn store_full_displays() {
        assert_eq!(StoreFull.to_string(), "cannot set into a full limit map");
    }

    #[test]
    fn counters_snapshot() {
        let counters = StoreCounters::default();
        counters.record_lookup(true);
        counters.record_lookup(false);
        counters.record_lookup(false);
        counters.inc_insert();
        counters.inc_eviction();
        counters.add_probes(5);
        let m = counters.snapshot();
        assert_eq!(m.hits, 1);
        assert_eq!(m.misses, 2);
        assert_eq!(m.inserts, 1);
        assert_eq!(m.evictions, 1);
        assert_eq!(m.probes, 5);
        assert_eq!(m.rejections, 0);
    }
}
