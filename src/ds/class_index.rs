//! Two-level classification index over slot numbers.
//!
//! Maps a class tag `(dim_a, dim_b)` to the list of slots whose element
//! carries that tag, so a class can be sampled in O(class size) instead of
//! scanning the whole store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ClassIndex<A, B> Layout                            │
//! │                                                                         │
//! │   buckets: dim_a ──► dim_b ──► Vec<slot>                                │
//! │                                                                         │
//! │     "eu" ──┬── "west" ──► [ 0, 4, 2 ]                                   │
//! │            └── "east" ──► [ 1 ]                                         │
//! │     "us" ───── "west" ──► [ 3 ]                                         │
//! │                                                                         │
//! │   entries: Vec<Option<ClassEntry>>   (indexed by slot number)           │
//! │                                                                         │
//! │     slot 0 ─► (eu, west, class_slot 0)                                  │
//! │     slot 1 ─► (eu, east, class_slot 0)                                  │
//! │     slot 2 ─► (eu, west, class_slot 2)                                  │
//! │     slot 3 ─► (us, west, class_slot 0)                                  │
//! │     slot 4 ─► (eu, west, class_slot 1)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! remove(slot 0):   bucket (eu, west) = [0, 4, 2]
//!   1. swap_remove position 0       ──► [2, 4]
//!   2. entries[2].class_slot = 0    (back-pointer of the moved slot)
//!
//! relocate(from 4, to 1):  the slot store moved slot 4's element into slot 1
//!   1. entry = entries[4].take()
//!   2. bucket[entry.class_slot] = 1
//!   3. entries[1] = entry
//! ```
//!
//! ## Invariants
//!
//! - Each occupied slot appears in exactly one bucket.
//! - `entries[s].class_slot` is the true position of `s` in its bucket.
//! - No bucket (inner or outer) is left empty.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;

#[derive(Debug, Clone)]
struct ClassEntry<A, B> {
    dim_a: A,
    dim_b: B,
    /// Position of this slot inside its bucket.
    class_slot: usize,
}

/// Classification buckets with per-slot back-pointers.
#[derive(Debug)]
pub struct ClassIndex<A, B> {
    buckets: FxHashMap<A, FxHashMap<B, Vec<usize>>>,
    entries: Vec<Option<ClassEntry<A, B>>>,
    len: usize,
}

impl<A, B> ClassIndex<A, B>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(slots: usize) -> Self {
        Self {
            buckets: FxHashMap::default(),
            entries: Vec::with_capacity(slots),
            len: 0,
        }
    }

    /// Number of classified slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds `slot` to the `(dim_a, dim_b)` bucket.
    ///
    /// The slot must not already be classified.
    pub fn insert(&mut self, slot: usize, dim_a: A, dim_b: B) {
        debug_assert!(
            self.class_of(slot).is_none(),
            "slot {} is already classified",
            slot
        );
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        let bucket = self
            .buckets
            .entry(dim_a.clone())
            .or_default()
            .entry(dim_b.clone())
            .or_default();
        let class_slot = bucket.len();
        bucket.push(slot);
        self.entries[slot] = Some(ClassEntry {
            dim_a,
            dim_b,
            class_slot,
        });
        self.len += 1;
    }

    /// Removes `slot` from its bucket, returning its class tag.
    pub fn remove(&mut self, slot: usize) -> Option<(A, B)> {
        let entry = self.entries.get_mut(slot)?.take()?;
        self.len -= 1;

        if let Some(inner) = self.buckets.get_mut(&entry.dim_a) {
            if let Some(bucket) = inner.get_mut(&entry.dim_b) {
                if entry.class_slot < bucket.len() {
                    bucket.swap_remove(entry.class_slot);
                    if let Some(&moved) = bucket.get(entry.class_slot) {
                        if let Some(Some(moved_entry)) = self.entries.get_mut(moved) {
                            moved_entry.class_slot = entry.class_slot;
                        }
                    }
                }
                if bucket.is_empty() {
                    inner.remove(&entry.dim_b);
                }
            }
            if inner.is_empty() {
                self.buckets.remove(&entry.dim_a);
            }
        }

        Some((entry.dim_a, entry.dim_b))
    }

    /// Re-points the classification of `from` at `to` after the slot store
    /// moved the element in `from` down into `to`.
    ///
    /// `to` must be unclassified (its previous occupant already removed).
    /// Returns `false` if `from` was not classified.
    pub fn relocate(&mut self, from: usize, to: usize) -> bool {
        debug_assert!(self.class_of(to).is_none(), "relocate onto classified slot");
        let Some(entry) = self.entries.get_mut(from).and_then(Option::take) else {
            return false;
        };
        if let Some(position) = self
            .buckets
            .get_mut(&entry.dim_a)
            .and_then(|inner| inner.get_mut(&entry.dim_b))
            .and_then(|bucket| bucket.get_mut(entry.class_slot))
        {
            *position = to;
        }
        if self.entries.len() <= to {
            self.entries.resize_with(to + 1, || None);
        }
        self.entries[to] = Some(entry);
        true
    }

    /// Returns the class tag of `slot`.
    pub fn class_of(&self, slot: usize) -> Option<(&A, &B)> {
        self.entries
            .get(slot)
            .and_then(Option::as_ref)
            .map(|entry| (&entry.dim_a, &entry.dim_b))
    }

    /// Slots tagged `(dim_a, dim_b)`, in bucket order.
    pub fn bucket(&self, dim_a: &A, dim_b: &B) -> &[usize] {
        self.buckets
            .get(dim_a)
            .and_then(|inner| inner.get(dim_b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[inline]
    pub fn class_len(&self, dim_a: &A, dim_b: &B) -> usize {
        self.bucket(dim_a, dim_b).len()
    }

    /// Iterates every non-empty class with its slots.
    pub fn classes(&self) -> impl Iterator<Item = (&A, &B, &[usize])> {
        self.buckets.iter().flat_map(|(dim_a, inner)| {
            inner
                .iter()
                .map(move |(dim_b, bucket)| (dim_a, dim_b, bucket.as_slice()))
        })
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
        self.len = 0;
    }

    /// Verifies buckets and back-pointers against `occupied` slots `[0, occupied)`.
    pub fn check_invariants(&self, occupied: usize) -> Result<(), InvariantError> {
        if self.len != occupied {
            return Err(InvariantError::new(format!(
                "{} classified slots but {} occupied",
                self.len, occupied
            )));
        }
        for (slot, entry) in self.entries.iter().enumerate() {
            if (slot < occupied) != entry.is_some() {
                return Err(InvariantError::new(format!(
                    "slot {} classification does not match occupancy",
                    slot
                )));
            }
        }

        let mut bucketed = 0;
        for (dim_a, inner) in &self.buckets {
            if inner.is_empty() {
                return Err(InvariantError::new("empty outer class bucket"));
            }
            for (dim_b, bucket) in inner {
                if bucket.is_empty() {
                    return Err(InvariantError::new("empty inner class bucket"));
                }
                for (position, &slot) in bucket.iter().enumerate() {
                    let entry = self
                        .entries
                        .get(slot)
                        .and_then(Option::as_ref)
                        .ok_or_else(|| {
                            InvariantError::new(format!("bucketed slot {} has no entry", slot))
                        })?;
                    if entry.class_slot != position {
                        return Err(InvariantError::new(format!(
                            "slot {} records class_slot {} but sits at {}",
                            slot, entry.class_slot, position
                        )));
                    }
                    if &entry.dim_a != dim_a || &entry.dim_b != dim_b {
                        return Err(InvariantError::new(format!(
                            "slot {} sits in a bucket other than its class",
                            slot
                        )));
                    }
                }
                bucketed += bucket.len();
            }
        }
        if bucketed != self.len {
            return Err(InvariantError::new(format!(
                "{} bucketed slots but {} classified",
                bucketed, self.len
            )));
        }
        Ok(())
    }
}

impl<A, B> Default for ClassIndex<A, B>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
