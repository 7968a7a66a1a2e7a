//! Dense slot store with a key → slot index.
//!
//! Elements live contiguously in slots `[0, len)`. A hash index maps each key
//! to its slot, and the two structures are only ever mutated together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SlotStore<K, V> Layout                           │
//! │                                                                         │
//! │   index: FxHashMap<K, usize>         elements: Vec<Element<K, V>>       │
//! │                                                                         │
//! │   ┌─────────┬──────┐                 ┌──────┬──────┬──────┬──────┐      │
//! │   │  "n1"   │  0   │────────────────►│ n1,a │ n2,b │ n3,c │ free │      │
//! │   │  "n2"   │  1   │                 └──────┴──────┴──────┴──────┘      │
//! │   │  "n3"   │  2   │                    0      1      2      3          │
//! │   └─────────┴──────┘                                                    │
//! │                                      len = 3, slots = 4                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! Remove "n1" (slot 0, not last)
//! ──────────────────────────────
//!
//!   1. Move element at slot len-1 ("n3") into slot 0
//!   2. index["n3"] = 0
//!   3. len -= 1
//!   4. Drop "n1" from the index
//!
//!   elements: [ n3,c | n2,b | free | free ]
//!
//! Growth (doubling, clipped to ceiling)
//! ─────────────────────────────────────
//!
//!   slots: 4 ──► 8 ──► 16 ──► ceiling
//!   Slot numbers are stable across growth; the index is untouched.
//! ```
//!
//! ## Invariants
//!
//! - `index.len() == len`
//! - for every `i < len`: `index[elements[i].key] == i`
//! - `len <= slots`, and `slots <= ceiling` when a ceiling exists
//!
//! ## Operations
//!
//! | Operation     | Time   | Notes                                   |
//! |---------------|--------|-----------------------------------------|
//! | `get`         | O(1)   | Index lookup                            |
//! | `push`        | O(1)   | Appends at slot `len`                   |
//! | `replace_at`  | O(1)   | Reuses a slot for a different key       |
//! | `remove`      | O(1)   | Swap-with-last compaction               |
//! | `grow`        | O(n)   | Reallocates; amortized by doubling      |

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;

/// How the slot count reacts when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// The slot count never changes.
    Fixed,
    /// Double the slot count, clipped to `ceiling` when one is set.
    Doubling { ceiling: Option<usize> },
}

#[derive(Debug)]
struct Element<K, V> {
    key: K,
    value: V,
}

/// An element taken out of the store by [`SlotStore::remove`].
///
/// `moved_from` is `Some(last)` when the element that occupied slot `last`
/// was moved down into `slot` to keep the occupied prefix contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed<K, V> {
    pub slot: usize,
    pub key: K,
    pub value: V,
    pub moved_from: Option<usize>,
}

/// Dense slot array plus key index.
#[derive(Debug)]
pub struct SlotStore<K, V> {
    elements: Vec<Element<K, V>>,
    index: FxHashMap<K, usize>,
    slots: usize,
    growth: Growth,
}

impl<K, V> SlotStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a store with `slots` pre-allocated slots.
    pub fn new(slots: usize, growth: Growth) -> Self {
        Self {
            elements: Vec::with_capacity(slots),
            index: FxHashMap::with_capacity_and_hasher(slots, Default::default()),
            slots,
            growth,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of allocated slots (occupied or not).
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// The hard upper bound on `len`, or `None` when growth is unbounded.
    pub fn ceiling(&self) -> Option<usize> {
        match self.growth {
            Growth::Fixed => Some(self.slots),
            Growth::Doubling { ceiling } => ceiling,
        }
    }

    #[inline]
    pub fn has_free_slot(&self) -> bool {
        self.len() < self.slots
    }

    pub fn can_grow(&self) -> bool {
        match self.growth {
            Growth::Fixed => false,
            Growth::Doubling { ceiling: None } => true,
            Growth::Doubling {
                ceiling: Some(ceiling),
            } => self.slots < ceiling,
        }
    }

    /// `true` when a new key cannot be placed without displacing another.
    #[inline]
    pub fn is_full(&self) -> bool {
        !self.has_free_slot() && !self.can_grow()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    #[inline]
    pub fn slot_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.slot_of(key)?;
        self.value_at(slot)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.slot_of(key)?;
        self.elements.get_mut(slot).map(|element| &mut element.value)
    }

    #[inline]
    pub fn key_at(&self, slot: usize) -> Option<&K> {
        self.elements.get(slot).map(|element| &element.key)
    }

    #[inline]
    pub fn value_at(&self, slot: usize) -> Option<&V> {
        self.elements.get(slot).map(|element| &element.value)
    }

    /// Replaces the value of an existing key in place, returning the old one.
    pub fn replace_value(&mut self, key: &K, value: V) -> Option<V> {
        self.get_mut(key)
            .map(|slot_value| std::mem::replace(slot_value, value))
    }

    /// Appends a new key at slot `len`.
    ///
    /// Hands the entry back when there is no free slot; the caller decides
    /// whether to [`grow`](Self::grow) or evict. The key must not already be
    /// indexed.
    pub fn push(&mut self, key: K, value: V) -> Result<usize, (K, V)> {
        debug_assert!(!self.index.contains_key(&key), "push of indexed key");
        if !self.has_free_slot() {
            return Err((key, value));
        }
        let slot = self.elements.len();
        self.index.insert(key.clone(), slot);
        self.elements.push(Element { key, value });
        Ok(slot)
    }

    /// Doubles the slot count, clipped to the ceiling. Returns the new count.
    ///
    /// Slot numbers of existing elements do not change.
    pub fn grow(&mut self) -> usize {
        let previous = self.slots;
        let mut next = previous.saturating_mul(2).max(previous + 1);
        if let Some(ceiling) = self.ceiling() {
            next = next.min(ceiling);
        }
        if next > previous {
            self.elements.reserve_exact(next - self.elements.len());
            self.slots = next;
            log::debug!("slot store grew from {} to {} slots", previous, next);
        }
        self.slots
    }

    /// Installs `key`/`value` at an occupied `slot`, returning the displaced
    /// element. Used for eviction: the victim's key leaves the index before
    /// the new key is inserted at the same slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not occupied.
    pub fn replace_at(&mut self, slot: usize, key: K, value: V) -> (K, V) {
        debug_assert!(!self.index.contains_key(&key), "replace_at with indexed key");
        let element = &mut self.elements[slot];
        let displaced = std::mem::replace(
            element,
            Element {
                key: key.clone(),
                value,
            },
        );
        self.index.remove(&displaced.key);
        self.index.insert(key, slot);
        (displaced.key, displaced.value)
    }

    /// Removes `key`, filling its slot with the last occupied element.
    pub fn remove(&mut self, key: &K) -> Option<Removed<K, V>> {
        let slot = self.slot_of(key)?;
        let last = self.elements.len() - 1;
        let element = self.elements.swap_remove(slot);

        let moved_from = if slot != last {
            let moved_key = &self.elements[slot].key;
            if let Some(moved_slot) = self.index.get_mut(moved_key) {
                *moved_slot = slot;
            }
            Some(last)
        } else {
            None
        };

        // Removed key leaves the index only after its old slot is refilled.
        self.index.remove(&element.key);

        Some(Removed {
            slot,
            key: element.key,
            value: element.value,
            moved_from,
        })
    }

    /// Iterates `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.elements
            .iter()
            .map(|element| (&element.key, &element.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.elements.iter().map(|element| &element.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.elements.iter().map(|element| &element.value)
    }

    /// Drops every element. The slot count is kept.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
    }

    /// Verifies that the key index and the occupied slots agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.elements.len() {
            return Err(InvariantError::new(format!(
                "key index holds {} entries but {} slots are occupied",
                self.index.len(),
                self.elements.len()
            )));
        }
        if self.elements.len() > self.slots {
            return Err(InvariantError::new(format!(
                "{} occupied slots exceed {} allocated",
                self.elements.len(),
                self.slots
            )));
        }
        if let Some(ceiling) = self.ceiling() {
            if self.slots > ceiling {
                return Err(InvariantError::new(format!(
                    "{} slots exceed ceiling {}",
                    self.slots, ceiling
                )));
            }
        }
        for (slot, element) in self.elements.iter().enumerate() {
            match self.index.get(&element.key) {
                Some(&indexed) if indexed == slot => {},
                Some(&indexed) => {
                    return Err(InvariantError::new(format!(
                        "key at slot {} is indexed at slot {}",
                        slot, indexed
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "key at slot {} is missing from the index",
                        slot
                    )));
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(keys: &[&'static str]) -> SlotStore<&'static str, usize> {
        let mut store = SlotStore::new(keys.len(), Growth::Fixed);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(store.push(*key, i), Ok(i));
        }
        store
    }

    mod basic_operations {
        use super::*;

        #[test]
        fn push_assigns_consecutive_slots() {
            let store = filled(&["a", "b", "c"]);
            assert_eq!(store.len(), 3);
            assert_eq!(store.slot_of(&"a"), Some(0));
            assert_eq!(store.slot_of(&"c"), Some(2));
            assert_eq!(store.get(&"b"), Some(&1));
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        fn push_without_free_slot_returns_none() {
            let mut store = filled(&["a", "b"]);
            assert!(store.is_full());
            assert_eq!(store.push("c", 9), Err(("c", 9)));
            assert_eq!(store.len(), 2);
            assert!(!store.contains(&"c"));
        }

        #[test]
        fn replace_value_keeps_slot() {
            let mut store = filled(&["a", "b"]);
            assert_eq!(store.replace_value(&"b", 42), Some(1));
            assert_eq!(store.slot_of(&"b"), Some(1));
            assert_eq!(store.get(&"b"), Some(&42));
            assert_eq!(store.replace_value(&"zz", 1), None);
        }

        #[test]
        fn iteration_follows_slot_order() {
            let store = filled(&["x", "y", "z"]);
            let keys: Vec<_> = store.keys().copied().collect();
            assert_eq!(keys, vec!["x", "y", "z"]);
            let values: Vec<_> = store.values().copied().collect();
            assert_eq!(values, vec![0, 1, 2]);
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn remove_last_slot_moves_nothing() {
            let mut store = filled(&["a", "b", "c"]);
            let removed = store.remove(&"c").unwrap();
            assert_eq!(removed.slot, 2);
            assert_eq!(removed.value, 2);
            assert_eq!(removed.moved_from, None);
            assert_eq!(store.len(), 2);
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        fn remove_middle_slot_compacts_with_last() {
            let mut store = filled(&["a", "b", "c", "d"]);
            let removed = store.remove(&"b").unwrap();
            assert_eq!(removed.slot, 1);
            assert_eq!(removed.moved_from, Some(3));
            assert_eq!(store.slot_of(&"d"), Some(1));
            assert_eq!(store.get(&"d"), Some(&3));
            assert_eq!(store.key_at(1), Some(&"d"));
            assert!(!store.contains(&"b"));
            assert_eq!(store.len(), 3);
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        fn remove_missing_key_is_none() {
            let mut store = filled(&["a"]);
            assert!(store.remove(&"q").is_none());
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn freed_slot_is_reused_by_next_push() {
            let mut store = filled(&["a", "b", "c"]);
            store.remove(&"a");
            assert_eq!(store.push("d", 7), Ok(2));
            assert_eq!(store.len(), 3);
            assert!(store.is_full());
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        fn remove_only_element() {
            let mut store = filled(&["solo"]);
            let removed = store.remove(&"solo").unwrap();
            assert_eq!(removed.moved_from, None);
            assert!(store.is_empty());
            assert!(store.check_invariants().is_ok());
        }
    }

    mod replacement {
        use super::*;

        #[test]
        fn replace_at_swaps_index_entries() {
            let mut store = filled(&["a", "b", "c"]);
            let displaced = store.replace_at(1, "n", 99);
            assert_eq!(displaced, ("b", 1));
            assert!(!store.contains(&"b"));
            assert_eq!(store.slot_of(&"n"), Some(1));
            assert_eq!(store.len(), 3);
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        #[should_panic]
        fn replace_at_unoccupied_slot_panics() {
            let mut store = filled(&["a"]);
            store.replace_at(5, "n", 1);
        }
    }

    mod growth {
        use super::*;

        #[test]
        fn doubling_without_ceiling_never_fills() {
            let mut store: SlotStore<u32, u32> =
                SlotStore::new(2, Growth::Doubling { ceiling: None });
            for i in 0..2 {
                store.push(i, i).unwrap();
            }
            assert!(!store.has_free_slot());
            assert!(!store.is_full());
            assert_eq!(store.grow(), 4);
            assert_eq!(store.push(2, 2), Ok(2));
            assert_eq!(store.slot_of(&0), Some(0));
            assert_eq!(store.ceiling(), None);
        }

        #[test]
        fn doubling_is_clipped_to_ceiling() {
            let mut store: SlotStore<u32, u32> =
                SlotStore::new(3, Growth::Doubling { ceiling: Some(5) });
            assert_eq!(store.grow(), 5);
            assert!(!store.can_grow());
            assert_eq!(store.grow(), 5);
            for i in 0..5 {
                store.push(i, i).unwrap();
            }
            assert!(store.is_full());
            assert!(store.check_invariants().is_ok());
        }

        #[test]
        fn fixed_store_does_not_grow() {
            let mut store: SlotStore<u32, u32> = SlotStore::new(4, Growth::Fixed);
            assert!(!store.can_grow());
            assert_eq!(store.grow(), 4);
            assert_eq!(store.ceiling(), Some(4));
        }

        #[test]
        fn clear_keeps_slot_count() {
            let mut store: SlotStore<u32, u32> =
                SlotStore::new(1, Growth::Doubling { ceiling: None });
            store.push(1, 1).unwrap();
            store.grow();
            store.clear();
            assert!(store.is_empty());
            assert_eq!(store.slots(), 2);
            assert!(store.check_invariants().is_ok());
        }
    }
}
