//! Slot sampling: single draws, filtered distinct draws, stratified draws.
//!
//! All functions work on slot numbers over an occupied prefix `[0, len)`;
//! the stores translate slots back to values. None of them allocate more
//! than O(requested) except the stratified fill's enumeration fallback.
//!
//! ## Stratified draw
//!
//! ```text
//!   class bucket (c slots)         whole population [0, len)
//!   ┌───┬───┬───┐                  ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!   │ 4 │ 1 │ 6 │ ──Fisher-Yates──►│ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ 6 │ 7 │
//!   └───┴───┴───┘   take min(n,c)  └───┴───┴───┴───┴───┴───┴───┴───┘
//!                                    fill: up to min(n - c, len - c)
//!                                    uniform draws not already chosen
//! ```
//!
//! The fill switches from rejection draws to enumerate-and-partial-shuffle
//! when it needs at least half of the remaining candidates, so it always
//! terminates in a bounded number of steps.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;

/// Picks one slot uniformly from `[0, len)`.
#[inline]
pub fn random_slot<R: Rng>(rng: &mut R, len: usize) -> Option<usize> {
    (len > 0).then(|| rng.random_range(0..len))
}

/// Draws up to `limit` distinct slots from `[0, len)`.
///
/// When `len <= limit` every slot is returned in slot order. Otherwise each
/// draw is kept if it is new and either `accept` returns `true` or `max_try`
/// draws have already been made; past that point any new slot is kept.
pub fn random_slots<R, F>(
    rng: &mut R,
    len: usize,
    limit: usize,
    max_try: usize,
    mut accept: F,
) -> Vec<usize>
where
    R: Rng,
    F: FnMut(usize) -> bool,
{
    if len <= limit {
        return (0..len).collect();
    }

    let mut chosen = FxHashSet::with_capacity_and_hasher(limit, Default::default());
    let mut slots = Vec::with_capacity(limit);
    let mut tries = 0usize;
    while slots.len() < limit {
        let slot = rng.random_range(0..len);
        tries += 1;
        if chosen.contains(&slot) {
            continue;
        }
        if tries >= max_try || accept(slot) {
            chosen.insert(slot);
            slots.push(slot);
        }
    }
    slots
}

/// Draws `n` slots preferring members of `class`.
///
/// Takes up to `n` class members in random order, then fills the shortfall
/// with distinct slots from the whole population `[0, len)`. Returns fewer
/// than `n` slots when the population is too small.
pub fn stratified<R: Rng>(rng: &mut R, class: &[usize], len: usize, n: usize) -> Vec<usize> {
    let mut picked = class.to_vec();
    picked.shuffle(rng);
    picked.truncate(n);
    if picked.len() == n {
        return picked;
    }

    let mut chosen: FxHashSet<usize> = picked.iter().copied().collect();
    let remaining = len.saturating_sub(chosen.len());
    let wanted = (n - picked.len()).min(remaining);
    if wanted == 0 {
        return picked;
    }

    if wanted * 2 <= remaining {
        let mut added = 0;
        while added < wanted {
            let slot = rng.random_range(0..len);
            if chosen.insert(slot) {
                picked.push(slot);
                added += 1;
            }
        }
    } else {
        let mut candidates: Vec<usize> = (0..len).filter(|slot| !chosen.contains(slot)).collect();
        let (head, _) = candidates.partial_shuffle(rng, wanted);
        picked.extend_from_slice(head);
    }
    picked
}
