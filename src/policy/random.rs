//! Random-probe replacement policy.
//!
//! When a store is full and a new key arrives, a victim slot is chosen by
//! probing uniformly random slots. Each probe consults an admission check
//! (typically a caller [`CoverRule`](crate::traits::CoverRule)); the first
//! admitted slot wins. The probe count is capped, so a pathological rule
//! cannot make an insert loop forever.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RandomProbe::select(len, admit)                     │
//! │                                                                         │
//! │   probes = 0                                                            │
//! │   loop:                                                                 │
//! │     slot = uniform [0, len)                                             │
//! │     probes += 1                                                         │
//! │     admit(slot)?            ──yes──► Accepted { slot, probes }          │
//! │     probes >= max_tries?    ──no───► loop                               │
//! │        │                                                                │
//! │        ├─ ForceAccept ──────────────► Forced { slot, probes }           │
//! │        └─ Reject ───────────────────► Exhausted { probes }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//!
//! - **Bounded**: at most `max_tries` probes per selection
//! - **Uniform**: every occupied slot is equally likely per probe
//! - **Stateless**: no recency or frequency bookkeeping; O(1) per probe
//!
//! ## Example Usage
//!
//! ```
//! use limitmap::policy::random::{OnExhausted, Probe, RandomProbe, seeded_rng};
//!
//! let policy = RandomProbe::new(4, OnExhausted::ForceAccept);
//! let mut rng = seeded_rng(Some(7));
//!
//! // A rule that never admits still yields a victim after 4 probes
//! let probe = policy.select(&mut rng, 10, |_| false);
//! assert!(matches!(probe, Probe::Forced { probes: 4, .. }));
//! ```

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Probe budget used when none is configured.
pub const DEFAULT_COVER_MAX_TRY: usize = 16;

/// What to do when the probe budget runs out without an admitted slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnExhausted {
    /// Evict the last probed slot anyway. Selection always succeeds.
    #[default]
    ForceAccept,
    /// Give up; the store reports the new key as rejected.
    Reject,
}

/// Outcome of a victim selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The admission check accepted `slot`.
    Accepted { slot: usize, probes: usize },
    /// The budget ran out and `slot` was taken regardless.
    Forced { slot: usize, probes: usize },
    /// The budget ran out and no slot was taken.
    Exhausted { probes: usize },
}

impl Probe {
    /// The chosen victim slot, if any.
    #[inline]
    pub fn slot(&self) -> Option<usize> {
        match *self {
            Probe::Accepted { slot, .. } | Probe::Forced { slot, .. } => Some(slot),
            Probe::Exhausted { .. } => None,
        }
    }

    /// Number of slots probed.
    #[inline]
    pub fn probes(&self) -> usize {
        match *self {
            Probe::Accepted { probes, .. }
            | Probe::Forced { probes, .. }
            | Probe::Exhausted { probes } => probes,
        }
    }
}

/// Bounded random victim selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomProbe {
    max_tries: usize,
    on_exhausted: OnExhausted,
}

impl RandomProbe {
    /// Creates a policy probing at most `max_tries` slots (at least one).
    pub fn new(max_tries: usize, on_exhausted: OnExhausted) -> Self {
        Self {
            max_tries: max_tries.max(1),
            on_exhausted,
        }
    }

    #[inline]
    pub fn max_tries(&self) -> usize {
        self.max_tries
    }

    #[inline]
    pub fn set_max_tries(&mut self, max_tries: usize) {
        self.max_tries = max_tries.max(1);
    }

    #[inline]
    pub fn on_exhausted(&self) -> OnExhausted {
        self.on_exhausted
    }

    /// Picks a victim among slots `[0, len)`.
    ///
    /// `admit` is called with each probed slot. An empty range yields
    /// `Exhausted { probes: 0 }`.
    pub fn select<R, F>(&self, rng: &mut R, len: usize, mut admit: F) -> Probe
    where
        R: Rng,
        F: FnMut(usize) -> bool,
    {
        if len == 0 {
            return Probe::Exhausted { probes: 0 };
        }

        let mut probes = 0;
        loop {
            let slot = rng.random_range(0..len);
            probes += 1;

            if admit(slot) {
                return Probe::Accepted { slot, probes };
            }

            if probes >= self.max_tries {
                return match self.on_exhausted {
                    OnExhausted::ForceAccept => Probe::Forced { slot, probes },
                    OnExhausted::Reject => Probe::Exhausted { probes },
                };
            }
        }
    }
}

impl Default for RandomProbe {
    fn default() -> Self {
        Self::new(DEFAULT_COVER_MAX_TRY, OnExhausted::default())
    }
}

/// Builds the store's random source, seeded once.
///
/// A fixed `seed` gives reproducible eviction and sampling; `None` seeds
/// from OS entropy.
pub fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}
