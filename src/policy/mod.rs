pub mod random;
pub mod sample;

pub use random::{seeded_rng, OnExhausted, Probe, RandomProbe, DEFAULT_COVER_MAX_TRY};
