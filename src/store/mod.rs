#[cfg(feature = "concurrency")]
pub mod concurrent;
pub mod limit;
pub mod tagged;
pub mod traits;

#[cfg(feature = "concurrency")]
pub use concurrent::{ConcurrentLimitMap, ConcurrentTaggedLimitMap};
pub use limit::LimitMap;
pub use tagged::TaggedLimitMap;
pub use traits::{SetOutcome, StoreFull, StoreMetrics};
