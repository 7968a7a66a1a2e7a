pub use crate::builder::{LimitMapBuilder, LimitMapConfig};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::random::OnExhausted;
#[cfg(feature = "concurrency")]
pub use crate::store::concurrent::{ConcurrentLimitMap, ConcurrentTaggedLimitMap};
pub use crate::store::limit::LimitMap;
pub use crate::store::tagged::TaggedLimitMap;
pub use crate::store::traits::{SetOutcome, StoreFull, StoreMetrics};
pub use crate::traits::{ConcurrentCache, CoreCache, CoverRule, MutableCache, SelectRule};
