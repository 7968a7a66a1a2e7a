//! limitmap: bounded key-value stores over a dense slot array.
//!
//! [`LimitMap`](store::limit::LimitMap) keeps at most `capacity` entries in
//! contiguous slots with an O(1) key index. Once full, a new key displaces a
//! randomly probed victim (optionally steered by a caller cover rule), or the
//! store doubles its slots when configured to grow.
//! [`TaggedLimitMap`](store::tagged::TaggedLimitMap) adds a two-level
//! classification index for stratified sampling.
//!
//! ```
//! use limitmap::prelude::*;
//!
//! let mut map = LimitMapBuilder::new(2).seed(1).build::<&str>();
//! map.set("a", 1).unwrap();
//! map.set("b", 2).unwrap();
//! assert!(matches!(map.set("c", 3), Ok(SetOutcome::Evicted { .. })));
//! assert_eq!(map.len(), 2);
//! ```

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod store;
pub mod traits;
