//! Error types for the limitmap library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (zero capacity, zero probe budget, a ceiling below the initial capacity).
//! - [`InvariantError`]: Returned by `check_invariants` when the slot store,
//!   key index and classification index have drifted apart.
//!
//! Rejected admissions are reported with
//! [`StoreFull`](crate::store::traits::StoreFull), not with these types.
//!
//! ## Example Usage
//!
//! ```
//! use limitmap::error::ConfigError;
//! use limitmap::store::limit::LimitMap;
//!
//! let map: Result<LimitMap<String, i32>, ConfigError> = LimitMap::try_new(100, false);
//! assert!(map.is_ok());
//!
//! // Zero capacity is caught at construction time
//! let bad = LimitMap::<String, i32>::try_new(0, false);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal store invariants are violated.
///
/// Produced by `check_invariants` on the store types (e.g.
/// [`LimitMap::check_invariants`](crate::store::limit::LimitMap::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when store configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`LimitMap::try_new`](crate::store::limit::LimitMap::try_new) and the
/// builder `try_build*` methods.
///
/// # Example
///
/// ```
/// use limitmap::builder::LimitMapBuilder;
///
/// let err = LimitMapBuilder::<u64>::new(0).try_build::<u64>().unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
