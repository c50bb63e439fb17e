//! Error types for the derivekit library.
//!
//! ## Key Components
//!
//! - [`InvalidArgument`]: Returned by the permutation codec when a base,
//!   offset, number, or digit sequence is out of range.
//! - [`BufferExhausted`]: Returned by [`TextBuilder`](crate::ds::TextBuilder)
//!   when a write would overflow its fixed buffer.
//! - [`ConfigError`]: Returned when builder or store parameters are invalid
//!   (e.g. zero capacity).
//! - [`InvariantError`]: Returned when internal registry invariants are
//!   violated (debug-only `check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use derivekit::ds::Permutation;
//! use derivekit::error::InvalidArgument;
//!
//! let bad = Permutation::create(1, 1, 0).unwrap_err();
//! assert!(matches!(bad, InvalidArgument::Base { base: 1, .. }));
//! assert!(bad.to_string().contains("base"));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// InvalidArgument
// ---------------------------------------------------------------------------

/// Error returned when permutation codec input is out of range.
///
/// Always recoverable by supplying valid input; the codec never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    /// Base outside `[2, max]`.
    #[error("base {base} is outside [2, {max}]")]
    Base { base: usize, max: usize },

    /// Offset outside `[0, base - 1]`.
    #[error("offset {offset} is outside [0, {}] for base {base}", .base.saturating_sub(1))]
    Offset { offset: u8, base: usize },

    /// Permutation number outside `[1, max]`.
    #[error("permutation number {number} is outside [1, {max}]")]
    Number { number: u64, max: u64 },

    /// Sequence is not a permutation of `0..base`.
    #[error("sequence is not a permutation of 0..{base}: {reason}")]
    Sequence { base: usize, reason: &'static str },
}

// ---------------------------------------------------------------------------
// BufferExhausted
// ---------------------------------------------------------------------------

/// Error returned when a fixed-capacity text buffer cannot hold a write.
///
/// The buffer contents before the failed call remain valid and reusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer is exhausted: {remaining} bytes remaining")]
pub struct BufferExhausted {
    /// Free bytes at the time of the failed write.
    pub remaining: usize,
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`MemoryStore::try_new`](crate::store::memory::MemoryStore::try_new) and
/// [`FlightBuilder::try_build_memory`](crate::builder::FlightBuilder::try_build_memory).
///
/// # Example
///
/// ```
/// use derivekit::store::memory::MemoryStore;
///
/// let err = MemoryStore::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
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

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Produced by [`KeyedLock::check_invariants`](crate::sync::KeyedLock::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
