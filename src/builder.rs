//! Builder for [`SingleFlight`] front ends.
//!
//! Hides the wiring between a store and its lock registry.
//!
//! ## Example
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use derivekit::builder::FlightBuilder;
//!
//! let flight = FlightBuilder::new()
//!     .registry_capacity(64)
//!     .try_build_memory::<u64, Vec<u8>>(1_000)
//!     .unwrap();
//! let bytes = flight
//!     .get_or_compute(&796, |_| Ok::<_, Infallible>(vec![3, 1, 4]))
//!     .unwrap();
//! assert_eq!(bytes.as_slice(), &[3, 1, 4]);
//! ```

use std::fmt::Debug;
#[cfg(feature = "fs")]
use std::fmt::Display;
use std::hash::Hash;
#[cfg(feature = "fs")]
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::flight::SingleFlight;
#[cfg(feature = "fs")]
use crate::store::fs::DirStore;
use crate::store::memory::MemoryStore;
use crate::store::traits::ArtifactStore;
#[cfg(feature = "fs")]
use crate::store::traits::StoreError;
use crate::sync::KeyedLock;

/// Builder for creating single-flight instances.
#[derive(Debug, Clone, Default)]
pub struct FlightBuilder {
    registry_capacity: usize,
}

impl FlightBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the lock registry for `capacity` concurrently computed keys.
    pub fn registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity;
        self
    }

    /// Build around an existing store.
    pub fn build<K, V, St>(self, store: St) -> SingleFlight<K, V, St>
    where
        K: Eq + Hash + Clone + Debug,
        St: ArtifactStore<K, V>,
    {
        SingleFlight::with_locks(store, KeyedLock::with_capacity(self.registry_capacity))
    }

    /// Build around a new in-memory store of `capacity` artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_build_memory<K, V>(
        self,
        capacity: usize,
    ) -> Result<SingleFlight<K, V, MemoryStore<K, V>>, ConfigError>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync,
        V: Send + Sync,
    {
        let store = MemoryStore::try_new(capacity)?;
        Ok(self.build(store))
    }

    /// Build around a directory store at `dir` using file extension `ext`.
    #[cfg(feature = "fs")]
    pub fn try_build_dir<K>(
        self,
        dir: impl Into<PathBuf>,
        ext: &str,
    ) -> Result<SingleFlight<K, Vec<u8>, DirStore>, StoreError>
    where
        K: Eq + Hash + Clone + Debug + Display + Send + Sync,
    {
        let store = DirStore::open(dir, ext)?;
        Ok(self.build(store))
    }
}
