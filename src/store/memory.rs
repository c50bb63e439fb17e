//! In-memory artifact store.
//!
//! ## Architecture
//! - Artifacts live in a `HashMap<K, Arc<V>>` behind a `parking_lot::RwLock`.
//! - Capacity is enforced by entry count, not byte size. There is no
//!   eviction; a full store rejects new keys with [`StoreError::Full`] and
//!   still accepts overwrites of existing keys.
//! - Hit/miss/insert/update counters are atomics so reads stay shared.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//!
//! use derivekit::store::memory::MemoryStore;
//! use derivekit::store::traits::ArtifactStore;
//!
//! let store: MemoryStore<u64, String> = MemoryStore::try_new(2).unwrap();
//! store.put(1, Arc::new("a".to_string())).unwrap();
//! assert!(store.contains(&1));
//! assert_eq!(store.get(&1).unwrap().as_deref(), Some(&"a".to_string()));
//! ```
//!
//! ## Thread Safety
//! - `MemoryStore` is `Send + Sync` when `K`, `V`, and `S` are.
use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ConfigError;
use crate::store::traits::{ArtifactStore, StoreCounters, StoreError, StoreMetrics};

/// Concurrent HashMap-backed artifact store bounded by entry count.
#[derive(Debug)]
pub struct MemoryStore<K, V, S = RandomState> {
    map: RwLock<HashMap<K, Arc<V>, S>>,
    capacity: usize,
    metrics: StoreCounters,
}

impl<K, V> MemoryStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create a store holding at most `capacity` artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Self::try_with_hasher(capacity, RandomState::new())
    }

    /// Create a store with no practical entry limit.
    pub fn unbounded() -> Self {
        Self::from_parts(usize::MAX, RandomState::new())
    }
}

impl<K, V, S> MemoryStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create a store with a custom hasher.
    pub fn try_with_hasher(capacity: usize, hasher: S) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("store capacity must be greater than zero"));
        }
        Ok(Self::from_parts(capacity, hasher))
    }

    fn from_parts(capacity: usize, hasher: S) -> Self {
        // Cap the up-front allocation; `capacity` may be effectively unbounded.
        let initial = capacity.min(1024);
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(initial, hasher)),
            capacity,
            metrics: StoreCounters::default(),
        }
    }

    /// Check whether a key exists without touching metrics.
    pub fn contains(&self, key: &K) -> bool {
        self.map.read().contains_key(key)
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Maximum number of artifacts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove an artifact by key.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.map.write().remove(key)
    }

    /// Remove all artifacts.
    pub fn clear(&self) {
        self.map.write().clear()
    }
}

impl<K, V, S> ArtifactStore<K, V> for MemoryStore<K, V, S>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        let found = self.map.read().get(key).cloned();
        Ok(self.metrics.record(found))
    }

    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError> {
        let mut map = self.map.write();
        if !map.contains_key(&key) && map.len() >= self.capacity {
            return Err(StoreError::Full);
        }
        if map.insert(key, value).is_some() {
            self.metrics.inc_update();
        } else {
            self.metrics.inc_insert();
        }
        Ok(())
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}
