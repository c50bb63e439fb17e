//! Storage contract for computed artifacts.
//!
//! Stores own artifact lifecycle entirely; the single-flight layer only ever
//! calls [`ArtifactStore::get`] and [`ArtifactStore::put`]. This keeps the
//! orchestration independent of where bytes live (memory, disk, object
//! storage).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::error::ConfigError;

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
}

/// Atomic counters backing [`StoreMetrics`].
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a lookup result and passes it through.
    pub(crate) fn record<T>(&self, found: Option<T>) -> Option<T> {
        match found {
            Some(value) => {
                self.inc_hit();
                Some(value)
            },
            None => {
                self.inc_miss();
                None
            },
        }
    }
}

/// Error returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is at capacity and cannot accept a new key.
    #[error("store is full")]
    Full,

    /// The key cannot be mapped onto the store's namespace.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The store was opened with invalid parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Get/put contract consumed by [`SingleFlight`](crate::flight::SingleFlight).
pub trait ArtifactStore<K, V>: Send + Sync {
    /// Fetch an artifact by key; `Ok(None)` means absent.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError>;

    /// Store (or overwrite) the artifact for `key`.
    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError>;

    /// Snapshot the store's current metrics.
    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }
}

impl<K, V, T> ArtifactStore<K, V> for Arc<T>
where
    T: ArtifactStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn metrics(&self) -> StoreMetrics {
        (**self).metrics()
    }
}
