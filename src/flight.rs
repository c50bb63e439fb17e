//! Single-flight artifact cache.
//!
//! Computes an expensive, deterministic artifact for a key at most once at a
//! time, sharing the result through an [`ArtifactStore`].
//!
//! ## Architecture
//!
//! ```text
//!   get_or_compute(key, f)
//!        │
//!        ▼
//!   store.get(key) ── hit ──────────────────────────────► return
//!        │ miss
//!        ▼
//!   locks.lock(key)            (waits while another caller computes)
//!        │
//!        ▼
//!   store.get(key) ── hit ── release ───────────────────► return
//!        │ miss
//!        ▼
//!   f(key) ── Err ── release (nothing cached) ──────────► Err(Compute)
//!        │ Ok
//!        ▼
//!   store.put(key) ── release ──────────────────────────► return
//! ```
//!
//! The per-key lock is a scoped [`BorrowHandle`](crate::sync::BorrowHandle),
//! so it is released on every exit path, including panics in `f`.
//!
//! ## Guarantees
//!
//! - For a fixed key, at most one invocation of the compute function is in
//!   flight across all callers of the same `SingleFlight`.
//! - A failed computation leaves no cache entry; the next caller retries.
//! - A computed artifact that the store refuses is still returned to its
//!   caller and logged at `warn`; the key stays uncached.
//!
//! ## Example Usage
//!
//! ```
//! use std::convert::Infallible;
//!
//! use derivekit::flight::SingleFlight;
//! use derivekit::store::memory::MemoryStore;
//!
//! let flight = SingleFlight::new(MemoryStore::<u32, String>::unbounded());
//! let value = flight
//!     .get_or_compute(&7, |k| Ok::<_, Infallible>(format!("artifact {k}")))
//!     .unwrap();
//! assert_eq!(*value, "artifact 7");
//! assert_eq!(flight.metrics().computes, 1);
//! ```

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::store::traits::{ArtifactStore, StoreError};
use crate::sync::KeyedLock;

/// Error returned by [`SingleFlight`] lookups.
#[derive(Debug, Error)]
pub enum FlightError<E> {
    /// Reading the store failed.
    #[error("artifact store lookup failed")]
    Store(#[source] StoreError),

    /// The compute function failed; nothing was cached.
    #[error("artifact computation failed")]
    Compute(#[source] E),
}

impl<E> FlightError<E> {
    /// Returns the compute error, if that is what failed.
    pub fn into_compute(self) -> Option<E> {
        match self {
            Self::Compute(err) => Some(err),
            Self::Store(_) => None,
        }
    }
}

/// Snapshot of single-flight counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlightMetrics {
    /// Lookups satisfied by the first, unlocked store read.
    pub hits: u64,
    /// Lookups that missed the first read and took the key lock.
    pub misses: u64,
    /// Misses satisfied by the re-check after taking the lock.
    pub waited_hits: u64,
    /// Compute function invocations.
    pub computes: u64,
    /// Compute invocations that returned an error.
    pub compute_failures: u64,
    /// Computed artifacts the store refused to keep.
    pub store_failures: u64,
}

#[derive(Debug, Default)]
struct FlightCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    waited_hits: AtomicU64,
    computes: AtomicU64,
    compute_failures: AtomicU64,
    store_failures: AtomicU64,
}

impl FlightCounters {
    fn snapshot(&self) -> FlightMetrics {
        FlightMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            waited_hits: self.waited_hits.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Get-or-compute front end over an [`ArtifactStore`].
pub struct SingleFlight<K, V, St> {
    store: St,
    locks: KeyedLock<K>,
    counters: FlightCounters,
    _value: PhantomData<fn() -> V>,
}

impl<K, V, St> SingleFlight<K, V, St>
where
    K: Eq + Hash + Clone + fmt::Debug,
    St: ArtifactStore<K, V>,
{
    /// Wraps `store` with a fresh lock registry.
    pub fn new(store: St) -> Self {
        Self::with_locks(store, KeyedLock::new())
    }

    pub(crate) fn with_locks(store: St, locks: KeyedLock<K>) -> Self {
        Self {
            store,
            locks,
            counters: FlightCounters::default(),
            _value: PhantomData,
        }
    }

    /// The wrapped store.
    pub fn store(&self) -> &St {
        &self.store
    }

    /// The per-key lock registry.
    pub fn locks(&self) -> &KeyedLock<K> {
        &self.locks
    }

    pub fn metrics(&self) -> FlightMetrics {
        self.counters.snapshot()
    }

    /// Returns the cached artifact for `key`, computing it with `compute` on
    /// a miss. Blocks the current thread while another caller computes the
    /// same key.
    ///
    /// # Errors
    ///
    /// [`FlightError::Store`] if a store read fails, [`FlightError::Compute`]
    /// if `compute` fails.
    pub fn get_or_compute<F, E>(&self, key: &K, compute: F) -> Result<Arc<V>, FlightError<E>>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(hit) = self.first_check(key).map_err(FlightError::Store)? {
            return Ok(hit);
        }

        let _guard = self.locks.lock(key.clone());
        if let Some(hit) = self.second_check(key).map_err(FlightError::Store)? {
            return Ok(hit);
        }

        tracing::debug!(key = ?key, "single_flight.compute");
        FlightCounters::inc(&self.counters.computes);
        let result = compute(key);
        self.finish(key, result)
    }

    /// Async form of [`get_or_compute`](Self::get_or_compute); suspends
    /// instead of blocking while another caller computes the same key.
    ///
    /// Blocking and async callers share one lock registry, so the
    /// single-flight guarantee holds across both.
    pub async fn get_or_compute_async<F, Fut, E>(
        &self,
        key: &K,
        compute: F,
    ) -> Result<Arc<V>, FlightError<E>>
    where
        F: FnOnce(&K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.first_check(key).map_err(FlightError::Store)? {
            return Ok(hit);
        }

        let _guard = self.locks.lock_async(key.clone()).await;
        if let Some(hit) = self.second_check(key).map_err(FlightError::Store)? {
            return Ok(hit);
        }

        tracing::debug!(key = ?key, "single_flight.compute_async");
        FlightCounters::inc(&self.counters.computes);
        let result = compute(key).await;
        self.finish(key, result)
    }

    fn first_check(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        let found = self.store.get(key)?;
        if found.is_some() {
            FlightCounters::inc(&self.counters.hits);
        } else {
            FlightCounters::inc(&self.counters.misses);
        }
        Ok(found)
    }

    /// Re-read under the key lock; another caller may have just finished.
    fn second_check(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        let found = self.store.get(key)?;
        if found.is_some() {
            tracing::debug!(key = ?key, "single_flight.waited_hit");
            FlightCounters::inc(&self.counters.waited_hits);
        }
        Ok(found)
    }

    /// Stores a successful result; must run while the key lock is held.
    fn finish<E>(&self, key: &K, result: Result<V, E>) -> Result<Arc<V>, FlightError<E>> {
        let value = match result {
            Ok(value) => Arc::new(value),
            Err(err) => {
                tracing::debug!(key = ?key, "single_flight.compute_failed");
                FlightCounters::inc(&self.counters.compute_failures);
                return Err(FlightError::Compute(err));
            },
        };

        match self.store.put(key.clone(), Arc::clone(&value)) {
            Ok(()) => tracing::debug!(key = ?key, "single_flight.stored"),
            Err(err) => {
                tracing::warn!(key = ?key, error = %err, "computed artifact was not stored");
                FlightCounters::inc(&self.counters.store_failures);
            },
        }
        Ok(value)
    }
}

impl<K, V, St> fmt::Debug for SingleFlight<K, V, St>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("store", &self.store)
            .field("locks", &self.locks)
            .field("metrics", &self.counters.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::store::memory::MemoryStore;

    #[derive(Debug, PartialEq, Eq, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn computes_once_then_hits() {
        let flight = SingleFlight::new(MemoryStore::unbounded());
        let calls = Cell::new(0);
        let compute = |k: &u32| {
            calls.set(calls.get() + 1);
            Ok::<_, Boom>(k * 10)
        };

        assert_eq!(*flight.get_or_compute(&4, compute).unwrap(), 40);
        assert_eq!(*flight.get_or_compute(&4, compute).unwrap(), 40);
        assert_eq!(calls.get(), 1);

        let metrics = flight.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.computes, 1);
        assert!(flight.locks().is_empty());
    }

    #[test]
    fn failed_compute_caches_nothing_and_retries() {
        let flight = SingleFlight::new(MemoryStore::<u32, u32>::unbounded());

        let err = flight.get_or_compute(&1, |_| Err(Boom)).unwrap_err();
        assert_eq!(err.into_compute(), Some(Boom));
        assert!(!flight.store().contains(&1));
        assert!(flight.locks().is_empty());

        assert_eq!(*flight.get_or_compute(&1, |_| Ok::<_, Boom>(9)).unwrap(), 9);
        let metrics = flight.metrics();
        assert_eq!(metrics.computes, 2);
        assert_eq!(metrics.compute_failures, 1);
    }

    #[test]
    fn store_refusal_still_returns_value() {
        let store = MemoryStore::try_new(1).unwrap();
        let flight = SingleFlight::new(store);
        flight.get_or_compute(&1, |_| Ok::<_, Boom>(1)).unwrap();

        assert_eq!(*flight.get_or_compute(&2, |_| Ok::<_, Boom>(2)).unwrap(), 2);
        assert!(!flight.store().contains(&2));
        assert_eq!(flight.metrics().store_failures, 1);
    }

    #[test]
    fn panicking_compute_releases_key() {
        let flight = SingleFlight::new(MemoryStore::<u32, u32>::unbounded());
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = flight.get_or_compute(&3, |_| -> Result<u32, Boom> { panic!("compute panicked") });
        }));
        assert!(outcome.is_err());
        assert!(flight.locks().is_empty());
        assert_eq!(*flight.get_or_compute(&3, |_| Ok::<_, Boom>(3)).unwrap(), 3);
    }

    #[tokio::test]
    async fn async_compute_once_then_hits() {
        let flight = SingleFlight::new(MemoryStore::<&str, String>::unbounded());
        let first = flight
            .get_or_compute_async(&"A000796", |k| {
                let k = k.to_string();
                async move { Ok::<_, Boom>(format!("{k}:expansion")) }
            })
            .await
            .unwrap();
        let second = flight
            .get_or_compute_async(&"A000796", |_| async { Err(Boom) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(flight.metrics().computes, 1);
    }
}
