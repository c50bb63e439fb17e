//! Reference-counted registry of per-key exclusive locks.
//!
//! ## Architecture
//!
//! ```text
//!   KeyedLock
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ entries: Mutex<HashMap<K, LockEntry>>   (registry guard) │
//!   │                                                          │
//!   │   "A00796" ─► LockEntry { refs: 3, sem: Arc<BinarySem> } │
//!   │   "A01113" ─► LockEntry { refs: 1, sem: Arc<BinarySem> } │
//!   └──────────────────────────────────────────────────────────┘
//!            ▲ borrow: refs += 1          ▲ release: refs -= 1,
//!            │ (insert if absent)         │ remove + retire at 0
//!            │                            │
//!        BorrowHandle ── acquire() / acquire_async() ──► sem
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`KeyedLock::borrow`] takes the registry guard, bumps (or creates) the
//!    entry for the key, and returns a [`BorrowHandle`]. The guard is never
//!    held while waiting on the per-key semaphore.
//! 2. [`BorrowHandle::acquire`] (blocking) or
//!    [`BorrowHandle::acquire_async`] (suspending) takes the per-key
//!    semaphore. Both wait on the same state, so mixed callers interoperate.
//! 3. [`BorrowHandle::release`] frees the semaphore if it was taken, then
//!    under the registry guard decrements the count and removes the entry
//!    when it reaches zero. Dropping a handle performs the same release.
//!
//! Decrement-and-remove happens under the same guard as `borrow`, so a new
//! borrower either finds the live entry (and keeps it alive) or finds no
//! entry and creates a fresh one. It can never observe a zero count or be
//! handed a retired semaphore.
//!
//! ## Example Usage
//!
//! ```
//! use derivekit::sync::KeyedLock;
//!
//! let locks: KeyedLock<&str> = KeyedLock::new();
//! {
//!     let mut handle = locks.borrow("A000796");
//!     handle.acquire();
//!     assert_eq!(locks.ref_count(&"A000796"), 1);
//!     handle.release();
//! }
//! assert!(locks.is_empty());
//!
//! // Scoped form: released when the guard drops.
//! let guard = locks.lock("A001113");
//! assert!(guard.is_acquired());
//! drop(guard);
//! assert!(locks.is_empty());
//! ```
//!
//! ## Thread Safety
//!
//! `KeyedLock` is `Send + Sync`; share it by reference or `Arc`. Handles
//! borrow the registry and must not outlive a single critical section.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::error::InvariantError;
use crate::sync::semaphore::BinarySemaphore;

#[derive(Debug)]
struct LockEntry {
    refs: usize,
    semaphore: Arc<BinarySemaphore>,
}

/// Registry handing out one exclusive lock per distinct key.
///
/// Entries are created on first borrow and destroyed when the last
/// outstanding [`BorrowHandle`] for the key is released.
pub struct KeyedLock<K, S = FxBuildHasher> {
    entries: Mutex<HashMap<K, LockEntry, S>>,
}

impl<K> KeyedLock<K, FxBuildHasher>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher)
    }

    /// Creates an empty registry with room for `capacity` concurrent keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

impl<K, S> KeyedLock<K, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Creates an empty registry with a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates an empty registry with room for `capacity` concurrent keys
    /// and a custom hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }

    /// Registers interest in `key` and returns an unacquired handle.
    pub fn borrow(&self, key: K) -> BorrowHandle<'_, K, S> {
        let semaphore = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.refs += 1;
                    tracing::trace!(refs = entry.refs, "keyed_lock.borrow");
                    Arc::clone(&entry.semaphore)
                },
                None => {
                    let semaphore = Arc::new(BinarySemaphore::new());
                    entries.insert(
                        key.clone(),
                        LockEntry {
                            refs: 1,
                            semaphore: Arc::clone(&semaphore),
                        },
                    );
                    tracing::trace!(refs = 1, "keyed_lock.borrow.create");
                    semaphore
                },
            }
        };

        BorrowHandle {
            owner: self,
            key,
            semaphore,
            acquired: false,
            released: false,
        }
    }

    /// Borrows `key` and blocks until its lock is held.
    pub fn lock(&self, key: K) -> BorrowHandle<'_, K, S> {
        let mut handle = self.borrow(key);
        handle.acquire();
        handle
    }

    /// Borrows `key` and suspends until its lock is held.
    pub async fn lock_async(&self, key: K) -> BorrowHandle<'_, K, S> {
        let mut handle = self.borrow(key);
        handle.acquire_async().await;
        handle
    }

    /// Number of keys with at least one outstanding handle.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no key is borrowed.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns `true` if `key` has an entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Outstanding handles for `key` (0 if absent).
    pub fn ref_count(&self, key: &K) -> usize {
        self.entries.lock().get(key).map_or(0, |entry| entry.refs)
    }

    /// Verifies registry invariants.
    ///
    /// Every entry must have a positive count, and each outstanding handle
    /// must still own the entry's semaphore.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let entries = self.entries.lock();
        for entry in entries.values() {
            if entry.refs == 0 {
                return Err(InvariantError::new("registry holds an entry with zero refs"));
            }
            // Released handles may still hold a clone until they drop.
            let owners = Arc::strong_count(&entry.semaphore);
            if owners < entry.refs + 1 {
                return Err(InvariantError::new(format!(
                    "entry has {} refs but only {} semaphore owners",
                    entry.refs, owners
                )));
            }
            if entry.semaphore.available() > 1 {
                return Err(InvariantError::new("semaphore available count above 1"));
            }
        }
        Ok(())
    }

    /// Drops one reference to `key`, removing the entry at zero.
    ///
    /// Returns `true` if the entry was removed.
    fn return_entry(&self, key: &K) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(key)
            .expect("returned a handle whose key has no entry");
        entry.refs -= 1;
        if entry.refs > 0 {
            tracing::trace!(refs = entry.refs, "keyed_lock.return");
            return false;
        }
        if let Some(entry) = entries.remove(key) {
            entry.semaphore.retire();
        }
        tracing::trace!("keyed_lock.return.remove");
        true
    }
}

impl<K> Default for KeyedLock<K, FxBuildHasher>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> fmt::Debug for KeyedLock<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLock")
            .field("keys", &self.entries.lock().len())
            .finish()
    }
}

/// One caller's claim on a key's lock.
///
/// Obtained from [`KeyedLock::borrow`]. Releasing (explicitly or by drop)
/// unlocks the key if this handle acquired it and returns the handle's
/// reference to the registry.
#[must_use = "a borrowed key stays registered until the handle is released"]
pub struct BorrowHandle<'a, K, S = FxBuildHasher>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    owner: &'a KeyedLock<K, S>,
    key: K,
    semaphore: Arc<BinarySemaphore>,
    acquired: bool,
    released: bool,
}

impl<K, S> BorrowHandle<'_, K, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// The borrowed key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns `true` while this handle holds the key's lock.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    fn check_can_acquire(&self) {
        assert!(!self.released, "acquire after release");
        assert!(!self.acquired, "handle already holds the lock");
    }

    /// Blocks the current thread until the key's lock is held.
    ///
    /// # Panics
    ///
    /// Panics if the handle already acquired or was released.
    pub fn acquire(&mut self) {
        self.check_can_acquire();
        self.semaphore.acquire();
        self.acquired = true;
        tracing::trace!("keyed_lock.acquire");
    }

    /// Suspends the current task until the key's lock is held.
    ///
    /// Cancel-safe: if the future is dropped first, the handle stays
    /// unacquired and still returns its reference on release or drop.
    ///
    /// # Panics
    ///
    /// Panics if the handle already acquired or was released.
    pub async fn acquire_async(&mut self) {
        self.check_can_acquire();
        self.semaphore.acquire_async().await;
        self.acquired = true;
        tracing::trace!("keyed_lock.acquire_async");
    }

    /// Takes the key's lock only if it is free right now.
    ///
    /// # Panics
    ///
    /// Panics if the handle already acquired or was released.
    pub fn try_acquire(&mut self) -> bool {
        self.check_can_acquire();
        self.acquired = self.semaphore.try_acquire();
        self.acquired
    }

    /// Blocks up to `timeout` for the key's lock.
    ///
    /// `Duration::MAX` (or any timeout past the representable deadline)
    /// waits as long as needed.
    ///
    /// # Panics
    ///
    /// Panics if the handle already acquired or was released.
    pub fn acquire_timeout(&mut self, timeout: Duration) -> bool {
        self.check_can_acquire();
        self.acquired = self.semaphore.acquire_timeout(timeout);
        self.acquired
    }

    /// Unlocks (if held) and returns this handle's reference.
    ///
    /// Later calls are no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.acquired {
            self.acquired = false;
            self.semaphore.release();
        }
        self.owner.return_entry(&self.key);
    }
}

impl<K, S> Drop for BorrowHandle<'_, K, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn drop(&mut self) {
        if !self.released {
            if self.acquired {
                tracing::debug!("keyed_lock handle dropped while holding its lock");
            }
            self.release();
        }
    }
}

impl<K, S> fmt::Debug for BorrowHandle<'_, K, S>
where
    K: Eq + Hash + Clone + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BorrowHandle")
            .field("key", &self.key)
            .field("acquired", &self.acquired)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn borrow_counts_and_release_removes() {
        let locks = KeyedLock::new();
        let mut a = locks.borrow("k");
        let mut b = locks.borrow("k");
        assert_eq!(locks.ref_count(&"k"), 2);
        assert_eq!(locks.len(), 1);
        locks.check_invariants().unwrap();

        a.acquire();
        assert!(!b.try_acquire());
        a.release();
        assert_eq!(locks.ref_count(&"k"), 1);

        assert!(b.try_acquire());
        b.release();
        assert!(!locks.contains_key(&"k"));
        assert!(locks.is_empty());
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let locks = KeyedLock::new();
        let _a = locks.lock(1u64);
        let mut b = locks.borrow(2u64);
        assert!(b.try_acquire());
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn release_is_idempotent() {
        let locks = KeyedLock::new();
        let mut handle = locks.lock("k");
        handle.release();
        handle.release();
        drop(handle);
        assert!(locks.is_empty());
    }

    #[test]
    fn unacquired_handle_returns_reference_on_drop() {
        let locks = KeyedLock::new();
        let holder = locks.lock("k");
        {
            let waiter = locks.borrow("k");
            assert_eq!(locks.ref_count(&"k"), 2);
            assert!(!waiter.is_acquired());
        }
        assert_eq!(locks.ref_count(&"k"), 1);
        drop(holder);
        assert!(locks.is_empty());
    }

    #[test]
    fn timed_out_handle_still_releases_cleanly() {
        let locks = KeyedLock::new();
        let holder = locks.lock("k");
        let mut waiter = locks.borrow("k");
        assert!(!waiter.acquire_timeout(Duration::from_millis(10)));
        waiter.release();
        drop(holder);
        assert!(locks.is_empty());
    }

    #[test]
    fn unbounded_timeout_acquires_free_key() {
        let locks = KeyedLock::new();
        for _ in 0..100 {
            let mut handle = locks.borrow(1u32);
            assert!(handle.acquire_timeout(Duration::MAX));
            assert!(handle.is_acquired());
            drop(handle);
        }
        assert!(locks.is_empty());
        locks.check_invariants().unwrap();
    }

    #[test]
    fn unbounded_timeout_waits_for_holder() {
        let locks = KeyedLock::new();
        let holder = locks.lock("k");
        thread::scope(|scope| {
            let waiter = scope.spawn(|| {
                let mut handle = locks.borrow("k");
                handle.acquire_timeout(Duration::MAX)
            });
            thread::sleep(Duration::from_millis(20));
            drop(holder);
            assert!(waiter.join().unwrap());
        });
        assert!(locks.is_empty());
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn double_acquire_panics() {
        let locks = KeyedLock::new();
        let mut handle = locks.lock("k");
        handle.acquire();
    }

    #[test]
    fn concurrent_holders_are_mutually_exclusive() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;

        let locks: KeyedLock<&str> = KeyedLock::new();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    barrier.wait();
                    for _ in 0..ROUNDS {
                        let guard = locks.lock("shared");
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        drop(guard);
                    }
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
        locks.check_invariants().unwrap();
    }
}
