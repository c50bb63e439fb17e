//! Binary semaphore shared by blocking threads and async tasks.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   acquire() ───►│ available: Mutex<usize>      │◄─── acquire_async()
//!   (Condvar)     │   1 = free, 0 = held         │     (Notify)
//!                 └──────────────┬───────────────┘
//!                                │ release(): set 1, wake one of each
//!                     ┌──────────┴──────────┐
//!                     ▼                     ▼
//!              Condvar::notify_one   Notify::notify_one
//! ```
//!
//! Both wait paths observe the same counter, so a thread blocked in
//! [`BinarySemaphore::acquire`] and a task suspended in
//! [`BinarySemaphore::acquire_async`] contend for one lock. A release wakes
//! one waiter of each kind; whichever loses the race re-checks and waits
//! again. No FIFO ordering is provided.
//!
//! ## Protocol Violations
//!
//! Releasing a semaphore that is not held and retiring one that is still
//! held are programmer errors and panic.

use std::pin::pin;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

#[derive(Debug)]
pub(crate) struct BinarySemaphore {
    available: Mutex<usize>,
    blocking: Condvar,
    suspending: Notify,
}

impl BinarySemaphore {
    /// Creates a free semaphore.
    pub(crate) fn new() -> Self {
        Self {
            available: Mutex::new(1),
            blocking: Condvar::new(),
            suspending: Notify::new(),
        }
    }

    /// 1 when free, 0 when held.
    pub(crate) fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Takes the semaphore if it is free.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 1 {
            *available = 0;
            true
        } else {
            false
        }
    }

    /// Blocks the current thread until the semaphore is taken.
    pub(crate) fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.blocking.wait(&mut available);
        }
        *available = 0;
    }

    /// Blocks until the semaphore is taken or `timeout` elapses.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub(crate) fn acquire_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.acquire();
            return true;
        };
        let mut available = self.available.lock();
        while *available == 0 {
            if self
                .blocking
                .wait_until(&mut available, deadline)
                .timed_out()
            {
                break;
            }
        }
        if *available == 1 {
            *available = 0;
            true
        } else {
            false
        }
    }

    /// Suspends the current task until the semaphore is taken.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// semaphore untouched.
    pub(crate) async fn acquire_async(&self) {
        loop {
            // Register interest before checking so a release between the
            // check and the await is not lost.
            let mut notified = pin!(self.suspending.notified());
            notified.as_mut().enable();
            if self.try_acquire() {
                return;
            }
            notified.await;
        }
    }

    /// Returns the semaphore to the free state and wakes waiters.
    ///
    /// # Panics
    ///
    /// Panics if the semaphore is not currently held.
    pub(crate) fn release(&self) {
        {
            let mut available = self.available.lock();
            assert_eq!(*available, 0, "released a semaphore that is not held");
            *available = 1;
        }
        self.blocking.notify_one();
        self.suspending.notify_one();
    }

    /// Final check before the owning entry is dropped.
    ///
    /// # Panics
    ///
    /// Panics if someone still holds the semaphore.
    pub(crate) fn retire(&self) {
        assert_eq!(
            self.available(),
            1,
            "retired a semaphore that is still held"
        );
    }
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}
