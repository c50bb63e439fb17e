pub mod keyed_lock;
mod semaphore;

pub use keyed_lock::{BorrowHandle, KeyedLock};
