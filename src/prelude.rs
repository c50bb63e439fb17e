pub use crate::builder::FlightBuilder;
pub use crate::ds::{MAX_BASE, Permutation, StackText, TextBuilder};
pub use crate::error::{BufferExhausted, ConfigError, InvalidArgument, InvariantError};
pub use crate::flight::{FlightError, FlightMetrics, SingleFlight};
#[cfg(feature = "fs")]
pub use crate::store::fs::DirStore;
pub use crate::store::memory::MemoryStore;
pub use crate::store::traits::{ArtifactStore, StoreError, StoreMetrics};
pub use crate::sync::{BorrowHandle, KeyedLock};
