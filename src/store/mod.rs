#[cfg(feature = "fs")]
pub mod fs;
pub mod memory;
pub mod traits;

#[cfg(feature = "fs")]
pub use fs::DirStore;
pub use memory::MemoryStore;
pub use traits::{ArtifactStore, StoreError, StoreMetrics};
