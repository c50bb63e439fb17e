//! derivekit: compute-once artifact caching over keyed locks, plus the
//! Lehmer-code permutation codec and fixed-capacity text buffers used to
//! present those artifacts.
//!
//! ## Modules
//!
//! - [`sync`]: reference-counted per-key exclusive locks usable from threads
//!   and async tasks.
//! - [`flight`]: single-flight get-or-compute over an artifact store.
//! - [`store`]: the store contract and in-memory / directory backends.
//! - [`ds`]: value types; [`Permutation`](ds::Permutation) and
//!   [`TextBuilder`](ds::TextBuilder).
//!
//! ## Features
//!
//! - `fs` (default): the directory-backed `store::fs::DirStore` and
//!   `FlightBuilder::try_build_dir`. Pulls in `tempfile`.

pub mod builder;
pub mod ds;
pub mod error;
pub mod flight;
pub mod prelude;
pub mod store;
pub mod sync;
