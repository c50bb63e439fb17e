pub mod permutation;
pub mod text_builder;

pub use permutation::{MAX_BASE, Permutation};
pub use text_builder::{DEFAULT_TEXT_CAPACITY, StackText, TextBuilder};
