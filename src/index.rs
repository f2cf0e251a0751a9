//! Index side of the engine: the reader interface searches consume, its
//! per-reader cache, term vectors for highlighting, and an in-memory
//! implementation.

pub mod analysis;
pub mod cache;
pub mod document;
#[allow(clippy::module_inception)]
pub mod index;
pub mod memory;
pub mod reader;
pub mod term_vector;

pub use self::index::{Index, IndexConfig};
