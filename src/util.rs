//! Shared data structures used by the query and search layers.

pub mod bit_vector;
pub mod levenshtein;
pub mod priority_queue;
