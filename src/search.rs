//! Search execution: similarity, filters, sorting, collection, highlighting
//! and the searcher.

pub mod collector;
pub mod explanation;
pub mod filter;
pub mod highlight;
pub mod searcher;
pub mod similarity;
pub mod sort;

pub use self::searcher::{SearchConfig, SearchRequest, Searcher, TopDocs};
