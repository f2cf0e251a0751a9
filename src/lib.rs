//! # Quarry
//!
//! The query and search core of a full-text engine.
//!
//! ## Features
//!
//! - Term, boolean, phrase, prefix, wildcard, fuzzy and range queries
//! - TF-IDF scoring with norms, coordination and score explanations
//! - Filters with per-reader bit-vector caching
//! - Sorting by score, document number or field values
//! - An in-memory index to search over

pub mod cli;
pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod util;

pub mod prelude {
    pub use crate::error::{QuarryError, Result};
    pub use crate::index::document::Document;
    pub use crate::index::memory::{MemoryIndex, MemoryIndexReader};
    pub use crate::index::reader::{DocId, IndexReader};
    pub use crate::index::{Index, IndexConfig};
    pub use crate::query::boolean::{BooleanClause, BooleanQuery, Occur};
    pub use crate::query::constant_score::ConstantScoreQuery;
    pub use crate::query::filtered::FilteredQuery;
    pub use crate::query::fuzzy::FuzzyQuery;
    pub use crate::query::match_all::MatchAllQuery;
    pub use crate::query::phrase::PhraseQuery;
    pub use crate::query::prefix::PrefixQuery;
    pub use crate::query::query::Query;
    pub use crate::query::range::{RangeFilter, RangeQuery, TypedRangeFilter, TypedRangeQuery};
    pub use crate::query::term::TermQuery;
    pub use crate::query::wildcard::WildcardQuery;
    pub use crate::query::Term;
    pub use crate::search::explanation::Explanation;
    pub use crate::search::filter::{BitVectorFilter, Filter, QueryFilter};
    pub use crate::search::highlight::{HighlightConfig, MatchVector};
    pub use crate::search::sort::{Sort, SortField, SortType};
    pub use crate::search::{SearchConfig, SearchRequest, Searcher, TopDocs};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
