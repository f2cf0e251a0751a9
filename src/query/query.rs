//! Base query trait and common query functionality.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHasher;
use log::debug;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::weight::Weight;
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;

/// The closed set of query variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    /// [`TermQuery`](crate::query::term::TermQuery)
    Term,
    /// [`MultiTermQuery`](crate::query::multi_term::MultiTermQuery)
    MultiTerm,
    /// [`BooleanQuery`](crate::query::boolean::BooleanQuery)
    Boolean,
    /// [`PhraseQuery`](crate::query::phrase::PhraseQuery)
    Phrase,
    /// [`PrefixQuery`](crate::query::prefix::PrefixQuery)
    Prefix,
    /// [`WildcardQuery`](crate::query::wildcard::WildcardQuery)
    Wildcard,
    /// [`FuzzyQuery`](crate::query::fuzzy::FuzzyQuery)
    Fuzzy,
    /// [`RangeQuery`](crate::query::range::RangeQuery)
    Range,
    /// [`TypedRangeQuery`](crate::query::range::TypedRangeQuery)
    TypedRange,
    /// [`ConstantScoreQuery`](crate::query::constant_score::ConstantScoreQuery)
    ConstantScore,
    /// [`FilteredQuery`](crate::query::filtered::FilteredQuery)
    Filtered,
    /// [`MatchAllQuery`](crate::query::match_all::MatchAllQuery)
    MatchAll,
}

/// Trait for search queries.
///
/// A query is rewritten against a reader until it is directly executable,
/// then bound to a searcher as a [`Weight`] which produces scorers.
pub trait Query: Send + Sync + Debug {
    /// Which variant this is.
    fn kind(&self) -> QueryKind;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Set the boost factor for this query.
    fn set_boost(&mut self, boost: f32);

    /// Rewrite into a more primitive query.
    ///
    /// Returns `None` when the query is already executable.
    fn rewrite(&self, _reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        Ok(None)
    }

    /// Bind this query to `searcher`.
    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>>;

    /// Add the terms this query matches on to `terms`.
    fn extract_terms(&self, _terms: &mut BTreeSet<Term>) {}

    /// Record the positions of `tv` this query matches. Called on rewritten queries.
    fn match_vector(&self, _matches: &mut MatchVector, _tv: &TermVector) {}

    /// Render the query. `default_field` is omitted from the output.
    fn to_s(&self, default_field: &str) -> String;

    /// Structural hash. Boost is not included.
    fn query_hash(&self) -> u64;

    /// Structural equality with another query of the same kind.
    fn query_eq(&self, other: &dyn Query) -> bool;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl PartialEq for dyn Query {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.query_eq(other)
    }
}

impl Eq for dyn Query {}

impl Hash for dyn Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64((self.query_hash() << 5) | self.kind() as u64);
    }
}

/// Downcast `other` to `Q` and compare it with `eq`. False if `other` is not a `Q`.
pub(crate) fn downcast_eq<Q: 'static>(other: &dyn Query, eq: impl FnOnce(&Q) -> bool) -> bool {
    other.as_any().downcast_ref::<Q>().is_some_and(eq)
}

/// Hash a value with a hasher that is stable within the process.
pub(crate) fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = AHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Render a boost suffix: empty for 1.0, otherwise `^2.0`, `^0.5`, ...
pub(crate) fn boost_suffix(boost: f32) -> String {
    if boost == 1.0 {
        String::new()
    } else if boost.fract() == 0.0 {
        format!("^{boost:.1}")
    } else {
        format!("^{boost}")
    }
}

/// Render `field:` unless `field` is the default field.
pub(crate) fn field_prefix(field: &str, default_field: &str) -> String {
    if field == default_field {
        String::new()
    } else {
        format!("{field}:")
    }
}

/// Rewrite `query` repeatedly until it is executable.
pub fn rewrite_fully(query: &Arc<dyn Query>, reader: &dyn IndexReader) -> Result<Arc<dyn Query>> {
    let mut current = Arc::clone(query);
    while let Some(rewritten) = current.rewrite(reader)? {
        debug!(
            "rewrote {:?} query to {:?}: {}",
            current.kind(),
            rewritten.kind(),
            rewritten.to_s("")
        );
        current = rewritten;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boost_suffix() {
        assert_eq!(boost_suffix(1.0), "");
        assert_eq!(boost_suffix(2.0), "^2.0");
        assert_eq!(boost_suffix(0.5), "^0.5");
    }

    #[test]
    fn test_field_prefix() {
        assert_eq!(field_prefix("title", "title"), "");
        assert_eq!(field_prefix("title", "body"), "title:");
    }

    #[test]
    fn test_hash_of_is_stable() {
        assert_eq!(hash_of("field"), hash_of("field"));
        assert_ne!(hash_of("field"), hash_of("other"));
    }
}
