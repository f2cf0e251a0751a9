//! Prefix query implementation.

use std::any::Any;
use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::multi_term::{MultiTermConfig, TermScore, expand_terms};
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::weight::Weight;
use crate::search::searcher::Searcher;

/// Matches documents containing a term that starts with a prefix.
///
/// Rewrites into a [`MultiTermQuery`](crate::query::multi_term::MultiTermQuery)
/// holding every matching term with boost 1.0.
#[derive(Debug, Clone)]
pub struct PrefixQuery {
    field: String,
    prefix: String,
    max_terms: usize,
    boost: f32,
}

impl PrefixQuery {
    /// Create a new prefix query.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, prefix: P) -> Self {
        PrefixQuery {
            field: field.into(),
            prefix: prefix.into(),
            max_terms: MultiTermConfig::default().max_terms,
            boost: 1.0,
        }
    }

    /// Limit the number of terms the query expands to.
    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Query for PrefixQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Prefix
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        let config = MultiTermConfig::default().max_terms(self.max_terms);
        let prefix = self.prefix.as_str();
        let query = expand_terms(&self.field, reader, prefix, config, self.boost, |term| {
            if term.starts_with(prefix) {
                TermScore::Accept(1.0)
            } else {
                TermScore::Stop
            }
        })?;
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Err(QuarryError::unsupported("PrefixQuery must be rewritten before searching"))
    }

    fn to_s(&self, default_field: &str) -> String {
        format!(
            "{}{}*{}",
            field_prefix(&self.field, default_field),
            self.prefix,
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&(&self.field, &self.prefix))
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &PrefixQuery| {
            self.field == other.field && self.prefix == other.prefix
        })
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::index_of;
    use crate::query::multi_term::MultiTermQuery;

    #[test]
    fn test_rewrite_collects_prefixed_terms() {
        let reader = index_of(&["cat car", "cart dog", "cab"]).reader();
        let query = PrefixQuery::new("body", "car").with_boost(2.0);
        let rewritten = query.rewrite(&reader).unwrap().unwrap();
        let multi = rewritten.as_any().downcast_ref::<MultiTermQuery>().unwrap();
        let terms: Vec<String> = multi.terms().into_iter().map(|t| t.term).collect();
        assert_eq!(terms, vec!["car", "cart"]);
        assert_eq!(multi.boost(), 2.0);
    }

    #[test]
    fn test_to_s() {
        assert_eq!(PrefixQuery::new("body", "ca").to_s("body"), "ca*");
        assert_eq!(PrefixQuery::new("body", "ca").with_boost(0.5).to_s("x"), "body:ca*^0.5");
    }

    #[test]
    fn test_cannot_search_without_rewrite() {
        let reader = index_of(&["a"]).reader();
        let searcher = Searcher::new(&reader);
        let err = PrefixQuery::new("body", "a").create_weight(&searcher).unwrap_err();
        assert!(err.is_unsupported());
    }
}
