//! Query matching every live document.

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader};
use crate::query::query::{Query, QueryKind, boost_suffix};
use crate::query::scorer::{BitVectorScorer, Scorer, live_docs};
use crate::query::weight::Weight;
use crate::search::explanation::Explanation;
use crate::search::searcher::Searcher;

/// Matches every document that is not deleted, scoring `boost * query_norm`.
#[derive(Debug, Clone)]
pub struct MatchAllQuery {
    boost: f32,
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchAllQuery {
    /// Create a match-all query.
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for MatchAllQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::MatchAll
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Ok(Box::new(MatchAllWeight {
            boost: self.boost,
            qnorm: 0.0,
            value: 0.0,
        }))
    }

    fn to_s(&self, _default_field: &str) -> String {
        format!("*{}", boost_suffix(self.boost))
    }

    fn query_hash(&self) -> u64 {
        0
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        other.kind() == QueryKind::MatchAll
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct MatchAllWeight {
    boost: f32,
    qnorm: f32,
    value: f32,
}

impl Weight for MatchAllWeight {
    fn value(&self) -> f32 {
        self.value
    }

    fn sum_of_squared_weights(&mut self) -> f32 {
        self.value = self.boost;
        self.value * self.value
    }

    fn normalize(&mut self, norm: f32) {
        self.qnorm = norm;
        self.value *= norm;
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        let bits = Arc::new(live_docs(reader));
        Ok(Some(Box::new(BitVectorScorer::new(bits, reader.max_doc(), self.value))))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        if doc >= reader.max_doc() || reader.is_deleted(doc) {
            return Ok(Explanation::new(0.0, format!("document {doc} is deleted")));
        }
        Ok(Explanation::new(self.value, "MatchAllQuery: product of:")
            .with_detail(Explanation::new(self.boost, "boost"))
            .with_detail(Explanation::new(self.qnorm, "query_norm")))
    }

    fn to_s(&self) -> String {
        format!("MatchAllWeight({})", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_live_docs() {
        let mut index = crate::index::memory::index_of(&["a", "b", "c"]);
        index.delete(1).unwrap();
        let reader = index.reader();
        let searcher = Searcher::new(&reader);
        let query: Arc<dyn Query> = Arc::new(MatchAllQuery::new().with_boost(3.0));
        let weight = searcher.create_weight(&query).unwrap();
        let mut scorer = weight.scorer(&reader).unwrap().unwrap();
        let mut docs = Vec::new();
        while scorer.next().unwrap() {
            docs.push(scorer.doc());
        }
        assert_eq!(docs, vec![0, 2]);

        assert_eq!(weight.explain(&reader, 1).unwrap().description, "document 1 is deleted");
        assert_eq!(weight.explain(&reader, 2).unwrap().value, weight.value());
    }

    #[test]
    fn test_to_s() {
        assert_eq!(MatchAllQuery::new().to_s("body"), "*");
        assert_eq!(MatchAllQuery::new().with_boost(2.0).to_s("body"), "*^2.0");
    }
}
