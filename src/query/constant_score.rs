//! Constant score query: every document a filter allows gets the same score.

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader};
use crate::index::term_vector::TermVector;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq};
use crate::query::scorer::{BitVectorScorer, Scorer};
use crate::query::weight::Weight;
use crate::search::explanation::Explanation;
use crate::search::filter::{Filter, FilterExt};
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;

/// Wraps a filter as a query scoring `boost * query_norm`.
#[derive(Debug, Clone)]
pub struct ConstantScoreQuery {
    filter: Arc<dyn Filter>,
    boost: f32,
}

impl ConstantScoreQuery {
    /// Create a query matching the documents `filter` allows.
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        ConstantScoreQuery { filter, boost: 1.0 }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The wrapped filter.
    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }
}

impl Query for ConstantScoreQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::ConstantScore
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Ok(Box::new(ConstantScoreWeight {
            filter: Arc::clone(&self.filter),
            boost: self.boost,
            qnorm: 0.0,
            value: 0.0,
        }))
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        self.filter.match_vector(matches, tv);
    }

    fn to_s(&self, _default_field: &str) -> String {
        format!("ConstantScore({}){}", self.filter.to_s(), boost_suffix(self.boost))
    }

    fn query_hash(&self) -> u64 {
        self.filter.filter_hash()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &ConstantScoreQuery| *self.filter == *other.filter)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct ConstantScoreWeight {
    filter: Arc<dyn Filter>,
    boost: f32,
    qnorm: f32,
    value: f32,
}

impl Weight for ConstantScoreWeight {
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
        let bits = self.filter.get_bitvector(reader)?;
        Ok(Some(Box::new(BitVectorScorer::new(bits, reader.max_doc(), self.value))))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let bits = self.filter.get_bitvector(reader)?;
        if !bits.get(doc as usize) {
            return Ok(Explanation::new(
                0.0,
                format!("ConstantScoreQuery({}) doesn't match id {doc}", self.filter.to_s()),
            ));
        }
        Ok(Explanation::new(
            self.value,
            format!("ConstantScoreQuery({}), product of:", self.filter.to_s()),
        )
        .with_detail(Explanation::new(self.boost, "boost"))
        .with_detail(Explanation::new(self.qnorm, "query_norm")))
    }

    fn to_s(&self) -> String {
        format!("ConstantScoreWeight({})", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::index_of;
    use crate::search::filter::BitVectorFilter;

    #[test]
    fn test_constant_scores() {
        let reader = index_of(&["a", "b", "c", "d"]).reader();
        let filter: Arc<dyn Filter> = Arc::new([1usize, 3].into_iter().collect::<BitVectorFilter>());
        let query: Arc<dyn Query> = Arc::new(ConstantScoreQuery::new(filter).with_boost(2.0));
        let searcher = Searcher::new(&reader);
        let weight = searcher.create_weight(&query).unwrap();
        // a lone query normalizes its weight to 1
        assert!((weight.value() - 1.0).abs() < 1e-6);

        let mut scorer = weight.scorer(&reader).unwrap().unwrap();
        let mut docs = Vec::new();
        while scorer.next().unwrap() {
            docs.push(scorer.doc());
            assert_eq!(scorer.score().unwrap(), weight.value());
        }
        assert_eq!(docs, vec![1, 3]);

        let expl = weight.explain(&reader, 3).unwrap();
        assert_eq!(expl.value, weight.value());
        assert!(!weight.explain(&reader, 0).unwrap().is_match());
    }

    #[test]
    fn test_equality_follows_filter() {
        let a: Box<dyn Query> = Box::new(ConstantScoreQuery::new(Arc::new(BitVectorFilter::from_iter([1usize]))));
        let b: Box<dyn Query> = Box::new(
            ConstantScoreQuery::new(Arc::new(BitVectorFilter::from_iter([1usize]))).with_boost(4.0),
        );
        let c: Box<dyn Query> = Box::new(ConstantScoreQuery::new(Arc::new(BitVectorFilter::from_iter([2usize]))));
        assert!(*a == *b);
        assert!(*a != *c);
    }
}
