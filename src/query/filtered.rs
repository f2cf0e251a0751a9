//! Query restricted to the documents a filter allows.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader};
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, hash_of};
use crate::query::scorer::Scorer;
use crate::query::weight::Weight;
use crate::search::explanation::Explanation;
use crate::search::filter::{Filter, FilterExt};
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::util::bit_vector::BitVector;

/// Scores documents with an inner query, keeping only those a filter allows.
///
/// Filtered queries nest: the inner query may itself be filtered.
#[derive(Debug, Clone)]
pub struct FilteredQuery {
    query: Arc<dyn Query>,
    filter: Arc<dyn Filter>,
    boost: f32,
}

impl FilteredQuery {
    /// Create a filtered query.
    pub fn new(query: Arc<dyn Query>, filter: Arc<dyn Filter>) -> Self {
        FilteredQuery {
            query,
            filter,
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The inner query.
    pub fn query(&self) -> &Arc<dyn Query> {
        &self.query
    }

    /// The filter.
    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }
}

impl Query for FilteredQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Filtered
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        let Some(rewritten) = self.query.rewrite(reader)? else {
            return Ok(None);
        };
        let mut query = self.clone();
        query.query = rewritten;
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Ok(Box::new(FilteredWeight {
            inner: self.query.create_weight(searcher)?,
            filter: Arc::clone(&self.filter),
            boost: self.boost,
            value: 0.0,
        }))
    }

    fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        self.query.extract_terms(terms);
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        self.query.match_vector(matches, tv);
    }

    fn to_s(&self, default_field: &str) -> String {
        format!(
            "FilteredQuery(query:{}, filter:{}){}",
            self.query.to_s(default_field),
            self.filter.to_s(),
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&*self.query) ^ self.filter.filter_hash()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &FilteredQuery| {
            *self.query == *other.query && *self.filter == *other.filter
        })
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct FilteredWeight {
    inner: Box<dyn Weight>,
    filter: Arc<dyn Filter>,
    boost: f32,
    value: f32,
}

impl Weight for FilteredWeight {
    fn value(&self) -> f32 {
        self.value
    }

    fn sum_of_squared_weights(&mut self) -> f32 {
        self.inner.sum_of_squared_weights() * self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32) {
        self.inner.normalize(norm);
        self.value = self.inner.value() * self.boost;
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        let Some(inner) = self.inner.scorer(reader)? else {
            return Ok(None);
        };
        let bits = self.filter.get_bitvector(reader)?;
        Ok(Some(Box::new(FilteredScorer {
            inner,
            bits,
            boost: self.boost,
        })))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let inner = self.inner.explain(reader, doc)?;
        let bits = self.filter.get_bitvector(reader)?;
        if !bits.get(doc as usize) {
            return Ok(
                Explanation::new(0.0, format!("failure to match filter: {}", self.filter.to_s()))
                    .with_detail(inner),
            );
        }
        if self.boost == 1.0 {
            return Ok(inner);
        }
        Ok(Explanation::new(inner.value * self.boost, "FilteredQuery, product of:")
            .with_detail(inner)
            .with_detail(Explanation::new(self.boost, "boost")))
    }

    fn to_s(&self) -> String {
        format!("FilteredWeight({})", self.value)
    }
}

#[derive(Debug)]
struct FilteredScorer {
    inner: Box<dyn Scorer>,
    bits: Arc<BitVector>,
    boost: f32,
}

impl FilteredScorer {
    fn skip_filtered(&mut self, mut found: bool) -> Result<bool> {
        while found && !self.bits.get(self.inner.doc() as usize) {
            found = self.inner.next()?;
        }
        Ok(found)
    }
}

impl Scorer for FilteredScorer {
    fn doc(&self) -> DocId {
        self.inner.doc()
    }

    fn next(&mut self) -> Result<bool> {
        let found = self.inner.next()?;
        self.skip_filtered(found)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        let found = self.inner.skip_to(target)?;
        self.skip_filtered(found)
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.inner.score()? * self.boost)
    }
}
