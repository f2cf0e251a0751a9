//! Filters restrict a search to a set of documents.
//!
//! A filter computes a [`BitVector`] for a reader. Results are cached in the
//! reader's [`ReaderCache`](crate::index::cache::ReaderCache) under the
//! filter's structural identity, so two equal filters built independently
//! share one bit vector.

use std::any::Any;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::term_vector::TermVector;
use crate::query::query::{Query, hash_of};
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::util::bit_vector::BitVector;

/// A document filter.
pub trait Filter: Send + Sync + Debug {
    /// Name of the filter type, part of its identity.
    fn name(&self) -> &'static str;

    /// Compute the set of documents the filter allows. Uncached.
    fn compute_bitvector(&self, reader: &dyn IndexReader) -> Result<BitVector>;

    /// Structural hash.
    fn filter_hash(&self) -> u64;

    /// Structural equality with a filter of the same name.
    fn filter_eq(&self, other: &dyn Filter) -> bool;

    /// Describe the filter.
    fn to_s(&self) -> String;

    /// Record the positions of `tv` holding terms the filter selects on.
    fn match_vector(&self, _matches: &mut MatchVector, _tv: &TermVector) {}

    /// Used for downcasting in [`filter_eq`](Filter::filter_eq).
    fn as_any(&self) -> &dyn Any;
}

impl PartialEq for dyn Filter {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.filter_eq(other)
    }
}

impl Eq for dyn Filter {}

impl Hash for dyn Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.filter_hash() ^ hash_of(self.name()));
    }
}

/// Cached access to a shared filter's bit vector.
pub trait FilterExt {
    /// Bit vector for `reader`, computed once per reader and structural filter.
    fn get_bitvector(&self, reader: &dyn IndexReader) -> Result<Arc<BitVector>>;
}

impl FilterExt for Arc<dyn Filter> {
    fn get_bitvector(&self, reader: &dyn IndexReader) -> Result<Arc<BitVector>> {
        reader
            .cache()
            .filter_bitvector(self, || self.compute_bitvector(reader))
    }
}

/// Downcast `other` to `F` and compare it with `eq`.
pub(crate) fn downcast_filter_eq<F: 'static>(other: &dyn Filter, eq: impl FnOnce(&F) -> bool) -> bool {
    other.as_any().downcast_ref::<F>().is_some_and(eq)
}

/// Allows the documents a query matches.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    query: Arc<dyn Query>,
}

impl QueryFilter {
    /// Create a filter from a query.
    pub fn new(query: Arc<dyn Query>) -> Self {
        QueryFilter { query }
    }

    /// The wrapped query.
    pub fn query(&self) -> &Arc<dyn Query> {
        &self.query
    }
}

impl Filter for QueryFilter {
    fn name(&self) -> &'static str {
        "QueryFilter"
    }

    fn compute_bitvector(&self, reader: &dyn IndexReader) -> Result<BitVector> {
        Searcher::new(reader).bits(&self.query)
    }

    fn filter_hash(&self) -> u64 {
        hash_of(&*self.query)
    }

    fn filter_eq(&self, other: &dyn Filter) -> bool {
        downcast_filter_eq(other, |other: &QueryFilter| *self.query == *other.query)
    }

    fn to_s(&self) -> String {
        format!("QueryFilter< {} >", self.query.to_s(""))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Allows a fixed set of documents.
#[derive(Debug, Clone)]
pub struct BitVectorFilter {
    bits: Arc<BitVector>,
}

impl BitVectorFilter {
    /// Create a filter allowing the set bits of `bits`.
    pub fn new(bits: BitVector) -> Self {
        BitVectorFilter { bits: Arc::new(bits) }
    }

    /// The allowed documents.
    pub fn bits(&self) -> &BitVector {
        &self.bits
    }
}

impl FromIterator<usize> for BitVectorFilter {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Filter for BitVectorFilter {
    fn name(&self) -> &'static str {
        "BitVectorFilter"
    }

    fn compute_bitvector(&self, _reader: &dyn IndexReader) -> Result<BitVector> {
        Ok((*self.bits).clone())
    }

    fn filter_hash(&self) -> u64 {
        hash_of(&*self.bits)
    }

    fn filter_eq(&self, other: &dyn Filter) -> bool {
        downcast_filter_eq(other, |other: &BitVectorFilter| self.bits == other.bits)
    }

    fn to_s(&self) -> String {
        let docs: Vec<String> = self.bits.iter().map(|d| d.to_string()).collect();
        format!("BitVectorFilter< {} >", docs.join(" "))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::index_of;
    use crate::query::term::TermQuery;

    #[test]
    fn test_query_filter() {
        let reader = index_of(&["a b", "b", "a c"]).reader();
        let filter: Arc<dyn Filter> = Arc::new(QueryFilter::new(Arc::new(TermQuery::new("body", "a"))));
        let bits = filter.get_bitvector(&reader).unwrap();
        assert_eq!(bits.to_vec(), vec![0, 2]);
        assert_eq!(filter.to_s(), "QueryFilter< body:a >");
    }

    #[test]
    fn test_equal_filters_share_cache_entry() {
        let reader = index_of(&["a", "b"]).reader();
        let a: Arc<dyn Filter> = Arc::new(QueryFilter::new(Arc::new(TermQuery::new("body", "a"))));
        let b: Arc<dyn Filter> = Arc::new(QueryFilter::new(Arc::new(TermQuery::new("body", "a"))));
        let first = a.get_bitvector(&reader).unwrap();
        let second = b.get_bitvector(&reader).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.cache().filter_count(), 1);
    }

    #[test]
    fn test_bit_vector_filter() {
        let reader = index_of(&["a", "b", "c"]).reader();
        let filter: Arc<dyn Filter> = Arc::new([0usize, 2].into_iter().collect::<BitVectorFilter>());
        assert_eq!(filter.get_bitvector(&reader).unwrap().to_vec(), vec![0, 2]);
        assert_eq!(filter.to_s(), "BitVectorFilter< 0 2 >");

        let other: Arc<dyn Filter> = Arc::new([0usize, 1].into_iter().collect::<BitVectorFilter>());
        assert!(*filter != *other);
    }
}
