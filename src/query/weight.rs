//! Per-search binding of a query to similarity and normalization values.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader};
use crate::query::scorer::Scorer;
use crate::search::explanation::Explanation;

/// A query bound to a searcher.
///
/// The searcher calls [`sum_of_squared_weights`](Weight::sum_of_squared_weights)
/// on the root weight, turns the result into a query norm and hands it back
/// through [`normalize`](Weight::normalize). Composite weights propagate both
/// calls to their children.
pub trait Weight: Send + Debug {
    /// The final weight value scorers multiply into their scores.
    fn value(&self) -> f32;

    /// Compute the raw query weight and return its square.
    fn sum_of_squared_weights(&mut self) -> f32;

    /// Apply the query normalization factor.
    fn normalize(&mut self, norm: f32);

    /// Create a scorer over `reader`, or `None` if nothing can match.
    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>>;

    /// Explain the score of `doc`.
    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation>;

    /// Describe the weight for debugging.
    fn to_s(&self) -> String;
}

/// The values most weights carry: `qweight = idf * boost`, normalized by
/// `qnorm`, and `value = qweight * idf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightValues {
    /// Final weight value.
    pub value: f32,
    /// Query weight: `idf * boost`, later multiplied by `qnorm`.
    pub qweight: f32,
    /// Query normalization factor.
    pub qnorm: f32,
    /// Inverse document frequency.
    pub idf: f32,
}

impl WeightValues {
    /// Values for a weight with the given idf.
    pub fn new(idf: f32) -> Self {
        WeightValues {
            value: 0.0,
            qweight: 0.0,
            qnorm: 0.0,
            idf,
        }
    }

    /// `qweight = idf * boost`; returns `qweight²`.
    pub fn sum_of_squared_weights(&mut self, boost: f32) -> f32 {
        self.qweight = self.idf * boost;
        self.qweight * self.qweight
    }

    /// `qnorm = norm`, `qweight *= norm`, `value = qweight * idf`.
    pub fn normalize(&mut self, norm: f32) {
        self.qnorm = norm;
        self.qweight *= norm;
        self.value = self.qweight * self.idf;
    }
}
