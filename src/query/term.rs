//! Term query implementation for exact term matching.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader, TermDocEnum};
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::scorer::Scorer;
use crate::query::weight::{Weight, WeightValues};
use crate::search::explanation::Explanation;
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::search::similarity::Similarity;

const SCORE_CACHE_SIZE: usize = 32;

/// A query that matches documents containing a specific term.
///
/// The term is not analyzed; it must already be in its indexed form.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F, T>(field: F, text: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            term: Term::new(field, text),
            boost: 1.0,
        }
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.term.field
    }

    /// Get the term text.
    pub fn text(&self) -> &str {
        &self.term.text
    }

    /// Get the term.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Term
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        let doc_freq = searcher.doc_freq(&self.term.field, &self.term.text)?;
        let similarity = Arc::clone(searcher.similarity());
        let idf = similarity.idf(doc_freq, searcher.max_doc());
        Ok(Box::new(TermWeight {
            term: self.term.clone(),
            boost: self.boost,
            similarity,
            values: WeightValues::new(idf),
        }))
    }

    fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        terms.insert(self.term.clone());
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        if tv.field() != self.term.field {
            return;
        }
        if let Some(term) = tv.term(&self.term.text) {
            for &position in &term.positions {
                matches.add(position, position);
            }
        }
    }

    fn to_s(&self, default_field: &str) -> String {
        format!(
            "{}{}{}",
            field_prefix(&self.term.field, default_field),
            self.term.text,
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&self.term)
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &TermQuery| other.term == self.term)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct TermWeight {
    term: Term,
    boost: f32,
    similarity: Arc<dyn Similarity>,
    values: WeightValues,
}

impl Weight for TermWeight {
    fn value(&self) -> f32 {
        self.values.value
    }

    fn sum_of_squared_weights(&mut self) -> f32 {
        self.values.sum_of_squared_weights(self.boost)
    }

    fn normalize(&mut self, norm: f32) {
        self.values.normalize(norm);
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        if reader.doc_freq(&self.term.field, &self.term.text)? == 0 {
            return Ok(None);
        }
        let docs = reader.term_docs_for(&self.term.field, &self.term.text)?;
        let norms = reader.norms(&self.term.field)?;
        Ok(Some(Box::new(TermScorer::new(
            docs,
            norms,
            self.values.value,
            Arc::clone(&self.similarity),
        ))))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let sim = &self.similarity;
        let field = &self.term.field;
        let doc_freq = reader.doc_freq(field, &self.term.text)?;
        let idf_expl = || Explanation::new(self.values.idf, format!("idf(doc_freq={doc_freq})"));

        let mut query_expl = Explanation::new(0.0, format!("query_weight({}), product of:", self.term));
        if self.boost != 1.0 {
            query_expl.add_detail(Explanation::new(self.boost, "boost"));
        }
        query_expl.add_detail(idf_expl());
        query_expl.add_detail(Explanation::new(self.values.qnorm, "query_norm"));
        query_expl.value = self.boost * self.values.idf * self.values.qnorm;

        let mut docs = reader.term_docs_for(field, &self.term.text)?;
        let freq = if docs.skip_to(doc)? && docs.doc_num() == doc {
            docs.freq()
        } else {
            0
        };
        let tf = sim.tf(freq as f32);
        let field_norm = match reader.norms(field)? {
            Some(norms) => norms.get(doc as usize).map_or(1.0, |&b| sim.decode_norm(b)),
            None => 1.0,
        };
        let mut field_expl = Explanation::new(
            tf * self.values.idf * field_norm,
            format!("field_weight({} in {doc}), product of:", self.term),
        );
        field_expl.add_detail(Explanation::new(tf, format!("tf(term_freq({})={freq})", self.term)));
        field_expl.add_detail(idf_expl());
        field_expl.add_detail(Explanation::new(
            field_norm,
            format!("field_norm(field={field}, doc={doc})"),
        ));

        if query_expl.value == 1.0 {
            return Ok(field_expl);
        }
        let value = query_expl.value * field_expl.value;
        Ok(Explanation::new(value, format!("weight({} in {doc}), product of:", self.term))
            .with_detail(query_expl)
            .with_detail(field_expl))
    }

    fn to_s(&self) -> String {
        format!("TermWeight({})", self.values.value)
    }
}

/// Scores the postings of one term: `tf(freq) * weight * norm`.
#[derive(Debug)]
pub struct TermScorer {
    docs: Box<dyn TermDocEnum>,
    norms: Option<Arc<[u8]>>,
    weight_value: f32,
    similarity: Arc<dyn Similarity>,
    score_cache: [f32; SCORE_CACHE_SIZE],
}

impl TermScorer {
    /// Create a scorer over `docs`. Without `norms` every document has norm 1.
    pub fn new(
        docs: Box<dyn TermDocEnum>,
        norms: Option<Arc<[u8]>>,
        weight_value: f32,
        similarity: Arc<dyn Similarity>,
    ) -> Self {
        let mut score_cache = [0.0; SCORE_CACHE_SIZE];
        for (freq, slot) in score_cache.iter_mut().enumerate() {
            *slot = similarity.tf(freq as f32) * weight_value;
        }
        TermScorer {
            docs,
            norms,
            weight_value,
            similarity,
            score_cache,
        }
    }

    fn norm(&self, doc: DocId) -> f32 {
        self.norms
            .as_ref()
            .and_then(|norms| norms.get(doc as usize))
            .map_or(1.0, |&b| self.similarity.decode_norm(b))
    }
}

impl Scorer for TermScorer {
    fn doc(&self) -> DocId {
        self.docs.doc_num()
    }

    fn next(&mut self) -> Result<bool> {
        self.docs.next()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.docs.skip_to(target)
    }

    fn score(&mut self) -> Result<f32> {
        let freq = self.docs.freq() as usize;
        let raw = match self.score_cache.get(freq) {
            Some(&cached) => cached,
            None => self.similarity.tf(freq as f32) * self.weight_value,
        };
        Ok(raw * self.norm(self.docs.doc_num()))
    }
}
