//! Multi-term query support.
//!
//! [`MultiTermQuery`] is an executable query over a bounded set of weighted
//! terms of one field. Prefix, wildcard and fuzzy queries rewrite into it by
//! walking the field's term dictionary with [`expand_terms`], scoring each
//! candidate and keeping the `max_terms` best in a [`PriorityQueue`].

use std::any::Any;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHasher;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::{DocId, IndexReader, TermDocEnum};
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix};
use crate::query::scorer::{DisjunctionScorer, Scorer};
use crate::query::weight::{Weight, WeightValues};
use crate::search::explanation::Explanation;
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::search::similarity::Similarity;
use crate::util::priority_queue::{InsertResult, PriorityQueue};

/// Default maximum number of terms a multi-term query keeps.
pub const DEFAULT_MAX_TERMS: usize = 256;

/// Limits applied while collecting terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTermConfig {
    /// Maximum number of terms kept; the highest-boosted win.
    pub max_terms: usize,
    /// Terms boosted below this are discarded.
    pub min_score: f32,
}

impl Default for MultiTermConfig {
    fn default() -> Self {
        MultiTermConfig {
            max_terms: DEFAULT_MAX_TERMS,
            min_score: 0.0,
        }
    }
}

impl MultiTermConfig {
    /// Set the maximum number of terms.
    pub fn max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    /// Set the minimum term boost.
    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

/// A term with the boost it contributes to a [`MultiTermQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTerm {
    /// The term text.
    pub term: String,
    /// The boost.
    pub boost: f32,
}

/// Lower boosts sort first; on a tie the lexicographically greater term does.
fn boosted_term_less_than(a: &BoostedTerm, b: &BoostedTerm) -> bool {
    if a.boost == b.boost {
        a.term > b.term
    } else {
        a.boost < b.boost
    }
}

type TermQueue = PriorityQueue<BoostedTerm, fn(&BoostedTerm, &BoostedTerm) -> bool>;

/// Matches documents containing any of a set of weighted terms.
#[derive(Debug, Clone)]
pub struct MultiTermQuery {
    field: String,
    terms: TermQueue,
    config: MultiTermConfig,
    boost: f32,
}

impl MultiTermQuery {
    /// Create an empty query with the default limits.
    pub fn new<F: Into<String>>(field: F) -> Self {
        Self::with_config(field, MultiTermConfig::default())
    }

    /// Create an empty query with the given limits.
    pub fn with_config<F: Into<String>>(field: F, config: MultiTermConfig) -> Self {
        MultiTermQuery {
            field: field.into(),
            terms: PriorityQueue::with_less_than(
                config.max_terms,
                boosted_term_less_than as fn(&BoostedTerm, &BoostedTerm) -> bool,
            ),
            config,
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Add `term` with boost 1.0.
    pub fn add_term<T: Into<String>>(&mut self, term: T) -> bool {
        self.add_term_boost(term, 1.0)
    }

    /// Add `term` with `boost`.
    ///
    /// Returns false if the term was rejected: empty, boosted below
    /// `min_score`, or not good enough to displace a term of a full query.
    pub fn add_term_boost<T: Into<String>>(&mut self, term: T, boost: f32) -> bool {
        let term = term.into();
        if term.is_empty() || boost < self.config.min_score {
            return false;
        }
        !matches!(
            self.terms.insert(BoostedTerm { term, boost }),
            InsertResult::Dropped(_)
        )
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The collection limits.
    pub fn config(&self) -> MultiTermConfig {
        self.config
    }

    /// Number of terms held.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no terms are held.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The held terms, highest boost first.
    pub fn terms(&self) -> Vec<BoostedTerm> {
        let mut terms = self.terms.clone().into_sorted_vec();
        terms.reverse();
        terms
    }

    fn sorted_by_text(&self) -> Vec<&BoostedTerm> {
        let mut terms: Vec<&BoostedTerm> = self.terms.iter().collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term));
        terms
    }
}

impl Query for MultiTermQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::MultiTerm
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        let terms = self.terms();
        let mut doc_freq = 0;
        for term in &terms {
            doc_freq += searcher.doc_freq(&self.field, &term.term)?;
        }
        let similarity = Arc::clone(searcher.similarity());
        let idf = similarity.idf(doc_freq, searcher.max_doc());
        Ok(Box::new(MultiTermWeight {
            field: self.field.clone(),
            terms,
            description: self.to_s(""),
            boost: self.boost,
            similarity,
            values: WeightValues::new(idf),
        }))
    }

    fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        for term in self.terms.iter() {
            terms.insert(Term::new(self.field.clone(), term.term.clone()));
        }
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        if tv.field() != self.field {
            return;
        }
        for term in self.terms.iter().filter_map(|t| tv.term(&t.term)) {
            for &position in &term.positions {
                matches.add(position, position);
            }
        }
    }

    fn to_s(&self, default_field: &str) -> String {
        let terms = self
            .terms()
            .iter()
            .map(|t| {
                if t.boost == 1.0 {
                    t.term.clone()
                } else {
                    format!("{}^{}", t.term, t.boost)
                }
            })
            .collect::<Vec<_>>()
            .join("|");
        format!(
            "{}\"{terms}\"{}",
            field_prefix(&self.field, default_field),
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.field.hash(&mut hasher);
        for term in self.sorted_by_text() {
            term.term.hash(&mut hasher);
            term.boost.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &MultiTermQuery| {
            self.field == other.field && self.sorted_by_text() == other.sorted_by_text()
        })
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What [`expand_terms`] does with a candidate term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TermScore {
    /// Keep the term with this boost.
    Accept(f32),
    /// Ignore the term and continue.
    Skip,
    /// Stop the enumeration.
    Stop,
}

/// Walk the terms of `field` from `start`, collecting the ones `score_term`
/// accepts into a [`MultiTermQuery`] boosted by `boost`.
pub fn expand_terms<F>(
    field: &str,
    reader: &dyn IndexReader,
    start: &str,
    config: MultiTermConfig,
    boost: f32,
    mut score_term: F,
) -> Result<MultiTermQuery>
where
    F: FnMut(&str) -> TermScore,
{
    let mut query = MultiTermQuery::with_config(field, config).with_boost(boost);
    if reader.field_number(field).is_none() {
        return Ok(query);
    }

    let mut terms = reader.terms(field)?;
    let mut visited = 0usize;
    if terms.skip_to(start)? {
        loop {
            visited += 1;
            match score_term(terms.curr_term()) {
                TermScore::Accept(score) => {
                    query.add_term_boost(terms.curr_term(), score);
                }
                TermScore::Skip => {}
                TermScore::Stop => break,
            }
            if !terms.next()? {
                break;
            }
        }
    }
    debug!(
        "expanded {field}:{start}* over {visited} terms into {} terms",
        query.len()
    );
    Ok(query)
}

#[derive(Debug)]
struct MultiTermWeight {
    field: String,
    terms: Vec<BoostedTerm>,
    description: String,
    boost: f32,
    similarity: Arc<dyn Similarity>,
    values: WeightValues,
}

impl MultiTermWeight {
    fn norm(&self, norms: Option<&Arc<[u8]>>, doc: DocId) -> f32 {
        norms
            .and_then(|n| n.get(doc as usize))
            .map_or(1.0, |&b| self.similarity.decode_norm(b))
    }
}

impl Weight for MultiTermWeight {
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
        let mut scorers: Vec<Box<dyn Scorer>> = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            if reader.doc_freq(&self.field, &term.term)? == 0 {
                continue;
            }
            scorers.push(Box::new(TermFreqScorer {
                docs: reader.term_docs_for(&self.field, &term.term)?,
                boost: term.boost,
                similarity: Arc::clone(&self.similarity),
            }));
        }
        if scorers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(MultiTermScorer {
            terms: DisjunctionScorer::new(scorers, 1),
            norms: reader.norms(&self.field)?,
            weight_value: self.values.value,
            similarity: Arc::clone(&self.similarity),
        })))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let sim = &self.similarity;
        let idf_expl = || Explanation::new(self.values.idf, format!("idf({})", self.description));

        let mut query_expl = Explanation::new(
            self.boost * self.values.idf * self.values.qnorm,
            format!("query_weight({}), product of:", self.description),
        );
        if self.boost != 1.0 {
            query_expl.add_detail(Explanation::new(self.boost, "boost"));
        }
        query_expl.add_detail(idf_expl());
        query_expl.add_detail(Explanation::new(self.values.qnorm, "query_norm"));

        let mut tf_expl = Explanation::new(0.0, "tf(), sum of:");
        for term in &self.terms {
            let mut docs = reader.term_docs_for(&self.field, &term.term)?;
            if docs.skip_to(doc)? && docs.doc_num() == doc {
                let freq = docs.freq();
                let value = sim.tf(freq as f32) * term.boost;
                tf_expl.value += value;
                tf_expl.add_detail(Explanation::new(
                    value,
                    format!("tf(term_freq({}:{})={freq})^{}", self.field, term.term, term.boost),
                ));
            }
        }
        if tf_expl.details.is_empty() {
            return Ok(Explanation::new(
                0.0,
                format!("{} does not match document {doc}", self.description),
            ));
        }

        let norms = reader.norms(&self.field)?;
        let field_norm = self.norm(norms.as_ref(), doc);
        let mut field_expl = Explanation::new(
            tf_expl.value * self.values.idf * field_norm,
            format!("field_weight({} in {doc}), product of:", self.description),
        );
        field_expl.add_detail(tf_expl);
        field_expl.add_detail(idf_expl());
        field_expl.add_detail(Explanation::new(
            field_norm,
            format!("field_norm(field={}, doc={doc})", self.field),
        ));

        if query_expl.value == 1.0 {
            return Ok(field_expl);
        }
        Ok(Explanation::new(
            query_expl.value * field_expl.value,
            format!("weight({} in {doc}), product of:", self.description),
        )
        .with_detail(query_expl)
        .with_detail(field_expl))
    }

    fn to_s(&self) -> String {
        format!("MultiTermWeight({})", self.values.value)
    }
}

/// Scores one term of a multi-term query as `tf(freq) * term boost`.
#[derive(Debug)]
struct TermFreqScorer {
    docs: Box<dyn TermDocEnum>,
    boost: f32,
    similarity: Arc<dyn Similarity>,
}

impl Scorer for TermFreqScorer {
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
        Ok(self.similarity.tf(self.docs.freq() as f32) * self.boost)
    }
}

#[derive(Debug)]
struct MultiTermScorer {
    terms: DisjunctionScorer,
    norms: Option<Arc<[u8]>>,
    weight_value: f32,
    similarity: Arc<dyn Similarity>,
}

impl Scorer for MultiTermScorer {
    fn doc(&self) -> DocId {
        self.terms.doc()
    }

    fn next(&mut self) -> Result<bool> {
        self.terms.next()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.terms.skip_to(target)
    }

    fn score(&mut self) -> Result<f32> {
        let doc = self.terms.doc();
        let norm = self
            .norms
            .as_ref()
            .and_then(|n| n.get(doc as usize))
            .map_or(1.0, |&b| self.similarity.decode_norm(b));
        Ok(self.terms.score()? * self.weight_value * norm)
    }
}
