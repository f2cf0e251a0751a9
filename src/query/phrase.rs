//! Phrase query implementation for exact and sloppy phrase matching.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::reader::{DocId, IndexReader, TermDocEnum};
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::scorer::Scorer;
use crate::query::term::TermQuery;
use crate::query::weight::{Weight, WeightValues};
use crate::search::explanation::Explanation;
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::search::similarity::Similarity;

/// A term of a phrase and its position relative to the phrase start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhraseTerm {
    /// Position within the phrase.
    pub position: u32,
    /// Term text.
    pub text: String,
}

/// A query that matches documents containing a sequence of terms.
///
/// With a slop of 0 the terms must appear exactly at their relative
/// positions. A positive slop allows that many position moves in total, and
/// closer matches score higher.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    field: String,
    terms: Vec<PhraseTerm>,
    slop: u32,
    boost: f32,
}

impl PhraseQuery {
    /// Create a phrase of consecutive terms.
    pub fn new<S: Into<String>>(field: S, terms: Vec<String>) -> Self {
        let mut query = PhraseQuery {
            field: field.into(),
            terms: Vec::with_capacity(terms.len()),
            slop: 0,
            boost: 1.0,
        };
        for term in terms {
            query.add_term(term, 1);
        }
        query
    }

    /// Create a phrase query from whitespace-separated words.
    pub fn from_phrase<S: Into<String>>(field: S, phrase: &str) -> Self {
        Self::new(field, phrase.split_whitespace().map(str::to_string).collect())
    }

    /// Append a term `pos_inc` positions after the previous one.
    ///
    /// An increment of 0 puts the term at the same position as the previous
    /// term; the first term is always at position 0.
    pub fn add_term<T: Into<String>>(&mut self, text: T, pos_inc: u32) {
        let position = match self.terms.last() {
            Some(last) => last.position + pos_inc,
            None => 0,
        };
        self.terms.push(PhraseTerm {
            position,
            text: text.into(),
        });
    }

    /// Set the slop.
    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
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

    /// The phrase terms in position order.
    pub fn terms(&self) -> &[PhraseTerm] {
        &self.terms
    }

    /// Get the slop value.
    pub fn slop(&self) -> u32 {
        self.slop
    }
}

impl Query for PhraseQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Phrase
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, _reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        if let [single] = self.terms.as_slice() {
            let term = TermQuery::new(self.field.clone(), single.text.clone()).with_boost(self.boost);
            return Ok(Some(Arc::new(term)));
        }
        Ok(None)
    }

    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        let doc_freqs = self
            .terms
            .iter()
            .map(|term| searcher.doc_freq(&self.field, &term.text))
            .collect::<Result<Vec<_>>>()?;
        let similarity = Arc::clone(searcher.similarity());
        let idf = similarity.idf_phrase(&doc_freqs, searcher.max_doc());
        Ok(Box::new(PhraseWeight {
            query: self.clone(),
            similarity,
            values: WeightValues::new(idf),
        }))
    }

    fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        for term in &self.terms {
            terms.insert(Term::new(self.field.clone(), term.text.clone()));
        }
    }

    /// Exact phrases are recorded as one range per occurrence. Sloppy phrases
    /// record every position of every phrase term.
    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        if tv.field() != self.field {
            return;
        }
        let Some(found) = self
            .terms
            .iter()
            .map(|term| tv.term(&term.text).map(|t| (term.position, &t.positions)))
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };
        if found.is_empty() {
            return;
        }

        if self.slop > 0 {
            for (_, positions) in &found {
                for &position in positions.iter() {
                    matches.add(position, position);
                }
            }
            return;
        }

        let span = found.iter().map(|(offset, _)| *offset).max().unwrap_or(0);
        let (first_offset, first_positions) = found[0];
        for &position in first_positions {
            let Some(start) = position.checked_sub(first_offset) else {
                continue;
            };
            let complete = found
                .iter()
                .all(|(offset, positions)| positions.binary_search(&(start + offset)).is_ok());
            if complete {
                matches.add(start, start + span);
            }
        }
    }

    fn to_s(&self, default_field: &str) -> String {
        let mut words: Vec<&str> = Vec::with_capacity(self.terms.len());
        let mut expected = 0;
        for term in &self.terms {
            while expected < term.position {
                words.push("<>");
                expected += 1;
            }
            words.push(&term.text);
            expected = term.position + 1;
        }
        let slop = if self.slop > 0 {
            format!("~{}", self.slop)
        } else {
            String::new()
        };
        format!(
            "{}\"{}\"{slop}{}",
            field_prefix(&self.field, default_field),
            words.join(" "),
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&(&self.field, &self.terms, self.slop))
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &PhraseQuery| {
            self.field == other.field && self.terms == other.terms && self.slop == other.slop
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
struct PhraseWeight {
    query: PhraseQuery,
    similarity: Arc<dyn Similarity>,
    values: WeightValues,
}

impl PhraseWeight {
    fn phrase_scorer(&self, reader: &dyn IndexReader) -> Result<Option<PhraseScorer>> {
        if self.query.terms.is_empty() {
            return Ok(None);
        }
        let mut postings = Vec::with_capacity(self.query.terms.len());
        for term in &self.query.terms {
            if reader.doc_freq(&self.query.field, &term.text)? == 0 {
                return Ok(None);
            }
            postings.push(PhrasePositions {
                docs: reader.term_positions_for(&self.query.field, &term.text)?,
                offset: term.position as i64,
                positions: Vec::new(),
                cursor: 0,
            });
        }
        Ok(Some(PhraseScorer {
            postings,
            norms: reader.norms(&self.query.field)?,
            slop: self.query.slop,
            weight_value: self.values.value,
            similarity: Arc::clone(&self.similarity),
            freq: 0.0,
            started: false,
        }))
    }

    fn describe(&self) -> String {
        self.query.to_s("")
    }
}

impl Weight for PhraseWeight {
    fn value(&self) -> f32 {
        self.values.value
    }

    fn sum_of_squared_weights(&mut self) -> f32 {
        self.values.sum_of_squared_weights(self.query.boost)
    }

    fn normalize(&mut self, norm: f32) {
        self.values.normalize(norm);
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        Ok(self
            .phrase_scorer(reader)?
            .map(|scorer| Box::new(scorer) as Box<dyn Scorer>))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let phrase = self.describe();
        let idf_expl = || Explanation::new(self.values.idf, format!("idf({phrase})"));
        let boost = self.query.boost;

        let mut query_expl = Explanation::new(
            boost * self.values.idf * self.values.qnorm,
            format!("query_weight({phrase}), product of:"),
        );
        if boost != 1.0 {
            query_expl.add_detail(Explanation::new(boost, "boost"));
        }
        query_expl.add_detail(idf_expl());
        query_expl.add_detail(Explanation::new(self.values.qnorm, "query_norm"));

        let mut freq = 0.0;
        let mut norm = 1.0;
        if let Some(mut scorer) = self.phrase_scorer(reader)? {
            if scorer.skip_to(doc)? && scorer.doc() == doc {
                freq = scorer.freq;
            }
            norm = scorer.norm(doc);
        }
        let tf = self.similarity.tf(freq);
        let field = &self.query.field;
        let field_expl = Explanation::new(
            tf * self.values.idf * norm,
            format!("field_weight({phrase} in {doc}), product of:"),
        )
        .with_detail(Explanation::new(tf, format!("tf(phrase_freq={freq})")))
        .with_detail(idf_expl())
        .with_detail(Explanation::new(norm, format!("field_norm(field={field}, doc={doc})")));

        if query_expl.value == 1.0 {
            return Ok(field_expl);
        }
        Ok(Explanation::new(
            query_expl.value * field_expl.value,
            format!("weight({phrase} in {doc}), product of:"),
        )
        .with_detail(query_expl)
        .with_detail(field_expl))
    }

    fn to_s(&self) -> String {
        format!("PhraseWeight({})", self.values.value)
    }
}

/// Postings of one phrase term with the positions of the current document,
/// shifted by the term's offset in the phrase.
#[derive(Debug)]
struct PhrasePositions {
    docs: Box<dyn TermDocEnum>,
    offset: i64,
    positions: Vec<i64>,
    cursor: usize,
}

impl PhrasePositions {
    fn doc(&self) -> DocId {
        self.docs.doc_num()
    }

    fn load_positions(&mut self) -> Result<()> {
        self.positions.clear();
        self.cursor = 0;
        while let Some(position) = self.docs.next_position()? {
            self.positions.push(position as i64 - self.offset);
        }
        Ok(())
    }

    fn position(&self) -> Option<i64> {
        self.positions.get(self.cursor).copied()
    }
}

#[derive(Debug)]
struct PhraseScorer {
    postings: Vec<PhrasePositions>,
    norms: Option<Arc<[u8]>>,
    slop: u32,
    weight_value: f32,
    similarity: Arc<dyn Similarity>,
    freq: f32,
    started: bool,
}

impl PhraseScorer {
    fn norm(&self, doc: DocId) -> f32 {
        self.norms
            .as_ref()
            .and_then(|norms| norms.get(doc as usize))
            .map_or(1.0, |&b| self.similarity.decode_norm(b))
    }

    /// Move every posting list to the first common document at or after the
    /// current maximum, then on to one containing the phrase.
    fn find_phrase(&mut self) -> Result<bool> {
        loop {
            let target = self.postings.iter().map(PhrasePositions::doc).max().unwrap_or(0);
            let mut aligned = true;
            for postings in &mut self.postings {
                if postings.doc() < target {
                    if !postings.docs.skip_to(target)? {
                        return Ok(false);
                    }
                    if postings.doc() != target {
                        aligned = false;
                    }
                }
            }
            if !aligned {
                continue;
            }
            for postings in &mut self.postings {
                postings.load_positions()?;
            }
            self.freq = if self.slop == 0 {
                self.exact_freq()
            } else {
                self.sloppy_freq()
            };
            if self.freq > 0.0 {
                return Ok(true);
            }
            if !self.postings[0].docs.next()? {
                return Ok(false);
            }
        }
    }

    /// Number of start positions shared by every term.
    fn exact_freq(&self) -> f32 {
        let Some((first, rest)) = self.postings.split_first() else {
            return 0.0;
        };
        first
            .positions
            .iter()
            .filter(|&&start| rest.iter().all(|p| p.positions.binary_search(&start).is_ok()))
            .count() as f32
    }

    /// Sum of `sloppy_freq(match_length)` over the minimal windows that fit
    /// within the slop.
    fn sloppy_freq(&mut self) -> f32 {
        let Some(mut end) = self.postings.iter().filter_map(PhrasePositions::position).max() else {
            return 0.0;
        };
        let mut freq = 0.0;
        loop {
            let Some(min) = (0..self.postings.len()).min_by_key(|&i| self.postings[i].position()) else {
                break;
            };
            let Some(mut start) = self.postings[min].position() else {
                break;
            };
            let next = (0..self.postings.len())
                .filter(|&i| i != min)
                .filter_map(|i| self.postings[i].position())
                .min()
                .unwrap_or(start);

            let mut exhausted = false;
            loop {
                self.postings[min].cursor += 1;
                match self.postings[min].position() {
                    None => {
                        exhausted = true;
                        break;
                    }
                    Some(position) if position <= next => start = position,
                    Some(_) => break,
                }
            }

            let match_length = end - start;
            if match_length <= self.slop as i64 {
                freq += self.similarity.sloppy_freq(match_length.max(0) as u32);
            }
            if exhausted {
                break;
            }
            if let Some(position) = self.postings[min].position() {
                end = end.max(position);
            }
        }
        freq
    }
}

impl Scorer for PhraseScorer {
    fn doc(&self) -> DocId {
        self.postings.first().map_or(0, PhrasePositions::doc)
    }

    fn next(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            for postings in &mut self.postings {
                if !postings.docs.next()? {
                    return Ok(false);
                }
            }
        } else if !self.postings[0].docs.next()? {
            return Ok(false);
        }
        self.find_phrase()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.started = true;
        for postings in &mut self.postings {
            if !postings.docs.skip_to(target)? {
                return Ok(false);
            }
        }
        self.find_phrase()
    }

    fn score(&mut self) -> Result<f32> {
        let doc = self.doc();
        Ok(self.similarity.tf(self.freq) * self.weight_value * self.norm(doc))
    }

    fn explain(&mut self, doc: DocId) -> Result<Explanation> {
        if self.doc() != doc {
            return Err(QuarryError::unsupported("PhraseScorer can only explain its current document"));
        }
        Ok(Explanation::new(self.freq, format!("phrase_freq in {doc}")))
    }
}
