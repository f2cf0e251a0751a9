//! Boolean query implementation for combining multiple queries.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use ahash::AHasher;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::index::reader::{DocId, IndexReader};
use crate::index::term_vector::TermVector;
use crate::query::Term;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, rewrite_fully};
use crate::query::scorer::{
    BitVectorScorer, ConjunctionScorer, DisjunctionScorer, Scorer, live_docs,
};
use crate::query::weight::Weight;
use crate::search::explanation::Explanation;
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::search::similarity::Similarity;

/// Maximum number of clauses a boolean query accepts.
pub const MAX_CLAUSE_COUNT: usize = 1024;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

impl FromStr for Occur {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "must" => Ok(Occur::Must),
            "should" => Ok(Occur::Should),
            "must_not" | "mustnot" => Ok(Occur::MustNot),
            _ => Err(QuarryError::invalid_argument(format!(
                "unknown occur value: {s}"
            ))),
        }
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Occur::Must => "must",
            Occur::Should => "should",
            Occur::MustNot => "must_not",
        };
        f.write_str(name)
    }
}

/// A clause in a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    query: Arc<dyn Query>,
    occur: Occur,
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Arc<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }

    /// The wrapped query.
    pub fn query(&self) -> &Arc<dyn Query> {
        &self.query
    }

    /// The occurrence requirement.
    pub fn occur(&self) -> Occur {
        self.occur
    }

    /// Change the occurrence requirement.
    pub fn set_occur(&mut self, occur: Occur) {
        self.occur = occur;
    }

    /// Whether the clause must match.
    pub fn is_required(&self) -> bool {
        self.occur == Occur::Must
    }

    /// Whether the clause must not match.
    pub fn is_prohibited(&self) -> bool {
        self.occur == Occur::MustNot
    }

    /// Render the clause with its `+`/`-` prefix.
    pub fn to_s(&self, default_field: &str) -> String {
        let prefix = match self.occur {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        };
        let inner = self.query.to_s(default_field);
        if self.query.kind() == QueryKind::Boolean {
            format!("{prefix}({inner})")
        } else {
            format!("{prefix}{inner}")
        }
    }
}

impl PartialEq for BooleanClause {
    fn eq(&self, other: &Self) -> bool {
        self.occur == other.occur && *self.query == *other.query
    }
}

/// Something that can be added to a [`BooleanQuery`]: a query or a ready clause.
#[derive(Debug, Clone)]
pub enum ClauseInput {
    /// A query to wrap with the given occur.
    Query(Arc<dyn Query>),
    /// A pre-built clause; its own occur wins.
    Clause(BooleanClause),
}

impl From<Arc<dyn Query>> for ClauseInput {
    fn from(query: Arc<dyn Query>) -> Self {
        ClauseInput::Query(query)
    }
}

impl From<BooleanClause> for ClauseInput {
    fn from(clause: BooleanClause) -> Self {
        ClauseInput::Clause(clause)
    }
}

impl<Q: Query + 'static> From<Q> for ClauseInput {
    fn from(query: Q) -> Self {
        ClauseInput::Query(Arc::new(query))
    }
}

/// A boolean query that combines multiple queries with boolean logic.
///
/// A document matches if it matches every MUST clause, no MUST_NOT clause and,
/// when there are no MUST clauses, at least one SHOULD clause. A query made of
/// MUST_NOT clauses only matches every live document the clauses don't.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
    coord_disabled: bool,
    minimum_should_match: usize,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanQuery {
    /// Create a new empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
            coord_disabled: false,
            minimum_should_match: 0,
        }
    }

    /// Create a boolean query that does not scale scores by the coordination factor.
    pub fn with_coord_disabled(coord_disabled: bool) -> Self {
        BooleanQuery {
            coord_disabled,
            ..Self::new()
        }
    }

    /// Start building a boolean query.
    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }

    /// Add a query or clause.
    ///
    /// A query is wrapped with `occur` (SHOULD when `None`). A pre-built clause
    /// keeps its own occur and a given `occur` is ignored.
    pub fn add(&mut self, item: impl Into<ClauseInput>, occur: Option<Occur>) -> Result<()> {
        let clause = match item.into() {
            ClauseInput::Query(query) => BooleanClause::new(query, occur.unwrap_or(Occur::Should)),
            ClauseInput::Clause(clause) => {
                if let Some(occur) = occur {
                    warn!(
                        "ignoring occur {occur} given with a pre-built {} clause",
                        clause.occur
                    );
                }
                clause
            }
        };
        self.add_clause(clause)
    }

    /// Add a clause.
    pub fn add_clause(&mut self, clause: BooleanClause) -> Result<()> {
        if self.clauses.len() >= MAX_CLAUSE_COUNT {
            return Err(QuarryError::query(format!(
                "too many clauses: a boolean query accepts at most {MAX_CLAUSE_COUNT}"
            )));
        }
        self.clauses.push(clause);
        Ok(())
    }

    /// Add a MUST clause.
    pub fn add_must(&mut self, query: Arc<dyn Query>) -> Result<()> {
        self.add_clause(BooleanClause::must(query))
    }

    /// Add a SHOULD clause.
    pub fn add_should(&mut self, query: Arc<dyn Query>) -> Result<()> {
        self.add_clause(BooleanClause::should(query))
    }

    /// Add a MUST_NOT clause.
    pub fn add_must_not(&mut self, query: Arc<dyn Query>) -> Result<()> {
        self.add_clause(BooleanClause::must_not(query))
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Minimum number of should clauses that must match.
    pub fn minimum_should_match(&self) -> usize {
        self.minimum_should_match
    }

    /// Whether scores are not scaled by the coordination factor.
    pub fn coord_disabled(&self) -> bool {
        self.coord_disabled
    }

    /// Check if this query has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses with the given occurrence.
    pub fn clauses_by_occur(&self, occur: Occur) -> Vec<&BooleanClause> {
        self.clauses.iter().filter(|c| c.occur == occur).collect()
    }
}

impl Query for BooleanQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Boolean
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        if self.clauses.len() == 1 && self.minimum_should_match <= 1 {
            let clause = &self.clauses[0];
            if !clause.is_prohibited() {
                let inner = rewrite_fully(&clause.query, reader)?;
                if self.boost == 1.0 {
                    return Ok(Some(inner));
                }
                let mut boosted = inner.clone_box();
                boosted.set_boost(inner.boost() * self.boost);
                return Ok(Some(Arc::from(boosted)));
            }
        }

        let mut changed = false;
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let query = rewrite_fully(&clause.query, reader)?;
            changed |= !Arc::ptr_eq(&query, &clause.query);
            clauses.push(BooleanClause::new(query, clause.occur));
        }
        if !changed {
            return Ok(None);
        }
        Ok(Some(Arc::new(BooleanQuery {
            clauses,
            ..self.clone()
        })))
    }

    fn create_weight(&self, searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        let mut weights = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            weights.push((clause.query.create_weight(searcher)?, clause.occur));
        }
        Ok(Box::new(BooleanWeight {
            boost: self.boost,
            qnorm: 1.0,
            coord_disabled: self.coord_disabled,
            minimum_should_match: self.minimum_should_match,
            similarity: Arc::clone(searcher.similarity()),
            weights,
        }))
    }

    fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        for clause in &self.clauses {
            if !clause.is_prohibited() {
                clause.query.extract_terms(terms);
            }
        }
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        for clause in self.clauses.iter().filter(|c| !c.is_prohibited()) {
            clause.query.match_vector(matches, tv);
        }
    }

    fn to_s(&self, default_field: &str) -> String {
        let body = self
            .clauses
            .iter()
            .map(|c| c.to_s(default_field))
            .collect::<Vec<_>>()
            .join(" ");
        if self.boost == 1.0 {
            body
        } else {
            format!("({body}){}", boost_suffix(self.boost))
        }
    }

    fn query_hash(&self) -> u64 {
        let mut hasher = AHasher::default();
        for clause in &self.clauses {
            clause.query.hash(&mut hasher);
            clause.occur.hash(&mut hasher);
        }
        self.coord_disabled.hash(&mut hasher);
        self.minimum_should_match.hash(&mut hasher);
        hasher.finish()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &BooleanQuery| {
            self.coord_disabled == other.coord_disabled
                && self.minimum_should_match == other.minimum_should_match
                && self.clauses == other.clauses
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
struct BooleanWeight {
    boost: f32,
    qnorm: f32,
    coord_disabled: bool,
    minimum_should_match: usize,
    similarity: Arc<dyn Similarity>,
    weights: Vec<(Box<dyn Weight>, Occur)>,
}

impl BooleanWeight {
    fn max_coord(&self) -> usize {
        self.weights
            .iter()
            .filter(|(_, occur)| *occur != Occur::MustNot)
            .count()
    }

    fn coord_factors(&self, max_coord: usize) -> Vec<f32> {
        (0..=max_coord)
            .map(|overlap| {
                if self.coord_disabled {
                    1.0
                } else {
                    self.similarity.coord(overlap, max_coord)
                }
            })
            .collect()
    }
}

impl Weight for BooleanWeight {
    fn value(&self) -> f32 {
        self.boost
    }

    fn sum_of_squared_weights(&mut self) -> f32 {
        let mut sum = 0.0;
        for (weight, occur) in &mut self.weights {
            if *occur != Occur::MustNot {
                sum += weight.sum_of_squared_weights();
            }
        }
        sum * self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32) {
        self.qnorm = norm;
        let norm = norm * self.boost;
        for (weight, _) in &mut self.weights {
            weight.normalize(norm);
        }
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut prohibited = Vec::new();
        for (weight, occur) in &self.weights {
            match (weight.scorer(reader)?, occur) {
                (Some(scorer), Occur::Must) => required.push(scorer),
                (Some(scorer), Occur::Should) => optional.push(scorer),
                (Some(scorer), Occur::MustNot) => prohibited.push(scorer),
                (None, Occur::Must) => return Ok(None),
                (None, _) => {}
            }
        }
        if self.minimum_should_match > optional.len() {
            return Ok(None);
        }

        let optional_required = !required.is_empty() && self.minimum_should_match > 0;
        let (base, optional) = if !required.is_empty() {
            let optional = if optional.is_empty() {
                None
            } else {
                Some(DisjunctionScorer::new(optional, self.minimum_should_match))
            };
            (Base::Required(ConjunctionScorer::new(required)), optional)
        } else if !optional.is_empty() {
            let disjunction = DisjunctionScorer::new(optional, self.minimum_should_match);
            (Base::Optional(disjunction), None)
        } else if !prohibited.is_empty() {
            let all = BitVectorScorer::new(
                Arc::new(live_docs(reader)),
                reader.max_doc(),
                self.boost * self.qnorm,
            );
            (Base::All(all), None)
        } else {
            return Ok(None);
        };

        let excluded = if prohibited.is_empty() {
            None
        } else {
            Some(DisjunctionScorer::new(prohibited, 1))
        };

        Ok(Some(Box::new(BooleanScorer {
            base,
            optional,
            optional_required,
            optional_done: false,
            excluded,
            excluded_done: false,
            coords: self.coord_factors(self.max_coord()),
            doc: 0,
        })))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        let max_coord = self.max_coord();
        let mut sum_expl = Explanation::new(0.0, "sum of:");
        let mut coord = 0;
        let mut should_matched = 0;
        let mut sum = 0.0;
        let mut fail = false;

        for (weight, occur) in &self.weights {
            let expl = weight.explain(reader, doc)?;
            if expl.is_match() {
                if *occur == Occur::MustNot {
                    sum_expl.add_detail(Explanation::new(0.0, "match prohibited").with_detail(expl));
                    fail = true;
                } else {
                    sum += expl.value;
                    coord += 1;
                    if *occur == Occur::Should {
                        should_matched += 1;
                    }
                    sum_expl.add_detail(expl);
                }
            } else if *occur == Occur::Must {
                sum_expl.add_detail(Explanation::new(0.0, "match required").with_detail(expl));
                fail = true;
            }
        }

        if fail {
            sum_expl.description =
                "Failure to meet condition(s) of required/prohibited clause(s)".to_string();
            return Ok(sum_expl);
        }
        if should_matched < self.minimum_should_match {
            sum_expl.description = format!(
                "Failure to match minimum number of optional clauses: {}",
                self.minimum_should_match
            );
            return Ok(sum_expl);
        }
        if max_coord == 0 {
            if self.weights.is_empty() || reader.is_deleted(doc) || doc >= reader.max_doc() {
                return Ok(Explanation::new(0.0, "no matching clauses"));
            }
            return Ok(Explanation::new(self.boost * self.qnorm, "match all except prohibited, product of:")
                .with_detail(Explanation::new(self.boost, "boost"))
                .with_detail(Explanation::new(self.qnorm, "query_norm")));
        }

        sum_expl.value = sum;
        if coord == 0 {
            return Ok(sum_expl);
        }
        let coord_factor = self.coord_factors(max_coord)[coord];
        if coord_factor == 1.0 {
            if sum_expl.details.len() == 1 {
                return Ok(sum_expl.details.remove(0));
            }
            return Ok(sum_expl);
        }
        Ok(Explanation::new(sum * coord_factor, "product of:")
            .with_detail(sum_expl)
            .with_detail(Explanation::new(coord_factor, format!("coord({coord}/{max_coord})"))))
    }

    fn to_s(&self) -> String {
        let children = self
            .weights
            .iter()
            .map(|(w, _)| w.to_s())
            .collect::<Vec<_>>()
            .join(", ");
        format!("BooleanWeight({}, [{children}])", self.boost)
    }
}

#[derive(Debug)]
enum Base {
    Required(ConjunctionScorer),
    Optional(DisjunctionScorer),
    All(BitVectorScorer),
}

impl Base {
    fn scorer(&mut self) -> &mut dyn Scorer {
        match self {
            Base::Required(s) => s,
            Base::Optional(s) => s,
            Base::All(s) => s,
        }
    }

    fn doc(&self) -> DocId {
        match self {
            Base::Required(s) => s.doc(),
            Base::Optional(s) => s.doc(),
            Base::All(s) => s.doc(),
        }
    }
}

/// Position `scorer` on the first doc `>= doc` and report whether it is on `doc`.
fn positioned(scorer: &mut DisjunctionScorer, done: &mut bool, doc: DocId) -> Result<bool> {
    if *done {
        return Ok(false);
    }
    if (!scorer.is_started() || scorer.doc() < doc) && !scorer.skip_to(doc)? {
        *done = true;
        return Ok(false);
    }
    Ok(scorer.doc() == doc)
}

/// Drives a required, optional or all-docs base iterator, dropping excluded docs.
#[derive(Debug)]
struct BooleanScorer {
    base: Base,
    optional: Option<DisjunctionScorer>,
    optional_required: bool,
    optional_done: bool,
    excluded: Option<DisjunctionScorer>,
    excluded_done: bool,
    coords: Vec<f32>,
    doc: DocId,
}

impl BooleanScorer {
    fn find_match(&mut self, mut found: bool) -> Result<bool> {
        while found {
            let doc = self.base.doc();
            if let Some(excluded) = self.excluded.as_mut() {
                if positioned(excluded, &mut self.excluded_done, doc)? {
                    found = self.base.scorer().next()?;
                    continue;
                }
            }
            if self.optional_required {
                let Some(optional) = self.optional.as_mut() else {
                    return Ok(false);
                };
                if !positioned(optional, &mut self.optional_done, doc)? {
                    if self.optional_done {
                        return Ok(false);
                    }
                    let target = optional.doc();
                    found = self.base.scorer().skip_to(target)?;
                    continue;
                }
            }
            self.doc = doc;
            return Ok(true);
        }
        Ok(false)
    }
}

impl Scorer for BooleanScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> Result<bool> {
        let found = self.base.scorer().next()?;
        self.find_match(found)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        let found = self.base.scorer().skip_to(target)?;
        self.find_match(found)
    }

    fn score(&mut self) -> Result<f32> {
        let doc = self.doc;
        let (mut sum, mut overlap) = match &mut self.base {
            Base::All(all) => return all.score(),
            Base::Required(required) => (required.score()?, required.len()),
            Base::Optional(optional) => (optional.score()?, optional.matchers()),
        };
        if let Some(optional) = self.optional.as_mut() {
            if positioned(optional, &mut self.optional_done, doc)? {
                sum += optional.score()?;
                overlap += optional.matchers();
            }
        }
        let coord = self.coords.get(overlap).copied().unwrap_or(1.0);
        Ok(sum * coord)
    }
}

/// Builder for [`BooleanQuery`].
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
    clauses: Vec<BooleanClause>,
}

impl BooleanQueryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Arc<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::must(query));
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Arc<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::should(query));
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Arc<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::must_not(query));
        self
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f32) -> Self {
        self.query.boost = boost;
        self
    }

    /// Disable the coordination factor.
    pub fn coord_disabled(mut self, disabled: bool) -> Self {
        self.query.coord_disabled = disabled;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn minimum_should_match(mut self, minimum: usize) -> Self {
        self.query.minimum_should_match = minimum;
        self
    }

    /// Build the query. Fails if there are more than [`MAX_CLAUSE_COUNT`] clauses.
    pub fn build(self) -> Result<BooleanQuery> {
        let mut query = self.query;
        for clause in self.clauses {
            query.add_clause(clause)?;
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::index_of;
    use crate::query::term::TermQuery;

    fn term(text: &str) -> Arc<dyn Query> {
        Arc::new(TermQuery::new("body", text))
    }

    fn matching_docs(query: BooleanQuery, texts: &[&str]) -> Vec<DocId> {
        let reader = index_of(texts).reader();
        let searcher = Searcher::new(&reader);
        let query: Arc<dyn Query> = Arc::new(query);
        let weight = searcher.create_weight(&query).unwrap();
        let mut docs = Vec::new();
        if let Some(mut scorer) = weight.scorer(&reader).unwrap() {
            while scorer.next().unwrap() {
                docs.push(scorer.doc());
            }
        }
        docs
    }

    #[test]
    fn test_occur_from_str() {
        assert_eq!("must".parse::<Occur>().unwrap(), Occur::Must);
        assert_eq!("SHOULD".parse::<Occur>().unwrap(), Occur::Should);
        assert_eq!("must_not".parse::<Occur>().unwrap(), Occur::MustNot);
        assert!("maybe".parse::<Occur>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_must_and_must_not() {
        let query = BooleanQuery::builder()
            .must(term("a"))
            .must_not(term("b"))
            .build()
            .unwrap();
        assert_eq!(matching_docs(query, &["a", "a b", "b"]), vec![0]);
    }

    #[test]
    fn test_should_only() {
        let query = BooleanQuery::builder()
            .should(term("a"))
            .should(term("c"))
            .build()
            .unwrap();
        assert_eq!(matching_docs(query, &["a", "b", "c", "a c"]), vec![0, 2, 3]);
    }

    #[test]
    fn test_must_with_optional_scoring() {
        let query = BooleanQuery::builder()
            .must(term("a"))
            .should(term("c"))
            .build()
            .unwrap();
        let reader = index_of(&["a b", "a c", "c"]).reader();
        let searcher = Searcher::new(&reader);
        let query: Arc<dyn Query> = Arc::new(query);
        let weight = searcher.create_weight(&query).unwrap();
        let mut scorer = weight.scorer(&reader).unwrap().unwrap();
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 0);
        let without_optional = scorer.score().unwrap();
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 1);
        let with_optional = scorer.score().unwrap();
        assert!(!scorer.next().unwrap());
        assert!(with_optional > without_optional);
    }

    #[test]
    fn test_minimum_should_match() {
        let query = BooleanQuery::builder()
            .should(term("a"))
            .should(term("b"))
            .should(term("c"))
            .minimum_should_match(2)
            .build()
            .unwrap();
        assert_eq!(matching_docs(query, &["a", "a b", "b c", "c", "a b c"]), vec![1, 2, 4]);

        let query = BooleanQuery::builder()
            .must(term("x"))
            .should(term("a"))
            .should(term("b"))
            .minimum_should_match(1)
            .build()
            .unwrap();
        assert_eq!(matching_docs(query, &["x", "x a", "a b", "x b"]), vec![1, 3]);
    }

    #[test]
    fn test_pure_negative_matches_complement() {
        let query = BooleanQuery::builder().must_not(term("b")).build().unwrap();
        assert_eq!(matching_docs(query, &["a", "a b", "c", "b"]), vec![0, 2]);
    }

    #[test]
    fn test_missing_required_term_matches_nothing() {
        let query = BooleanQuery::builder()
            .must(term("a"))
            .must(term("zzz"))
            .build()
            .unwrap();
        assert!(matching_docs(query, &["a", "a b"]).is_empty());
    }

    #[test]
    fn test_coord() {
        let reader = index_of(&["a", "a b"]).reader();
        let searcher = Searcher::new(&reader);
        let make = |coord_disabled: bool| -> Arc<dyn Query> {
            Arc::new(
                BooleanQuery::builder()
                    .should(term("a"))
                    .should(term("zzz"))
                    .coord_disabled(coord_disabled)
                    .build()
                    .unwrap(),
            )
        };
        let score_of = |query: Arc<dyn Query>| {
            let weight = searcher.create_weight(&query).unwrap();
            let mut scorer = weight.scorer(&reader).unwrap().unwrap();
            assert!(scorer.next().unwrap());
            scorer.score().unwrap()
        };
        let with_coord = score_of(make(false));
        let without_coord = score_of(make(true));
        assert!((with_coord * 2.0 - without_coord).abs() < 1e-6);
    }

    #[test]
    fn test_add_ignores_occur_for_clauses() {
        let mut query = BooleanQuery::new();
        query.add(TermQuery::new("body", "a"), None).unwrap();
        query.add(BooleanClause::must_not(term("b")), Some(Occur::Must)).unwrap();
        query.add(term("c"), Some(Occur::Must)).unwrap();
        assert_eq!(query.clauses()[0].occur(), Occur::Should);
        assert_eq!(query.clauses()[1].occur(), Occur::MustNot);
        assert_eq!(query.clauses()[2].occur(), Occur::Must);
        assert_eq!(query.to_s("body"), "a -b +c");
    }

    #[test]
    fn test_too_many_clauses() {
        let mut query = BooleanQuery::new();
        for i in 0..MAX_CLAUSE_COUNT {
            query.add_should(term(&format!("t{i}"))).unwrap();
        }
        assert!(query.add_should(term("overflow")).is_err());
    }

    #[test]
    fn test_to_s_nested_and_boosted() {
        let inner = BooleanQuery::builder()
            .should(term("b"))
            .should(term("c"))
            .build()
            .unwrap();
        let query = BooleanQuery::builder()
            .must(term("a"))
            .must_not(Arc::new(inner))
            .boost(2.0)
            .build()
            .unwrap();
        assert_eq!(query.to_s("body"), "(+a -(b c))^2.0");
        assert_eq!(query.to_s("title"), "(+body:a -(body:b body:c))^2.0");
    }

    #[test]
    fn test_single_clause_rewrites_to_inner_query() {
        let reader = index_of(&["a"]).reader();
        let query = BooleanQuery::builder()
            .must(term("a"))
            .boost(3.0)
            .build()
            .unwrap();
        let rewritten = query.rewrite(&reader).unwrap().unwrap();
        assert_eq!(rewritten.kind(), QueryKind::Term);
        assert_eq!(rewritten.boost(), 3.0);
    }

    #[test]
    fn test_structural_equality() {
        let a: Box<dyn Query> = Box::new(BooleanQuery::builder().must(term("a")).build().unwrap());
        let b: Box<dyn Query> = Box::new(BooleanQuery::builder().must(term("a")).build().unwrap());
        let c: Box<dyn Query> = Box::new(BooleanQuery::builder().should(term("a")).build().unwrap());
        assert!(*a == *b);
        assert!(*a != *c);
    }

    #[test]
    fn test_explain_matches_score() {
        let reader = index_of(&["a b", "a c", "b c", "a b c"]).reader();
        let searcher = Searcher::new(&reader);
        let query: Arc<dyn Query> = Arc::new(
            BooleanQuery::builder()
                .should(term("a"))
                .should(term("b"))
                .must_not(term("c"))
                .build()
                .unwrap(),
        );
        let weight = searcher.create_weight(&query).unwrap();
        let mut scorer = weight.scorer(&reader).unwrap().unwrap();
        let mut seen = Vec::new();
        while scorer.next().unwrap() {
            let doc = scorer.doc();
            let score = scorer.score().unwrap();
            let expl = weight.explain(&reader, doc).unwrap();
            assert!((expl.value - score).abs() < 1e-5, "{expl}");
            seen.push(doc);
        }
        assert_eq!(seen, vec![0]);
        let prohibited = weight.explain(&reader, 3).unwrap();
        assert_eq!(prohibited.value, 0.0);
        assert!(prohibited.to_s().contains("match prohibited"));
    }
}
