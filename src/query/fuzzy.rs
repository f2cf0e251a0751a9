//! Fuzzy query implementation for approximate string matching.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::multi_term::{DEFAULT_MAX_TERMS, MultiTermConfig, TermScore, expand_terms};
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::term::TermQuery;
use crate::query::weight::Weight;
use crate::search::searcher::Searcher;
use crate::util::levenshtein::bounded_distance;

/// Default minimum similarity of a fuzzy match.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Configuration for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Minimum similarity a term needs to match, in `[0, 1)`.
    pub min_similarity: f32,
    /// Number of leading characters a term must share exactly.
    pub prefix_length: usize,
    /// Maximum number of terms the query expands to.
    pub max_terms: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        FuzzyConfig {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            prefix_length: 0,
            max_terms: DEFAULT_MAX_TERMS,
        }
    }
}

impl FuzzyConfig {
    /// Set the minimum similarity.
    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Set the shared prefix length.
    pub fn prefix_length(mut self, prefix_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self
    }

    /// Set the maximum number of expanded terms.
    pub fn max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_similarity >= 1.0 {
            return Err(QuarryError::invalid_argument(format!(
                "{} >= 1.0. min_similarity must be < 1.0",
                self.min_similarity
            )));
        }
        if self.min_similarity < 0.0 || self.min_similarity.is_nan() {
            return Err(QuarryError::invalid_argument(format!(
                "{} < 0.0. min_similarity must be >= 0.0",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

/// A query that matches terms similar to a given term.
///
/// Similarity is `1 - distance / (prefix_length + min(n, m))` where `distance`
/// is the Levenshtein distance between the parts after the shared prefix and
/// `n`, `m` are their lengths. Matching terms are boosted by how far their
/// similarity exceeds `min_similarity`.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    field: String,
    term: String,
    config: FuzzyConfig,
    boost: f32,
}

impl FuzzyQuery {
    /// Create a fuzzy query with the default configuration.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        FuzzyQuery {
            field: field.into(),
            term: term.into(),
            config: FuzzyConfig::default(),
            boost: 1.0,
        }
    }

    /// Create a fuzzy query, validating `config`.
    pub fn with_config<F: Into<String>, T: Into<String>>(
        field: F,
        term: T,
        config: FuzzyConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(FuzzyQuery {
            config,
            ..Self::new(field, term)
        })
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

    /// Get the term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Get the configuration.
    pub fn config(&self) -> FuzzyConfig {
        self.config
    }
}

/// Scores candidate terms against the query term.
struct FuzzyMatcher {
    prefix: String,
    text: Vec<char>,
    min_similarity: f32,
    scale_factor: f32,
}

impl FuzzyMatcher {
    fn new(term: &str, config: &FuzzyConfig) -> Self {
        let prefix: String = term.chars().take(config.prefix_length).collect();
        let text = term.chars().skip(config.prefix_length).collect();
        FuzzyMatcher {
            prefix,
            text,
            min_similarity: config.min_similarity,
            scale_factor: 1.0 / (1.0 - config.min_similarity),
        }
    }

    fn similarity(&self, target: &[char]) -> f32 {
        let pre_len = self.prefix.chars().count();
        let (n, m) = (self.text.len(), target.len());
        if n == 0 || m == 0 {
            let rest = n.max(m);
            return if pre_len == 0 {
                if rest == 0 { 1.0 } else { 0.0 }
            } else {
                1.0 - rest as f32 / pre_len as f32
            };
        }
        let shorter = n.min(m);
        let max_distance = ((1.0 - self.min_similarity) * (shorter + pre_len) as f32) as usize;
        match bounded_distance(&self.text, target, max_distance) {
            Some(distance) => 1.0 - distance as f32 / (pre_len + shorter) as f32,
            None => 0.0,
        }
    }

    fn score(&self, term: &str) -> TermScore {
        let Some(rest) = term.strip_prefix(self.prefix.as_str()) else {
            return TermScore::Stop;
        };
        let target: Vec<char> = rest.chars().collect();
        let similarity = self.similarity(&target);
        if similarity > self.min_similarity {
            TermScore::Accept((similarity - self.min_similarity) * self.scale_factor)
        } else {
            TermScore::Skip
        }
    }
}

impl Query for FuzzyQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Fuzzy
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        if self.config.prefix_length >= self.term.chars().count() {
            let term = TermQuery::new(self.field.clone(), self.term.clone()).with_boost(self.boost);
            return Ok(Some(Arc::new(term)));
        }

        let matcher = FuzzyMatcher::new(&self.term, &self.config);
        let config = MultiTermConfig::default().max_terms(self.config.max_terms);
        let query = expand_terms(&self.field, reader, &matcher.prefix, config, self.boost, |term| {
            matcher.score(term)
        })?;
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Err(QuarryError::unsupported("FuzzyQuery must be rewritten before searching"))
    }

    fn to_s(&self, default_field: &str) -> String {
        let min_sim = if self.config.min_similarity == DEFAULT_MIN_SIMILARITY {
            String::new()
        } else {
            self.config.min_similarity.to_string()
        };
        format!(
            "{}{}~{min_sim}{}",
            field_prefix(&self.field, default_field),
            self.term,
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&(
            &self.field,
            &self.term,
            self.config.min_similarity.to_bits(),
            self.config.prefix_length,
        ))
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &FuzzyQuery| {
            self.field == other.field
                && self.term == other.term
                && self.config.min_similarity == other.config.min_similarity
                && self.config.prefix_length == other.config.prefix_length
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
    fn test_config_validation() {
        assert!(FuzzyQuery::with_config("f", "t", FuzzyConfig::default().min_similarity(1.0)).is_err());
        assert!(FuzzyQuery::with_config("f", "t", FuzzyConfig::default().min_similarity(-0.1)).is_err());
        assert!(FuzzyQuery::with_config("f", "t", FuzzyConfig::default().min_similarity(0.0)).is_ok());
    }

    #[test]
    fn test_similarity() {
        let matcher = FuzzyMatcher::new("lucine", &FuzzyConfig::default());
        let sim = |s: &str| matcher.similarity(&s.chars().collect::<Vec<_>>());
        assert!((sim("lucene") - (1.0 - 1.0 / 6.0)).abs() < 1e-6);
        assert!((sim("lucid") - 0.6).abs() < 1e-6);
        assert_eq!(sim("lucine"), 1.0);
    }

    #[test]
    fn test_rewrite_expands_similar_terms() {
        let reader = index_of(&["lucene lucid", "lunar locate"]).reader();
        let query = FuzzyQuery::new("body", "lucine");
        let rewritten = query.rewrite(&reader).unwrap().unwrap();
        let multi = rewritten.as_any().downcast_ref::<MultiTermQuery>().unwrap();
        let terms = multi.terms();
        let names: Vec<&str> = terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["lucene", "lucid"]);
        assert!(terms[0].boost > terms[1].boost);
    }

    #[test]
    fn test_prefix_length() {
        let reader = index_of(&["abcd abxd zbcd"]).reader();
        let config = FuzzyConfig::default().prefix_length(1);
        let query = FuzzyQuery::with_config("body", "abcd", config).unwrap();
        let rewritten = query.rewrite(&reader).unwrap().unwrap();
        let multi = rewritten.as_any().downcast_ref::<MultiTermQuery>().unwrap();
        let names: Vec<String> = multi.terms().into_iter().map(|t| t.term).collect();
        assert_eq!(names, vec!["abcd", "abxd"]);

        let long_prefix = FuzzyConfig::default().prefix_length(4);
        let query = FuzzyQuery::with_config("body", "abcd", long_prefix).unwrap();
        assert_eq!(query.rewrite(&reader).unwrap().unwrap().kind(), QueryKind::Term);
    }

    #[test]
    fn test_to_s() {
        assert_eq!(FuzzyQuery::new("body", "word").to_s("body"), "word~");
        let query = FuzzyQuery::with_config("body", "word", FuzzyConfig::default().min_similarity(0.8))
            .unwrap()
            .with_boost(2.0);
        assert_eq!(query.to_s("title"), "body:word~0.8^2.0");
    }
}
