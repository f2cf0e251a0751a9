//! Wildcard query implementation for pattern matching.

use std::any::Any;
use std::sync::Arc;

use regex::Regex;

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::multi_term::{MultiTermConfig, TermScore, expand_terms};
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::term::TermQuery;
use crate::query::weight::Weight;
use crate::search::searcher::Searcher;

/// A query that matches documents containing terms that match a wildcard pattern.
///
/// Supports the following wildcards:
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
/// - `\*` and `\?` match literal `*` and `?` characters
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    field: String,
    pattern: String,
    regex: Arc<Regex>,
    /// Literal text before the first wildcard; enumeration starts there.
    literal_prefix: String,
    has_wildcards: bool,
    max_terms: usize,
    boost: f32,
}

/// Pieces of a parsed wildcard pattern.
struct ParsedPattern {
    regex: String,
    literal_prefix: String,
    has_wildcards: bool,
}

fn parse_pattern(pattern: &str) -> ParsedPattern {
    let mut regex = String::from("(?s)^");
    let mut literal_prefix = String::new();
    let mut has_wildcards = false;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        let literal = match c {
            '\\' => Some(chars.next().unwrap_or('\\')),
            '*' => {
                regex.push_str(".*");
                has_wildcards = true;
                None
            }
            '?' => {
                regex.push('.');
                has_wildcards = true;
                None
            }
            c => Some(c),
        };
        if let Some(c) = literal {
            let mut buf = [0u8; 4];
            regex.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            if !has_wildcards {
                literal_prefix.push(c);
            }
        }
    }
    regex.push('$');

    ParsedPattern {
        regex,
        literal_prefix,
        has_wildcards,
    }
}

impl WildcardQuery {
    /// Create a new wildcard query.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Result<Self> {
        let pattern = pattern.into();
        let parsed = parse_pattern(&pattern);
        let regex = Regex::new(&parsed.regex)
            .map_err(|e| QuarryError::invalid_argument(format!("Invalid wildcard pattern: {e}")))?;

        Ok(WildcardQuery {
            field: field.into(),
            pattern,
            regex: Arc::new(regex),
            literal_prefix: parsed.literal_prefix,
            has_wildcards: parsed.has_wildcards,
            max_terms: MultiTermConfig::default().max_terms,
            boost: 1.0,
        })
    }

    /// Set the boost factor for this query.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Limit the number of terms the query expands to.
    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the wildcard pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if a term matches the wildcard pattern.
    pub fn matches(&self, term: &str) -> bool {
        self.regex.is_match(term)
    }
}

impl Query for WildcardQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Wildcard
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        if !self.has_wildcards {
            let term = TermQuery::new(self.field.clone(), self.literal_prefix.clone()).with_boost(self.boost);
            return Ok(Some(Arc::new(term)));
        }

        let config = MultiTermConfig::default().max_terms(self.max_terms);
        let prefix = self.literal_prefix.as_str();
        let query = expand_terms(&self.field, reader, prefix, config, self.boost, |term| {
            if !term.starts_with(prefix) {
                TermScore::Stop
            } else if self.regex.is_match(term) {
                TermScore::Accept(1.0)
            } else {
                TermScore::Skip
            }
        })?;
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Err(QuarryError::unsupported("WildcardQuery must be rewritten before searching"))
    }

    fn to_s(&self, default_field: &str) -> String {
        format!(
            "{}{}{}",
            field_prefix(&self.field, default_field),
            self.pattern,
            boost_suffix(self.boost)
        )
    }

    fn query_hash(&self) -> u64 {
        hash_of(&(&self.field, &self.pattern))
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &WildcardQuery| {
            self.field == other.field && self.pattern == other.pattern
        })
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
