//! Query algebra: query variants, their weights and scorers.

pub mod boolean;
pub mod constant_score;
pub mod filtered;
pub mod fuzzy;
pub mod match_all;
pub mod multi_term;
pub mod phrase;
pub mod prefix;
#[allow(clippy::module_inception)]
pub mod query;
pub mod range;
pub mod scorer;
pub mod term;
pub mod weight;
pub mod wildcard;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A term: a piece of text within a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    /// Field the term belongs to.
    pub field: String,
    /// The term text.
    pub text: String,
}

impl Term {
    /// Create a new term.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}
