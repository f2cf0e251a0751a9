//! Per-document term vectors.
//!
//! A [`TermVector`] lists the terms of one field of one document with the
//! positions they occur at, plus the byte offsets of every position in the
//! field's text. A multi-valued field's text is its values joined by
//! [`VALUE_SEPARATOR`], and offsets point into that joined string.

use std::collections::BTreeMap;

use crate::index::analysis::Analyzer;

/// Separator placed between the values of a multi-valued field.
pub const VALUE_SEPARATOR: &str = " ";

/// One term of a term vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVectorTerm {
    /// Term text.
    pub text: String,
    /// Positions of the term, ascending.
    pub positions: Vec<u32>,
}

/// Byte range of the token at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
}

/// Terms, positions and offsets of one field of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVector {
    field: String,
    terms: Vec<TermVectorTerm>,
    offsets: Vec<Offset>,
}

impl TermVector {
    /// Analyze the values of `field` the same way indexing does.
    pub fn from_values(field: &str, values: &[String], analyzer: &dyn Analyzer) -> Self {
        let mut occurrences: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        let mut offsets = Vec::new();
        let mut base = 0;
        for value in values {
            for token in analyzer.tokens(field, value) {
                occurrences
                    .entry(token.text)
                    .or_default()
                    .push(offsets.len() as u32);
                offsets.push(Offset {
                    start: base + token.start,
                    end: base + token.end,
                });
            }
            base += value.len() + VALUE_SEPARATOR.len();
        }

        TermVector {
            field: field.to_string(),
            terms: occurrences
                .into_iter()
                .map(|(text, positions)| TermVectorTerm { text, positions })
                .collect(),
            offsets,
        }
    }

    /// The field this vector describes.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Every term, sorted by text.
    pub fn terms(&self) -> &[TermVectorTerm] {
        &self.terms
    }

    /// Look up one term.
    pub fn term(&self, text: &str) -> Option<&TermVectorTerm> {
        self.terms
            .binary_search_by(|term| term.text.as_str().cmp(text))
            .ok()
            .map(|index| &self.terms[index])
    }

    /// Index of the first term not less than `text`.
    pub fn scan_to_term_index(&self, text: &str) -> usize {
        self.terms.partition_point(|term| term.text.as_str() < text)
    }

    /// Offset of the token at `position`.
    pub fn offset(&self, position: u32) -> Option<Offset> {
        self.offsets.get(position as usize).copied()
    }

    /// Number of positions in the field.
    pub fn num_positions(&self) -> usize {
        self.offsets.len()
    }
}
