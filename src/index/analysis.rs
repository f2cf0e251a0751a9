//! Minimal analyzers that turn field text into indexed terms.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// A term and the byte range of the text it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Indexed term text.
    pub text: String,
    /// Byte offset of the token's first character.
    pub start: usize,
    /// Byte offset one past the token's last character.
    pub end: usize,
}

impl Token {
    fn new(text: String, start: usize, source: &str) -> Self {
        Token {
            text,
            start,
            end: start + source.len(),
        }
    }
}

/// Converts the text of a field into the sequence of terms to index.
///
/// The i-th returned term is indexed at position i.
pub trait Analyzer: Send + Sync + Debug {
    /// Tokenize `text` for `field`, keeping the offset of every token.
    fn tokens(&self, field: &str, text: &str) -> Vec<Token>;

    /// Analyze `text` for `field`.
    fn analyze(&self, field: &str, text: &str) -> Vec<String> {
        self.tokens(field, text).into_iter().map(|token| token.text).collect()
    }
}

/// Splits on whitespace and keeps tokens verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceAnalyzer {
    lowercase: bool,
}

impl WhitespaceAnalyzer {
    /// Create a whitespace analyzer that preserves case.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a whitespace analyzer that lowercases tokens.
    pub fn lowercasing() -> Self {
        WhitespaceAnalyzer { lowercase: true }
    }
}

impl Analyzer for WhitespaceAnalyzer {
    fn tokens(&self, _field: &str, text: &str) -> Vec<Token> {
        let base = text.as_ptr() as usize;
        text.split_whitespace()
            .map(|word| {
                let term = if self.lowercase {
                    word.to_lowercase()
                } else {
                    word.to_string()
                };
                Token::new(term, word.as_ptr() as usize - base, word)
            })
            .collect()
    }
}

/// Splits on Unicode word boundaries and lowercases.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyzer;

impl Analyzer for StandardAnalyzer {
    fn tokens(&self, _field: &str, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .map(|(start, word)| Token::new(word.to_lowercase(), start, word))
            .collect()
    }
}

/// Serializable analyzer selection for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// [`WhitespaceAnalyzer`], case preserved.
    #[default]
    Whitespace,
    /// [`WhitespaceAnalyzer`], lowercased.
    WhitespaceLowercase,
    /// [`StandardAnalyzer`].
    Standard,
}

impl AnalyzerKind {
    /// Instantiate the selected analyzer.
    pub fn build(self) -> Arc<dyn Analyzer> {
        match self {
            AnalyzerKind::Whitespace => Arc::new(WhitespaceAnalyzer::new()),
            AnalyzerKind::WhitespaceLowercase => Arc::new(WhitespaceAnalyzer::lowercasing()),
            AnalyzerKind::Standard => Arc::new(StandardAnalyzer),
        }
    }
}
