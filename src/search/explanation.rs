//! Score explanations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node in the tree describing how a score was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// The value of this node.
    pub value: f32,
    /// What this node computes.
    pub description: String,
    /// Sub-explanations whose values combine into `value`.
    pub details: Vec<Explanation>,
}

impl Explanation {
    /// Create a leaf explanation.
    pub fn new<S: Into<String>>(value: f32, description: S) -> Self {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Append a sub-explanation.
    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    /// Builder form of [`add_detail`](Self::add_detail).
    pub fn with_detail(mut self, detail: Explanation) -> Self {
        self.details.push(detail);
        self
    }

    /// The score this explanation accounts for.
    pub fn score(&self) -> f32 {
        self.value
    }

    /// Whether the explained document matched (a positive score).
    pub fn is_match(&self) -> bool {
        self.value > 0.0
    }

    fn write_depth(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&format!("{} = {}\n", self.value, self.description));
        for detail in &self.details {
            detail.write_depth(out, depth + 1);
        }
    }

    /// Render the tree as indented text, one node per line.
    pub fn to_s(&self) -> String {
        let mut out = String::new();
        self.write_depth(&mut out, 0);
        out
    }

    /// Render the tree as nested HTML lists.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<ul>\n");
        out.push_str(&format!(
            "<li>{} = {}</li>\n",
            self.value,
            escape_html(&self.description)
        ));
        for detail in &self.details {
            out.push_str(&detail.to_html());
        }
        out.push_str("</ul>\n");
        out
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_s())
    }
}
