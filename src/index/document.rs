//! Stored documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QuarryError, Result};

/// A document: named fields, each holding one or more string values.
///
/// Every value is analyzed and indexed under its field name and stored so it
/// can be returned with search results.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, Vec<String>>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field.
    pub fn add_field<S: Into<String>, T: Into<String>>(&mut self, name: S, value: T) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// First value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a field.
    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map_or(&[], Vec::as_slice)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over `(field, values)` in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Build a document from a JSON object.
    ///
    /// Strings, numbers and booleans become single values; arrays of those
    /// become multiple values. Nested objects are rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| QuarryError::invalid_argument("document must be a JSON object"))?;
        let mut doc = Document::new();
        for (name, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        doc.add_field(name.as_str(), json_scalar(name, item)?);
                    }
                }
                other => doc.add_field(name.as_str(), json_scalar(name, other)?),
            }
        }
        Ok(doc)
    }
}

fn json_scalar(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(QuarryError::invalid_argument(format!(
            "unsupported value for field {field}: {value}"
        ))),
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Add a field value.
    pub fn add_field<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(name, value);
        self
    }

    /// Finish building.
    pub fn build(self) -> Document {
        self.document
    }
}
