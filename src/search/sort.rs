//! Sorting search results by score, document number or field value.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::index::cache::FieldIndexKey;
use crate::index::reader::{DocId, IndexReader, TermDocEnum};
use crate::query::range::parse_number;
use crate::search::collector::Hit;

/// How a sort field compares documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    /// Relevance score, highest first.
    Score,
    /// Document number, lowest first.
    Doc,
    /// Raw term bytes.
    Byte,
    /// Terms parsed as integers.
    Integer,
    /// Terms parsed as floats.
    Float,
    /// Terms compared as strings.
    String,
    /// Integer, float or string, decided by the field's first term.
    Auto,
}

impl SortType {
    fn name(&self) -> &'static str {
        match self {
            SortType::Score => "score",
            SortType::Doc => "doc",
            SortType::Byte => "byte",
            SortType::Integer => "integer",
            SortType::Float => "float",
            SortType::String => "string",
            SortType::Auto => "auto",
        }
    }

    fn needs_field(&self) -> bool {
        !matches!(self, SortType::Score | SortType::Doc)
    }
}

impl FromStr for SortType {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(SortType::Score),
            "doc" | "doc_id" => Ok(SortType::Doc),
            "byte" => Ok(SortType::Byte),
            "integer" => Ok(SortType::Integer),
            "float" => Ok(SortType::Float),
            "string" => Ok(SortType::String),
            "auto" => Ok(SortType::Auto),
            _ => Err(QuarryError::invalid_argument(format!(
                ":{s} is an unknown sort-type. Please choose from [:integer, :float, :string, :auto, :score, :doc_id]"
            ))),
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One key of a [`Sort`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
    field: Option<String>,
    sort_type: SortType,
    reverse: bool,
}

impl SortField {
    /// Sort by score, highest first.
    pub const SCORE: SortField = SortField {
        field: None,
        sort_type: SortType::Score,
        reverse: false,
    };

    /// Sort by score, lowest first.
    pub const SCORE_REV: SortField = SortField {
        field: None,
        sort_type: SortType::Score,
        reverse: true,
    };

    /// Sort by document number, lowest first.
    pub const DOC: SortField = SortField {
        field: None,
        sort_type: SortType::Doc,
        reverse: false,
    };

    /// Sort by document number, highest first.
    pub const DOC_REV: SortField = SortField {
        field: None,
        sort_type: SortType::Doc,
        reverse: true,
    };

    /// Sort by the value of `field`.
    ///
    /// # Errors
    ///
    /// Fails if `field` is empty while `sort_type` needs a field.
    pub fn new(field: &str, sort_type: SortType, reverse: bool) -> Result<Self> {
        if !sort_type.needs_field() {
            return Ok(SortField {
                field: None,
                sort_type,
                reverse,
            });
        }
        if field.is_empty() {
            return Err(QuarryError::invalid_argument("must pass a valid field name"));
        }
        Ok(SortField {
            field: Some(field.to_string()),
            sort_type,
            reverse,
        })
    }

    /// The sorted field, `None` for score and document sorts.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// How values compare.
    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    /// Whether the order is reversed.
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Describe the sort field: `<SCORE>`, `<DOC>!`, `price:<integer>`, ...
    pub fn to_s(&self) -> String {
        let base = match (&self.field, self.sort_type) {
            (_, SortType::Score) => "<SCORE>".to_string(),
            (_, SortType::Doc) => "<DOC>".to_string(),
            (Some(field), sort_type) => format!("{field}:<{sort_type}>"),
            (None, sort_type) => format!("<{sort_type}>"),
        };
        if self.reverse { format!("{base}!") } else { base }
    }
}

/// An ordered list of sort fields. Ties left by every field fall back to
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    fields: Vec<SortField>,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            fields: vec![SortField::SCORE, SortField::DOC],
        }
    }
}

impl Sort {
    /// Create a sort over `fields`.
    pub fn new(fields: Vec<SortField>) -> Self {
        Sort { fields }
    }

    /// Sort by the values of one field.
    pub fn by_field(field: &str, sort_type: SortType, reverse: bool) -> Result<Self> {
        Ok(Sort::new(vec![SortField::new(field, sort_type, reverse)?]))
    }

    /// The sort fields.
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Describe the sort.
    pub fn to_s(&self) -> String {
        let fields: Vec<String> = self.fields.iter().map(SortField::to_s).collect();
        format!("Sort[{}]", fields.join(", "))
    }

    /// Bind the sort to `reader`, loading the field indexes it needs.
    pub fn comparator(&self, reader: &dyn IndexReader) -> Result<SortComparator> {
        let mut keys = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let index = match &field.field {
                Some(name) if field.sort_type.needs_field() => {
                    Some(FieldIndex::cached(reader, name, field.sort_type)?)
                }
                _ => None,
            };
            keys.push((field.clone(), index));
        }
        Ok(SortComparator { keys })
    }
}

/// Values of one field indexed by document, built from the term dictionary.
#[derive(Debug)]
pub struct FieldIndex {
    sort_type: SortType,
    values: FieldValues,
}

#[derive(Debug)]
enum FieldValues {
    /// Rank of the document's term in term order.
    Ordinals(Vec<Option<u32>>),
    Integers(Vec<Option<i64>>),
    Floats(Vec<Option<f64>>),
}

impl FieldIndex {
    /// Field index for `field` from the reader's cache, built on a miss.
    pub fn cached(reader: &dyn IndexReader, field: &str, sort_type: SortType) -> Result<Arc<FieldIndex>> {
        let key = FieldIndexKey {
            field: field.to_string(),
            sort_type,
        };
        reader.cache().field_index(key, || FieldIndex::build(reader, field, sort_type))
    }

    /// Read every term of `field` and record its value for each document.
    ///
    /// A document with several terms keeps the value of the last one in term
    /// order. Terms that do not parse as the sort type are ignored.
    pub fn build(reader: &dyn IndexReader, field: &str, sort_type: SortType) -> Result<FieldIndex> {
        let max_doc = reader.max_doc() as usize;
        let mut terms = reader.terms(field)?;
        let has_terms = reader.field_number(field).is_some() && terms.next()?;

        let sort_type = match sort_type {
            SortType::Auto if has_terms => {
                let first = terms.curr_term();
                if first.parse::<i64>().is_ok() {
                    SortType::Integer
                } else if parse_number(first).is_some() {
                    SortType::Float
                } else {
                    SortType::String
                }
            }
            SortType::Auto => SortType::String,
            other => other,
        };
        let mut values = match sort_type {
            SortType::Integer => FieldValues::Integers(vec![None; max_doc]),
            SortType::Float => FieldValues::Floats(vec![None; max_doc]),
            _ => FieldValues::Ordinals(vec![None; max_doc]),
        };
        if !has_terms {
            return Ok(FieldIndex { sort_type, values });
        }

        let mut ordinal = 0u32;
        loop {
            let term = terms.curr_term();
            let mut docs = reader.term_docs_for(field, term)?;
            match &mut values {
                FieldValues::Ordinals(slots) => fill(&mut *docs, slots, Some(ordinal))?,
                FieldValues::Integers(slots) => fill(&mut *docs, slots, term.parse::<i64>().ok())?,
                FieldValues::Floats(slots) => fill(&mut *docs, slots, parse_number(term))?,
            }
            ordinal += 1;
            if !terms.next()? {
                break;
            }
        }
        Ok(FieldIndex { sort_type, values })
    }

    /// The resolved sort type; never [`SortType::Auto`].
    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    /// Compare the values of two documents. Documents without a value sort first.
    pub fn compare(&self, a: DocId, b: DocId) -> Ordering {
        fn get<T: Copy>(values: &[Option<T>], doc: DocId) -> Option<T> {
            values.get(doc as usize).copied().flatten()
        }
        match &self.values {
            FieldValues::Ordinals(values) => get(values, a).cmp(&get(values, b)),
            FieldValues::Integers(values) => get(values, a).cmp(&get(values, b)),
            FieldValues::Floats(values) => match (get(values, a), get(values, b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            },
        }
    }
}

fn fill<T: Copy>(
    docs: &mut dyn TermDocEnum,
    slots: &mut [Option<T>],
    value: Option<T>,
) -> Result<()> {
    if value.is_none() {
        return Ok(());
    }
    while docs.next()? {
        if let Some(slot) = slots.get_mut(docs.doc_num() as usize) {
            *slot = value;
        }
    }
    Ok(())
}

/// A [`Sort`] bound to a reader.
#[derive(Debug, Clone)]
pub struct SortComparator {
    keys: Vec<(SortField, Option<Arc<FieldIndex>>)>,
}

impl SortComparator {
    /// `Less` when `a` ranks before `b`.
    pub fn compare(&self, a: &Hit, b: &Hit) -> Ordering {
        for (field, index) in &self.keys {
            let ordering = match (field.sort_type, index) {
                (SortType::Score, _) => b.score.total_cmp(&a.score),
                (SortType::Doc, _) => a.doc.cmp(&b.doc),
                (_, Some(index)) => index.compare(a.doc, b.doc),
                (_, None) => Ordering::Equal,
            };
            let ordering = if field.reverse { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.doc.cmp(&b.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::document::Document;
    use crate::index::memory::MemoryIndex;

    fn hit(doc: DocId, score: f32) -> Hit {
        Hit { doc, score }
    }

    fn priced(prices: &[&str]) -> MemoryIndex {
        let mut index = MemoryIndex::default();
        for price in prices {
            index.add_document(Document::builder().add_field("price", *price).build());
        }
        index
    }

    #[test]
    fn test_sort_type_from_str() {
        assert_eq!("Integer".parse::<SortType>().unwrap(), SortType::Integer);
        assert_eq!("doc_id".parse::<SortType>().unwrap(), SortType::Doc);
        assert!("colour".parse::<SortType>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_sort_field() {
        assert!(SortField::new("", SortType::Integer, false).is_err());
        assert_eq!(SortField::new("", SortType::Score, false).unwrap(), SortField::SCORE);
        assert_eq!(SortField::new("price", SortType::Float, true).unwrap().to_s(), "price:<float>!");
        assert_eq!(Sort::default().to_s(), "Sort[<SCORE>, <DOC>]");
        assert_eq!(SortField::DOC_REV.to_s(), "<DOC>!");
    }

    #[test]
    fn test_default_sort_orders_by_score_then_doc() {
        let index = priced(&["1"]);
        let comparator = Sort::default().comparator(&index.reader()).unwrap();
        assert_eq!(comparator.compare(&hit(3, 2.0), &hit(1, 1.0)), Ordering::Less);
        assert_eq!(comparator.compare(&hit(3, 1.0), &hit(1, 1.0)), Ordering::Greater);
    }

    #[test]
    fn test_integer_sort() {
        let reader = priced(&["20", "3", "100", "abc"]).reader();
        let sort = Sort::by_field("price", SortType::Integer, false).unwrap();
        let comparator = sort.comparator(&reader).unwrap();
        let mut hits = vec![hit(0, 1.0), hit(1, 1.0), hit(2, 1.0), hit(3, 1.0)];
        hits.sort_by(|a, b| comparator.compare(a, b));
        let docs: Vec<DocId> = hits.iter().map(|h| h.doc).collect();
        assert_eq!(docs, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_auto_detects_type_and_caches() {
        let reader = priced(&["2.5", "10", "-1"]).reader();
        let index = FieldIndex::cached(&reader, "price", SortType::Auto).unwrap();
        // "-1" sorts first and parses as an integer
        assert_eq!(index.sort_type(), SortType::Integer);
        let again = FieldIndex::cached(&reader, "price", SortType::Auto).unwrap();
        assert!(Arc::ptr_eq(&index, &again));
        assert_eq!(reader.cache().field_index_count(), 1);

        let floats = FieldIndex::cached(&reader, "price", SortType::Float).unwrap();
        assert_eq!(floats.compare(0, 1), Ordering::Less);
        assert_eq!(floats.compare(2, 0), Ordering::Less);
    }

    #[test]
    fn test_string_sort_reversed() {
        let reader = priced(&["pear", "apple", "fig"]).reader();
        let sort = Sort::by_field("price", SortType::String, true).unwrap();
        let comparator = sort.comparator(&reader).unwrap();
        let mut hits = vec![hit(0, 1.0), hit(1, 1.0), hit(2, 1.0)];
        hits.sort_by(|a, b| comparator.compare(a, b));
        let docs: Vec<DocId> = hits.iter().map(|h| h.doc).collect();
        assert_eq!(docs, vec![0, 2, 1]);
    }
}
