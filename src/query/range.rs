//! Range queries and filters over the term dictionary.
//!
//! [`RangeQuery`] compares terms lexicographically. [`TypedRangeQuery`]
//! compares terms as numbers when both of its bounds are numeric and falls
//! back to lexicographic order otherwise. Both rewrite into a
//! [`ConstantScoreQuery`] over the matching range filter.

use std::any::Any;
use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::index::term_vector::TermVector;
use crate::query::constant_score::ConstantScoreQuery;
use crate::query::query::{Query, QueryKind, boost_suffix, downcast_eq, field_prefix, hash_of};
use crate::query::weight::Weight;
use crate::search::filter::{Filter, downcast_filter_eq};
use crate::search::highlight::MatchVector;
use crate::search::searcher::Searcher;
use crate::util::bit_vector::BitVector;

/// Smallest term a typed scan starts from: `+` and `-` sort before digits.
const NUMERIC_SCAN_START: &str = "+.";

/// Parse `text` as a number. The whole string must be consumed.
///
/// Accepts an optional sign followed by a decimal (`1`, `.5`, `2.5e3`) or a
/// hexadecimal integer (`0x1f`).
pub fn parse_number(text: &str) -> Option<f64> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let value = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()? as f64
    } else {
        match unsigned.as_bytes().first()? {
            b'0'..=b'9' | b'.' => unsigned.parse::<f64>().ok()?,
            _ => return None,
        }
    };
    Some(if negative { -value } else { value })
}

/// Bounds of a range over one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    field: String,
    lower: Option<String>,
    upper: Option<String>,
    include_lower: bool,
    include_upper: bool,
}

impl Range {
    /// Create a lexicographic range.
    pub fn new(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        let range = Self::unchecked(field, lower, upper, include_lower, include_upper)?;
        if let (Some(lower), Some(upper)) = (&range.lower, &range.upper) {
            if upper < lower {
                return Err(inverted_error(lower, upper));
            }
        }
        Ok(range)
    }

    /// Create a range whose bounds are compared numerically when both parse.
    pub fn typed(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        let range = Self::unchecked(field, lower, upper, include_lower, include_upper)?;
        if let (Some(lower), Some(upper)) = (&range.lower, &range.upper) {
            let ordering = match (parse_number(lower), parse_number(upper)) {
                (Some(l), Some(u)) => u.partial_cmp(&l).unwrap_or(Ordering::Equal),
                _ => upper.as_str().cmp(lower.as_str()),
            };
            if ordering == Ordering::Less {
                return Err(inverted_error(lower, upper));
            }
        }
        Ok(range)
    }

    fn unchecked(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        if lower.is_none() && upper.is_none() {
            return Err(QuarryError::invalid_argument(
                "Nil bounds for range. A range must include either lower bound or an upper bound",
            ));
        }
        if include_lower && lower.is_none() {
            return Err(QuarryError::invalid_argument(
                "Lower bound must be non-nil to be inclusive. That is, if you specify :include_lower => true when you create a range you must include a :lower_term",
            ));
        }
        if include_upper && upper.is_none() {
            return Err(QuarryError::invalid_argument(
                "Upper bound must be non-nil to be inclusive. That is, if you specify :include_upper => true when you create a range you must include a :upper_term",
            ));
        }
        Ok(Range {
            field: field.to_string(),
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
            include_lower,
            include_upper,
        })
    }

    /// The field the range applies to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The lower bound, if any.
    pub fn lower(&self) -> Option<&str> {
        self.lower.as_deref()
    }

    /// The upper bound, if any.
    pub fn upper(&self) -> Option<&str> {
        self.upper.as_deref()
    }

    /// Whether the lower bound is inclusive.
    pub fn include_lower(&self) -> bool {
        self.include_lower
    }

    /// Whether the upper bound is inclusive.
    pub fn include_upper(&self) -> bool {
        self.include_upper
    }

    fn to_s(&self, default_field: &str) -> String {
        let mut out = field_prefix(&self.field, default_field);
        match &self.lower {
            Some(lower) => {
                out.push(if self.include_lower { '[' } else { '{' });
                out.push_str(lower);
            }
            None => out.push('<'),
        }
        out.push(' ');
        match &self.upper {
            Some(upper) => {
                out.push_str(upper);
                out.push(if self.include_upper { ']' } else { '}' });
            }
            None => out.push('>'),
        }
        out
    }

    /// Whether `term` lies inside the range, comparing lexicographically.
    pub fn contains_term(&self, term: &str) -> bool {
        let above = match &self.lower {
            Some(lower) if self.include_lower => term >= lower.as_str(),
            Some(lower) => term > lower.as_str(),
            None => true,
        };
        let below = match &self.upper {
            Some(upper) if self.include_upper => term <= upper.as_str(),
            Some(upper) => term < upper.as_str(),
            None => true,
        };
        above && below
    }

    /// Whether `term` lies inside the range, comparing numerically when every
    /// present bound is a number.
    pub fn contains_typed(&self, term: &str) -> bool {
        let lower = numeric_bound(&self.lower, self.include_lower);
        let upper = numeric_bound(&self.upper, self.include_upper);
        match (lower, upper) {
            (Some(lower), Some(upper)) => parse_number(term).is_some_and(|n| (lower, upper).contains(&n)),
            _ => self.contains_term(term),
        }
    }

    /// Record every position of `tv` holding a term inside the range.
    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector, typed: bool) {
        if tv.field() != self.field {
            return;
        }
        let terms = if typed {
            tv.terms()
        } else {
            &tv.terms()[tv.scan_to_term_index(self.lower.as_deref().unwrap_or(""))..]
        };
        for term in terms {
            let inside = if typed {
                self.contains_typed(&term.text)
            } else {
                self.contains_term(&term.text)
            };
            if inside {
                for &position in &term.positions {
                    matches.add(position, position);
                }
            }
        }
    }

    fn range_hash(&self) -> u64 {
        let bounds = hash_of(&self.field) ^ hash_of(&self.lower) ^ hash_of(&self.upper);
        (self.include_lower as u64) | ((self.include_upper as u64) << 1) | (bounds << 2)
    }

    /// Documents holding a term inside the range, in term order.
    fn lexicographic_bits(&self, reader: &dyn IndexReader) -> Result<BitVector> {
        let mut bits = BitVector::with_capacity(reader.max_doc() as usize);
        if reader.field_number(&self.field).is_none() {
            return Ok(bits);
        }
        let lower = self.lower.as_deref().unwrap_or("");
        let mut terms = reader.terms(&self.field)?;
        if !terms.skip_to(lower)? {
            return Ok(bits);
        }
        let mut check_lower = !(self.include_lower || lower.is_empty());
        loop {
            let term = terms.curr_term();
            if !check_lower || term > lower {
                check_lower = false;
                if let Some(upper) = &self.upper {
                    let ordering = upper.as_str().cmp(term);
                    if ordering != Ordering::Greater && (!self.include_upper || ordering == Ordering::Less) {
                        break;
                    }
                }
                set_term_docs(reader, &self.field, term, &mut bits)?;
            }
            if !terms.next()? {
                break;
            }
        }
        Ok(bits)
    }

    /// Documents holding a numeric term inside the range. Falls back to the
    /// lexicographic scan unless every present bound is a number.
    fn typed_bits(&self, reader: &dyn IndexReader) -> Result<BitVector> {
        let lower = numeric_bound(&self.lower, self.include_lower);
        let upper = numeric_bound(&self.upper, self.include_upper);
        let (Some(lower), Some(upper)) = (lower, upper) else {
            return self.lexicographic_bits(reader);
        };
        let bounds = (lower, upper);

        let mut bits = BitVector::with_capacity(reader.max_doc() as usize);
        if reader.field_number(&self.field).is_none() {
            return Ok(bits);
        }
        let mut terms = reader.terms(&self.field)?;
        if !terms.skip_to(NUMERIC_SCAN_START)? {
            return Ok(bits);
        }
        loop {
            let term = terms.curr_term();
            if term.as_bytes().first().is_none_or(|&b| b > b'9') {
                break;
            }
            if let Some(number) = parse_number(term) {
                if bounds.contains(&number) {
                    set_term_docs(reader, &self.field, term, &mut bits)?;
                }
            }
            if !terms.next()? {
                break;
            }
        }
        Ok(bits)
    }
}

fn inverted_error(lower: &str, upper: &str) -> QuarryError {
    QuarryError::invalid_argument(format!(
        "Upper bound must be greater than lower bound. \"{upper}\" < \"{lower}\""
    ))
}

/// A present bound must parse; an absent bound is unbounded. `None` if a
/// present bound is not numeric.
fn numeric_bound(bound: &Option<String>, inclusive: bool) -> Option<Bound<f64>> {
    match bound {
        None => Some(Bound::Unbounded),
        Some(text) => {
            let value = parse_number(text)?;
            Some(if inclusive {
                Bound::Included(value)
            } else {
                Bound::Excluded(value)
            })
        }
    }
}

fn set_term_docs(reader: &dyn IndexReader, field: &str, term: &str, bits: &mut BitVector) -> Result<()> {
    let mut docs = reader.term_docs_for(field, term)?;
    while docs.next()? {
        bits.set(docs.doc_num() as usize);
    }
    Ok(())
}

/// Allows documents with a term in a lexicographic range.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    range: Range,
}

impl RangeFilter {
    /// Create a filter; see [`Range::new`] for the validation rules.
    pub fn new(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Ok(RangeFilter {
            range: Range::new(field, lower, upper, include_lower, include_upper)?,
        })
    }

    /// The filter's bounds.
    pub fn range(&self) -> &Range {
        &self.range
    }
}

impl Filter for RangeFilter {
    fn name(&self) -> &'static str {
        "RangeFilter"
    }

    fn compute_bitvector(&self, reader: &dyn IndexReader) -> Result<BitVector> {
        self.range.lexicographic_bits(reader)
    }

    fn filter_hash(&self) -> u64 {
        self.range.range_hash()
    }

    fn filter_eq(&self, other: &dyn Filter) -> bool {
        downcast_filter_eq(other, |other: &RangeFilter| self.range == other.range)
    }

    fn to_s(&self) -> String {
        format!("RangeFilter< {} >", self.range.to_s(""))
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        self.range.match_vector(matches, tv, false);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Allows documents with a term in a numeric range.
#[derive(Debug, Clone)]
pub struct TypedRangeFilter {
    range: Range,
}

impl TypedRangeFilter {
    /// Create a filter; see [`Range::typed`] for the validation rules.
    pub fn new(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Ok(TypedRangeFilter {
            range: Range::typed(field, lower, upper, include_lower, include_upper)?,
        })
    }

    /// The filter's bounds.
    pub fn range(&self) -> &Range {
        &self.range
    }
}

impl Filter for TypedRangeFilter {
    fn name(&self) -> &'static str {
        "TypedRangeFilter"
    }

    fn compute_bitvector(&self, reader: &dyn IndexReader) -> Result<BitVector> {
        self.range.typed_bits(reader)
    }

    fn filter_hash(&self) -> u64 {
        self.range.range_hash()
    }

    fn filter_eq(&self, other: &dyn Filter) -> bool {
        downcast_filter_eq(other, |other: &TypedRangeFilter| self.range == other.range)
    }

    fn to_s(&self) -> String {
        format!("TypedRangeFilter< {} >", self.range.to_s(""))
    }

    fn match_vector(&self, matches: &mut MatchVector, tv: &TermVector) {
        self.range.match_vector(matches, tv, true);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents with a term in a lexicographic range, all scoring alike.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    range: Range,
    boost: f32,
}

impl RangeQuery {
    /// Create a range query.
    ///
    /// # Errors
    ///
    /// Fails when both bounds are missing, when an inclusive flag is set
    /// without its bound, or when `upper < lower`.
    pub fn new(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Ok(RangeQuery {
            range: Range::new(field, lower, upper, include_lower, include_upper)?,
            boost: 1.0,
        })
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The query's bounds.
    pub fn range(&self) -> &Range {
        &self.range
    }
}

impl Query for RangeQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Range
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, _reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        let filter = RangeFilter {
            range: self.range.clone(),
        };
        let query = ConstantScoreQuery::new(Arc::new(filter)).with_boost(self.boost);
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Err(QuarryError::unsupported("RangeQuery must be rewritten before searching"))
    }

    fn to_s(&self, default_field: &str) -> String {
        format!("{}{}", self.range.to_s(default_field), boost_suffix(self.boost))
    }

    fn query_hash(&self) -> u64 {
        self.range.range_hash()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &RangeQuery| self.range == other.range)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents with a term in a numeric range, all scoring alike.
#[derive(Debug, Clone)]
pub struct TypedRangeQuery {
    range: Range,
    boost: f32,
}

impl TypedRangeQuery {
    /// Create a typed range query.
    ///
    /// # Errors
    ///
    /// As [`RangeQuery::new`], except that the bounds are compared as numbers
    /// when both parse.
    pub fn new(
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Ok(TypedRangeQuery {
            range: Range::typed(field, lower, upper, include_lower, include_upper)?,
            boost: 1.0,
        })
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The query's bounds.
    pub fn range(&self) -> &Range {
        &self.range
    }
}

impl Query for TypedRangeQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::TypedRange
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&self, _reader: &dyn IndexReader) -> Result<Option<Arc<dyn Query>>> {
        let filter = TypedRangeFilter {
            range: self.range.clone(),
        };
        let query = ConstantScoreQuery::new(Arc::new(filter)).with_boost(self.boost);
        Ok(Some(Arc::new(query)))
    }

    fn create_weight(&self, _searcher: &Searcher<'_>) -> Result<Box<dyn Weight>> {
        Err(QuarryError::unsupported("TypedRangeQuery must be rewritten before searching"))
    }

    fn to_s(&self, default_field: &str) -> String {
        format!("{}{}", self.range.to_s(default_field), boost_suffix(self.boost))
    }

    fn query_hash(&self) -> u64 {
        self.range.range_hash()
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        downcast_eq(other, |other: &TypedRangeQuery| self.range == other.range)
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
    use crate::search::filter::FilterExt;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number("-5"), Some(-5.0));
        assert_eq!(parse_number("+.5"), Some(0.5));
        assert_eq!(parse_number("2.5e3"), Some(2500.0));
        assert_eq!(parse_number("0x1f"), Some(31.0));
        assert_eq!(parse_number("-0x10"), Some(-16.0));
        assert_eq!(parse_number("10abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn test_validation() {
        let err = RangeQuery::new("f", None, None, false, false).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("Nil bounds for range"));
        assert!(RangeQuery::new("f", None, Some("b"), true, false).is_err());
        assert!(RangeQuery::new("f", Some("a"), None, false, true).is_err());
        assert!(RangeQuery::new("f", Some("b"), Some("a"), false, false).is_err());
        assert!(RangeQuery::new("f", Some("a"), Some("a"), true, true).is_ok());

        // "10" < "9" as strings but not as numbers
        assert!(RangeQuery::new("f", Some("9"), Some("10"), false, false).is_err());
        assert!(TypedRangeQuery::new("f", Some("9"), Some("10"), false, false).is_ok());
        assert!(TypedRangeQuery::new("f", Some("10"), Some("-5"), false, false).is_err());
    }

    #[test]
    fn test_to_s() {
        let query = RangeQuery::new("date", Some("20050101"), Some("20051231"), true, false).unwrap();
        assert_eq!(query.to_s("date"), "[20050101 20051231}");
        assert_eq!(query.to_s("body"), "date:[20050101 20051231}");
        let query = RangeQuery::new("date", None, Some("2005"), false, true).unwrap().with_boost(2.0);
        assert_eq!(query.to_s("date"), "< 2005]^2.0");
        let query = RangeQuery::new("date", Some("2005"), None, false, false).unwrap();
        assert_eq!(query.to_s("date"), "{2005 >");

        let filter = RangeFilter::new("date", Some("a"), Some("b"), true, true).unwrap();
        assert_eq!(filter.to_s(), "RangeFilter< date:[a b] >");
    }

    #[test]
    fn test_lexicographic_scan() {
        let reader = index_of(&["100", "101", "102", "103", "104", "105", "106"]).reader();
        let scan = |lower, upper, il, iu| {
            Range::new("body", lower, upper, il, iu)
                .unwrap()
                .lexicographic_bits(&reader)
                .unwrap()
                .to_vec()
        };
        assert_eq!(scan(Some("101"), Some("104"), true, false), vec![1, 2, 3]);
        assert_eq!(scan(Some("101"), Some("104"), false, true), vec![2, 3, 4]);
        assert_eq!(scan(None, Some("102"), false, true), vec![0, 1, 2]);
        assert_eq!(scan(Some("105"), None, false, false), vec![6]);
        assert_eq!(scan(Some("2"), None, true, false), Vec::<usize>::new());
        assert_eq!(scan(Some("a"), Some("b"), true, true), Vec::<usize>::new());
    }

    #[test]
    fn test_typed_scan() {
        let reader = index_of(&["-10", "-5", "0", "9", "10", "20", "abc"]).reader();
        let query = TypedRangeQuery::new("body", Some("-5"), Some("10"), true, false).unwrap();
        let bits = query.range().typed_bits(&reader).unwrap();
        assert_eq!(bits.to_vec(), vec![1, 2, 3]);

        let bits = Range::typed("body", None, Some("0"), false, true)
            .unwrap()
            .typed_bits(&reader)
            .unwrap();
        assert_eq!(bits.to_vec(), vec![0, 1, 2]);

        // non-numeric bound falls back to term order
        let bits = Range::typed("body", Some("a"), None, true, false)
            .unwrap()
            .typed_bits(&reader)
            .unwrap();
        assert_eq!(bits.to_vec(), vec![6]);
    }

    #[test]
    fn test_contains_term() {
        let range = Range::new("f", Some("b"), Some("d"), false, true).unwrap();
        assert!(!range.contains_term("b"));
        assert!(range.contains_term("c"));
        assert!(range.contains_term("d"));
        assert!(!range.contains_term("da"));

        let typed = Range::typed("f", Some("5"), Some("20"), true, false).unwrap();
        assert!(typed.contains_typed("5"));
        assert!(typed.contains_typed("10"));
        assert!(!typed.contains_typed("20"));
        assert!(!typed.contains_typed("abc"));
        let open = Range::typed("f", None, Some("m"), false, false).unwrap();
        assert!(open.contains_typed("apple"));
    }

    #[test]
    fn test_rewrite_to_constant_score() {
        let reader = index_of(&["a"]).reader();
        let query = RangeQuery::new("body", Some("a"), Some("z"), true, true).unwrap().with_boost(3.0);
        let rewritten = query.rewrite(&reader).unwrap().unwrap();
        assert_eq!(rewritten.kind(), QueryKind::ConstantScore);
        assert_eq!(rewritten.boost(), 3.0);
        assert_eq!(rewritten.to_s(""), "ConstantScore(RangeFilter< body:[a z] >)^3.0");
    }

    #[test]
    fn test_equal_filters_share_cache_slot() {
        let reader = index_of(&["a", "b"]).reader();
        let a: Arc<dyn Filter> = Arc::new(RangeFilter::new("body", Some("a"), Some("b"), true, true).unwrap());
        let b: Arc<dyn Filter> = Arc::new(RangeFilter::new("body", Some("a"), Some("b"), true, true).unwrap());
        let typed: Arc<dyn Filter> =
            Arc::new(TypedRangeFilter::new("body", Some("a"), Some("b"), true, true).unwrap());
        assert!(Arc::ptr_eq(&a.get_bitvector(&reader).unwrap(), &b.get_bitvector(&reader).unwrap()));
        assert!(*a != *typed);
        typed.get_bitvector(&reader).unwrap();
        assert_eq!(reader.cache().filter_count(), 2);
    }
}
