//! In-memory index.
//!
//! [`MemoryIndex`] is the writable side: documents are analyzed and their
//! postings appended as they are added. [`MemoryIndex::reader`] takes an
//! immutable [`MemoryIndexReader`] snapshot implementing [`IndexReader`].
//! Posting lists are shared between the writer and its snapshots and copied
//! on write.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bit_vec::BitVec;
use log::warn;

use crate::error::{QuarryError, Result};
use crate::index::analysis::{Analyzer, WhitespaceAnalyzer};
use crate::index::cache::ReaderCache;
use crate::index::document::Document;
use crate::index::reader::{DocId, IndexReader, ReaderId, TermDocEnum, TermEnum};
use crate::index::term_vector::TermVector;
use crate::search::similarity::{DefaultSimilarity, Similarity};

/// One document's occurrences of a term.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    /// Document containing the term.
    pub doc: DocId,
    /// Positions of the term within the field, ascending.
    pub positions: Vec<u32>,
}

type PostingList = Arc<Vec<Posting>>;

#[derive(Debug, Clone, Default)]
struct FieldData {
    number: u32,
    terms: BTreeMap<String, PostingList>,
    norms: Vec<u8>,
}

/// Writable in-memory index.
#[derive(Debug)]
pub struct MemoryIndex {
    analyzer: Arc<dyn Analyzer>,
    similarity: Arc<dyn Similarity>,
    fields: BTreeMap<String, FieldData>,
    docs: Vec<Document>,
    deleted: BitVec,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(Arc::new(WhitespaceAnalyzer::new()))
    }
}

impl MemoryIndex {
    /// Create an empty index analyzing text with `analyzer`.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        MemoryIndex {
            analyzer,
            similarity: Arc::new(DefaultSimilarity),
            fields: BTreeMap::new(),
            docs: Vec::new(),
            deleted: BitVec::new(),
        }
    }

    /// Use `similarity` to compute norms for documents added from now on.
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// One greater than the largest document id.
    pub fn max_doc(&self) -> u64 {
        self.docs.len() as u64
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.max_doc() - self.deleted.iter().filter(|&d| d).count() as u64
    }

    /// Whether `doc` is deleted.
    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted.get(doc as usize).unwrap_or(false)
    }

    /// Analyze and index `doc`, returning its id.
    pub fn add_document(&mut self, doc: Document) -> DocId {
        let doc_id = self.docs.len() as DocId;

        for (name, values) in doc.fields() {
            let next_number = self.fields.len() as u32;
            let field = self.fields.entry(name.to_string()).or_insert_with(|| FieldData {
                number: next_number,
                ..FieldData::default()
            });

            let mut occurrences: BTreeMap<String, Vec<u32>> = BTreeMap::new();
            let mut position = 0u32;
            for value in values {
                for term in self.analyzer.analyze(name, value) {
                    occurrences.entry(term).or_default().push(position);
                    position += 1;
                }
            }

            for (term, positions) in occurrences {
                let list = field.terms.entry(term).or_default();
                Arc::make_mut(list).push(Posting {
                    doc: doc_id,
                    positions,
                });
            }

            let norm = self.similarity.length_norm(name, position.max(1));
            field.norms.resize(doc_id as usize, 0);
            field.norms.push(self.similarity.encode_norm(norm));
        }

        self.docs.push(doc);
        self.deleted.push(false);
        doc_id
    }

    /// Mark `doc` deleted.
    pub fn delete(&mut self, doc: DocId) -> Result<()> {
        if doc >= self.max_doc() {
            return Err(QuarryError::invalid_argument(format!(
                "document {doc} does not exist (max_doc = {})",
                self.max_doc()
            )));
        }
        self.deleted.set(doc as usize, true);
        Ok(())
    }

    /// Delete every live document containing `term` in `field`. Returns the number deleted.
    pub fn delete_by_term(&mut self, field: &str, term: &str) -> usize {
        let docs: Vec<DocId> = match self.fields.get(field).and_then(|f| f.terms.get(term)) {
            Some(list) => list.iter().map(|p| p.doc).collect(),
            None => return 0,
        };
        let mut count = 0;
        for doc in docs {
            if !self.deleted.get(doc as usize).unwrap_or(true) {
                self.deleted.set(doc as usize, true);
                count += 1;
            }
        }
        count
    }

    /// Stored fields of `doc`.
    pub fn document(&self, doc: DocId) -> Option<&Document> {
        self.docs.get(doc as usize)
    }

    /// Take an immutable snapshot of the current state.
    pub fn reader(&self) -> MemoryIndexReader {
        let max_doc = self.docs.len();
        let fields = self
            .fields
            .iter()
            .map(|(name, data)| {
                let mut norms = data.norms.clone();
                norms.resize(max_doc, 0);
                let snapshot = FieldSnapshot {
                    number: data.number,
                    terms: data.terms.clone(),
                    norms: Arc::from(norms),
                };
                (name.clone(), Arc::new(snapshot))
            })
            .collect();

        MemoryIndexReader {
            id: ReaderId::next(),
            analyzer: Arc::clone(&self.analyzer),
            fields: Arc::new(fields),
            docs: Arc::new(self.docs.clone()),
            deleted: Arc::new(self.deleted.clone()),
            cache: ReaderCache::new(),
            closed: AtomicBool::new(false),
        }
    }
}

#[derive(Debug)]
struct FieldSnapshot {
    number: u32,
    terms: BTreeMap<String, PostingList>,
    norms: Arc<[u8]>,
}

/// Immutable snapshot of a [`MemoryIndex`].
#[derive(Debug)]
pub struct MemoryIndexReader {
    id: ReaderId,
    analyzer: Arc<dyn Analyzer>,
    fields: Arc<BTreeMap<String, Arc<FieldSnapshot>>>,
    docs: Arc<Vec<Document>>,
    deleted: Arc<BitVec>,
    cache: ReaderCache,
    closed: AtomicBool,
}

impl MemoryIndexReader {
    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            warn!("access to closed reader {}", self.id.value());
            return Err(QuarryError::index("reader is closed"));
        }
        Ok(())
    }

    fn postings(&self, field: &str, term: &str) -> Option<PostingList> {
        self.fields
            .get(field)
            .and_then(|f| f.terms.get(term))
            .cloned()
    }

    fn term_docs(&self, field: &str, term: &str, positions: bool) -> Result<Box<dyn TermDocEnum>> {
        self.check_open()?;
        Ok(Box::new(MemoryTermDocEnum {
            postings: self.postings(field, term).unwrap_or_default(),
            deleted: Arc::clone(&self.deleted),
            index: None,
            position_index: 0,
            with_positions: positions,
        }))
    }
}

impl IndexReader for MemoryIndexReader {
    fn id(&self) -> ReaderId {
        self.id
    }

    fn max_doc(&self) -> u64 {
        self.docs.len() as u64
    }

    fn num_docs(&self) -> u64 {
        self.max_doc() - self.deleted.iter().filter(|&d| d).count() as u64
    }

    fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted.get(doc as usize).unwrap_or(false)
    }

    fn field_number(&self, field: &str) -> Option<u32> {
        self.fields.get(field).map(|f| f.number)
    }

    fn term_docs_for(&self, field: &str, term: &str) -> Result<Box<dyn TermDocEnum>> {
        self.term_docs(field, term, false)
    }

    fn term_positions_for(&self, field: &str, term: &str) -> Result<Box<dyn TermDocEnum>> {
        self.term_docs(field, term, true)
    }

    fn terms(&self, field: &str) -> Result<Box<dyn TermEnum>> {
        self.check_open()?;
        Ok(Box::new(MemoryTermEnum {
            field: self.fields.get(field).cloned(),
            current: None,
            doc_freq: 0,
            exhausted: false,
        }))
    }

    fn doc_freq(&self, field: &str, term: &str) -> Result<u64> {
        self.check_open()?;
        Ok(self.postings(field, term).map_or(0, |list| list.len() as u64))
    }

    fn norms(&self, field: &str) -> Result<Option<Arc<[u8]>>> {
        self.check_open()?;
        Ok(self.fields.get(field).map(|f| Arc::clone(&f.norms)))
    }

    fn document(&self, doc: DocId) -> Result<Document> {
        self.check_open()?;
        self.docs
            .get(doc as usize)
            .cloned()
            .ok_or_else(|| QuarryError::not_found(format!("document {doc}")))
    }

    fn term_vector(&self, doc: DocId, field: &str) -> Result<Option<TermVector>> {
        self.check_open()?;
        let document = self
            .docs
            .get(doc as usize)
            .ok_or_else(|| QuarryError::not_found(format!("document {doc}")))?;
        if !document.has_field(field) {
            return Ok(None);
        }
        let values = document.values(field);
        Ok(Some(TermVector::from_values(field, values, self.analyzer.as_ref())))
    }

    fn cache(&self) -> &ReaderCache {
        &self.cache
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.cache.clear();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct MemoryTermDocEnum {
    postings: PostingList,
    deleted: Arc<BitVec>,
    index: Option<usize>,
    position_index: usize,
    with_positions: bool,
}

impl MemoryTermDocEnum {
    fn current(&self) -> Option<&Posting> {
        self.index.and_then(|i| self.postings.get(i))
    }
}

impl TermDocEnum for MemoryTermDocEnum {
    fn doc_num(&self) -> DocId {
        self.current().map_or(DocId::MAX, |p| p.doc)
    }

    fn freq(&self) -> u32 {
        self.current().map_or(0, |p| p.positions.len() as u32)
    }

    fn next(&mut self) -> Result<bool> {
        let mut i = self.index.map_or(0, |i| i + 1);
        while i < self.postings.len() && self.deleted.get(self.postings[i].doc as usize).unwrap_or(false) {
            i += 1;
        }
        self.index = Some(i.min(self.postings.len()));
        self.position_index = 0;
        Ok(i < self.postings.len())
    }

    fn next_position(&mut self) -> Result<Option<u32>> {
        if !self.with_positions {
            return Err(QuarryError::unsupported(
                "positions were not requested for this term enumerator",
            ));
        }
        let position = self
            .current()
            .and_then(|p| p.positions.get(self.position_index))
            .copied();
        if position.is_some() {
            self.position_index += 1;
        }
        Ok(position)
    }
}

#[derive(Debug)]
struct MemoryTermEnum {
    field: Option<Arc<FieldSnapshot>>,
    current: Option<String>,
    doc_freq: u64,
    exhausted: bool,
}

impl MemoryTermEnum {
    fn position_on(&mut self, lower: Bound<&str>) -> bool {
        let found = self.field.as_ref().and_then(|field| {
            field
                .terms
                .range::<str, _>((lower, Bound::Unbounded))
                .next()
                .map(|(term, list)| (term.clone(), list.len() as u64))
        });
        match found {
            Some((term, doc_freq)) => {
                self.current = Some(term);
                self.doc_freq = doc_freq;
                true
            }
            None => {
                self.current = None;
                self.doc_freq = 0;
                self.exhausted = true;
                false
            }
        }
    }
}

impl TermEnum for MemoryTermEnum {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let current = self.current.take();
        let found = match current.as_deref() {
            Some(term) => self.position_on(Bound::Excluded(term)),
            None => self.position_on(Bound::Unbounded),
        };
        Ok(found)
    }

    fn skip_to(&mut self, target: &str) -> Result<bool> {
        self.exhausted = false;
        Ok(self.position_on(Bound::Included(target)))
    }

    fn curr_term(&self) -> &str {
        self.current.as_deref().unwrap_or("")
    }

    fn curr_doc_freq(&self) -> u64 {
        self.doc_freq
    }
}

/// Index one document per text in the `body` field.
#[cfg(test)]
pub(crate) fn index_of(texts: &[&str]) -> MemoryIndex {
    let mut index = MemoryIndex::default();
    for text in texts {
        index.add_document(Document::builder().add_field("body", *text).build());
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_docs_and_positions() {
        let index = index_of(&["a b a", "b c", "a"]);
        let reader = index.reader();
        assert_eq!(reader.max_doc(), 3);
        assert_eq!(reader.doc_freq("body", "a").unwrap(), 2);

        let mut docs = reader.term_positions_for("body", "a").unwrap();
        assert!(docs.next().unwrap());
        assert_eq!(docs.doc_num(), 0);
        assert_eq!(docs.freq(), 2);
        assert_eq!(docs.next_position().unwrap(), Some(0));
        assert_eq!(docs.next_position().unwrap(), Some(2));
        assert_eq!(docs.next_position().unwrap(), None);
        assert!(docs.next().unwrap());
        assert_eq!(docs.doc_num(), 2);
        assert!(!docs.next().unwrap());
    }

    #[test]
    fn test_positions_require_position_enum() {
        let reader = index_of(&["a"]).reader();
        let mut docs = reader.term_docs_for("body", "a").unwrap();
        assert!(docs.next().unwrap());
        let err = docs.next_position().unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_skip_to_and_deletions() {
        let mut index = index_of(&["x", "x", "x", "x", "y"]);
        index.delete(2).unwrap();
        let reader = index.reader();
        assert!(reader.has_deletions());
        assert_eq!(reader.num_docs(), 4);

        let mut docs = reader.term_docs_for("body", "x").unwrap();
        assert!(docs.skip_to(2).unwrap());
        assert_eq!(docs.doc_num(), 3);
        assert!(!docs.skip_to(4).unwrap());
    }

    #[test]
    fn test_term_enum() {
        let reader = index_of(&["banana apple", "cherry apple"]).reader();
        let mut terms = reader.terms("body").unwrap();
        assert!(terms.next().unwrap());
        assert_eq!(terms.curr_term(), "apple");
        assert_eq!(terms.curr_doc_freq(), 2);
        assert!(terms.next().unwrap());
        assert_eq!(terms.curr_term(), "banana");

        assert!(terms.skip_to("bz").unwrap());
        assert_eq!(terms.curr_term(), "cherry");
        assert!(!terms.next().unwrap());
        assert!(!terms.skip_to("zzz").unwrap());

        let mut missing = reader.terms("nope").unwrap();
        assert!(!missing.next().unwrap());
    }

    #[test]
    fn test_norms() {
        let reader = index_of(&["a b c d", "a"]).reader();
        let norms = reader.norms("body").unwrap().unwrap();
        let sim = DefaultSimilarity;
        assert_eq!(norms.len(), 2);
        assert!((sim.decode_norm(norms[0]) - 0.5).abs() < 1e-6);
        assert!((sim.decode_norm(norms[1]) - 1.0).abs() < 1e-6);
        assert!(reader.norms("missing").unwrap().is_none());
    }

    #[test]
    fn test_snapshot_isolation_and_close() {
        let mut index = index_of(&["a"]);
        let reader = index.reader();
        index.add_document(Document::builder().add_field("body", "a").build());
        assert_eq!(reader.doc_freq("body", "a").unwrap(), 1);
        assert_eq!(index.reader().doc_freq("body", "a").unwrap(), 2);

        reader.close().unwrap();
        assert!(reader.is_closed());
        assert!(reader.terms("body").is_err());
    }

    #[test]
    fn test_delete_by_term() {
        let mut index = index_of(&["k1 v", "k2 v", "k1 w"]);
        assert_eq!(index.delete_by_term("body", "k1"), 2);
        assert_eq!(index.delete_by_term("body", "k1"), 0);
        assert_eq!(index.num_docs(), 1);
        assert!(index.delete(10).is_err());
    }

    #[test]
    fn test_term_vector_matches_postings() {
        let reader = index_of(&["b a b", "c"]).reader();
        let tv = reader.term_vector(0, "body").unwrap().unwrap();
        assert_eq!(tv.term("b").map(|t| t.positions.clone()), Some(vec![0, 2]));
        let offset = tv.offset(1).unwrap();
        assert_eq!((offset.start, offset.end), (2, 3));

        assert!(reader.term_vector(1, "title").unwrap().is_none());
        assert!(reader.term_vector(9, "body").is_err());
    }
}
