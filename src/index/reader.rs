//! Reader interfaces consumed by the query layer.
//!
//! The query core never touches storage directly. Everything it needs from an
//! index (posting lists, the term dictionary, norms, deletions) arrives through
//! [`IndexReader`], [`TermDocEnum`] and [`TermEnum`].

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{QuarryError, Result};
use crate::index::cache::ReaderCache;
use crate::index::document::Document;
use crate::index::term_vector::TermVector;

/// Document identifier within a reader.
pub type DocId = u64;

static NEXT_READER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an open reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderId(u64);

impl ReaderId {
    /// Allocate a fresh identity.
    pub fn next() -> Self {
        ReaderId(NEXT_READER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Cursor over the postings of one term.
///
/// A fresh enumerator is positioned before its first entry. Deleted documents
/// are never returned.
pub trait TermDocEnum: Send + Debug {
    /// Current document.
    fn doc_num(&self) -> DocId;

    /// Number of occurrences of the term in the current document.
    fn freq(&self) -> u32;

    /// Advance to the next document. Returns false once exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Advance at least once, then to the first document `>= target`.
    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        loop {
            if !self.next()? {
                return Ok(false);
            }
            if self.doc_num() >= target {
                return Ok(true);
            }
        }
    }

    /// Next position of the term in the current document.
    ///
    /// Only enumerators opened with [`IndexReader::term_positions_for`] track
    /// positions; all others fail with [`QuarryError::Unsupported`].
    fn next_position(&mut self) -> Result<Option<u32>> {
        Err(QuarryError::unsupported(
            "positions were not requested for this term enumerator",
        ))
    }
}

/// Cursor over the sorted term dictionary of one field.
///
/// A fresh enumerator is positioned before the first term.
pub trait TermEnum: Send + Debug {
    /// Advance to the next term. Returns false once exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Position on the first term `>= target`. Returns false if there is none.
    fn skip_to(&mut self, target: &str) -> Result<bool>;

    /// The current term. Empty before the first successful `next`/`skip_to`.
    fn curr_term(&self) -> &str;

    /// Number of documents containing the current term.
    fn curr_doc_freq(&self) -> u64;
}

/// Read access to an index snapshot.
pub trait IndexReader: Send + Sync + Debug {
    /// Identity of this reader, used to key reader-scoped caches.
    fn id(&self) -> ReaderId;

    /// One greater than the largest document id.
    fn max_doc(&self) -> u64;

    /// Number of live (non-deleted) documents.
    fn num_docs(&self) -> u64;

    /// Whether `doc` has been deleted.
    fn is_deleted(&self, doc: DocId) -> bool;

    /// Whether any document has been deleted.
    fn has_deletions(&self) -> bool {
        self.num_docs() < self.max_doc()
    }

    /// Field number for `field`, if the field is known to this reader.
    fn field_number(&self, field: &str) -> Option<u32>;

    /// Postings of `term` in `field`, without positions.
    fn term_docs_for(&self, field: &str, term: &str) -> Result<Box<dyn TermDocEnum>>;

    /// Postings of `term` in `field`, with positions.
    fn term_positions_for(&self, field: &str, term: &str) -> Result<Box<dyn TermDocEnum>>;

    /// Term dictionary of `field`.
    fn terms(&self, field: &str) -> Result<Box<dyn TermEnum>>;

    /// Number of documents containing `term` in `field`.
    fn doc_freq(&self, field: &str, term: &str) -> Result<u64>;

    /// One encoded norm byte per document for `field`, or `None` if the field
    /// has no norms.
    fn norms(&self, field: &str) -> Result<Option<Arc<[u8]>>>;

    /// Stored fields of `doc`.
    fn document(&self, _doc: DocId) -> Result<Document> {
        Err(QuarryError::unsupported(
            "this reader does not store documents",
        ))
    }

    /// Term vector of `field` in `doc`, or `None` if the document has no such field.
    fn term_vector(&self, _doc: DocId, _field: &str) -> Result<Option<TermVector>> {
        Err(QuarryError::unsupported(
            "this reader does not provide term vectors",
        ))
    }

    /// Reader-scoped cache of filter bit vectors and sort field indexes.
    fn cache(&self) -> &ReaderCache;

    /// Close the reader. Cached entries tied to it are dropped.
    fn close(&self) -> Result<()>;

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}
