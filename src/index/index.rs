//! Convenience facade bundling an analyzer, an in-memory index and a searcher.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::index::analysis::AnalyzerKind;
use crate::index::document::Document;
use crate::index::memory::{MemoryIndex, MemoryIndexReader};
use crate::index::reader::{DocId, IndexReader};
use crate::query::query::Query;
use crate::search::explanation::Explanation;
use crate::search::highlight::HighlightConfig;
use crate::search::searcher::{SearchRequest, Searcher, TopDocs};

/// Configuration of an [`Index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Field used when a query names no field.
    pub default_field: String,
    /// Analyzer applied to every field.
    pub analyzer: AnalyzerKind,
    /// Field holding a unique key. Adding a document whose key already exists
    /// replaces the old document. The stored key value is looked up as a term,
    /// so it must be a single token the analyzer leaves unchanged.
    pub key: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            default_field: "body".to_string(),
            analyzer: AnalyzerKind::default(),
            key: None,
        }
    }
}

impl IndexConfig {
    /// Set the default field.
    pub fn default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_field = field.into();
        self
    }

    /// Set the analyzer.
    pub fn analyzer(mut self, analyzer: AnalyzerKind) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the key field.
    pub fn key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[derive(Debug)]
struct IndexState {
    writer: MemoryIndex,
    reader: Option<Arc<MemoryIndexReader>>,
}

impl IndexState {
    /// Current snapshot, taken anew after writes.
    fn reader(&mut self) -> Arc<MemoryIndexReader> {
        match &self.reader {
            Some(reader) => Arc::clone(reader),
            None => {
                let reader = Arc::new(self.writer.reader());
                debug!(
                    "opened reader {} over {} documents",
                    reader.id().value(),
                    reader.max_doc()
                );
                self.reader = Some(Arc::clone(&reader));
                reader
            }
        }
    }

    /// Drop the current snapshot so the next read sees the latest writes.
    fn invalidate(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.close()?;
        }
        Ok(())
    }
}

/// A searchable document collection.
///
/// Every operation takes the same lock, so an `Index` can be shared across
/// threads. Writes become visible to searches immediately; the reader
/// snapshot is refreshed lazily on the next read.
#[derive(Debug)]
pub struct Index {
    config: IndexConfig,
    state: Mutex<IndexState>,
}

impl Default for Index {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl Index {
    /// Create an empty index.
    pub fn new(config: IndexConfig) -> Self {
        let writer = MemoryIndex::new(config.analyzer.build());
        Index {
            config,
            state: Mutex::new(IndexState { writer, reader: None }),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Add a document, replacing any document with the same key.
    pub fn add_document(&self, doc: Document) -> Result<DocId> {
        let mut state = self.state.lock();
        if let Some(key) = &self.config.key {
            let value = doc
                .get(key)
                .ok_or_else(|| QuarryError::invalid_argument(format!("document is missing key field {key}")))?;
            let replaced = state.writer.delete_by_term(key, value);
            if replaced > 0 {
                debug!("replaced {replaced} documents with {key} = {value}");
            }
        }
        let doc = state.writer.add_document(doc);
        state.invalidate()?;
        Ok(doc)
    }

    /// Delete every document containing `term` in `field`. Returns the number deleted.
    pub fn delete_by_term(&self, field: &str, term: &str) -> Result<usize> {
        let mut state = self.state.lock();
        let deleted = state.writer.delete_by_term(field, term);
        if deleted > 0 {
            state.invalidate()?;
        }
        Ok(deleted)
    }

    /// Delete document `doc`.
    pub fn delete(&self, doc: DocId) -> Result<()> {
        let mut state = self.state.lock();
        state.writer.delete(doc)?;
        state.invalidate()
    }

    /// Run a search.
    pub fn search(&self, request: &SearchRequest) -> Result<TopDocs> {
        let mut state = self.state.lock();
        let reader = state.reader();
        Searcher::new(&*reader).search(request)
    }

    /// Explain how `doc` scores against `query`.
    pub fn explain(&self, query: &Arc<dyn Query>, doc: DocId) -> Result<Explanation> {
        let mut state = self.state.lock();
        let reader = state.reader();
        Searcher::new(&*reader).explain(query, doc)
    }

    /// Excerpts of `field` in `doc` with the matches of `query` marked up.
    pub fn highlight(
        &self,
        query: &Arc<dyn Query>,
        doc: DocId,
        field: &str,
        config: &HighlightConfig,
    ) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let reader = state.reader();
        Searcher::new(&*reader).highlight(query, doc, field, config)
    }

    /// Stored fields of `doc`.
    pub fn document(&self, doc: DocId) -> Result<Document> {
        let state = self.state.lock();
        state
            .writer
            .document(doc)
            .cloned()
            .ok_or_else(|| QuarryError::not_found(format!("document {doc}")))
    }

    /// Number of live documents.
    pub fn size(&self) -> u64 {
        self.state.lock().writer.num_docs()
    }

    /// Whether any document has been deleted.
    pub fn has_deletions(&self) -> bool {
        let state = self.state.lock();
        state.writer.num_docs() < state.writer.max_doc()
    }

    /// Whether `doc` is deleted.
    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.state.lock().writer.is_deleted(doc)
    }

    /// Publish pending writes by taking a fresh reader snapshot now.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.invalidate()?;
        state.reader();
        Ok(())
    }

    /// The current reader snapshot. It is closed by the next write.
    pub fn reader(&self) -> Arc<MemoryIndexReader> {
        self.state.lock().reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::term::TermQuery;

    fn doc(id: &str, body: &str) -> Document {
        Document::builder().add_field("id", id).add_field("body", body).build()
    }

    #[test]
    fn test_add_and_search() {
        let index = Index::default();
        index.add_document(doc("1", "red fox")).unwrap();
        index.add_document(doc("2", "blue fox")).unwrap();
        let query: Arc<dyn Query> = Arc::new(TermQuery::new("body", "fox"));
        let top = index.search(&SearchRequest::new(Arc::clone(&query))).unwrap();
        assert_eq!(top.total_hits, 2);

        index.add_document(doc("3", "grey fox")).unwrap();
        let top = index.search(&SearchRequest::new(query)).unwrap();
        assert_eq!(top.total_hits, 3);
        assert_eq!(index.size(), 3);
    }

    #[test]
    fn test_key_replaces_document() {
        let index = Index::new(IndexConfig::default().key("id"));
        index.add_document(doc("1", "old")).unwrap();
        let new = index.add_document(doc("1", "new")).unwrap();
        assert_eq!(index.size(), 1);
        assert!(index.is_deleted(0));
        assert_eq!(index.document(new).unwrap().get("body"), Some("new"));
        assert!(index.add_document(Document::builder().add_field("body", "x").build()).is_err());
    }

    #[test]
    fn test_deletes_close_old_reader() {
        let index = Index::default();
        index.add_document(doc("1", "a")).unwrap();
        index.add_document(doc("2", "a")).unwrap();
        let before = index.reader();
        assert_eq!(index.delete_by_term("id", "1").unwrap(), 1);
        assert!(before.is_closed());
        assert!(index.has_deletions());
        index.commit().unwrap();
        assert_eq!(index.reader().num_docs(), 1);
    }

    #[test]
    fn test_config_from_json() {
        let config = IndexConfig::from_json(r#"{"analyzer": "standard", "key": "id"}"#).unwrap();
        assert_eq!(config.analyzer, AnalyzerKind::Standard);
        assert_eq!(config.key.as_deref(), Some("id"));
        assert_eq!(config.default_field, "body");
        assert!(IndexConfig::from_json("{\"analyzer\": 3}").is_err());
    }
}
