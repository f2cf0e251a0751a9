//! Executes queries against an index reader.
//!
//! A search rewrites the query to a fixed point, binds it to a [`Weight`],
//! walks the weight's scorer in document order and feeds every document that
//! survives the filter and post-filter into a collector.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::index::document::Document;
use crate::index::reader::{DocId, IndexReader};
use crate::index::term_vector::VALUE_SEPARATOR;
use crate::query::query::{Query, rewrite_fully};
use crate::query::weight::Weight;
use crate::search::collector::{Collector, Hit, TopDocsCollector, TopFieldCollector};
use crate::search::explanation::Explanation;
use crate::search::filter::{Filter, FilterExt};
use crate::search::highlight::{HighlightConfig, MatchVector, excerpts};
use crate::search::similarity::{DefaultSimilarity, Similarity};
use crate::search::sort::Sort;
use crate::util::bit_vector::BitVector;

/// Paging parameters of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of leading hits to skip.
    pub offset: usize,
    /// Maximum number of hits to return; `None` returns all of them.
    pub limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            offset: 0,
            limit: Some(10),
        }
    }
}

impl SearchConfig {
    /// Set the offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(QuarryError::invalid_argument("limit must be > 0"));
        }
        Ok(())
    }
}

/// Adjusts the score of a hit after filtering.
///
/// The returned factor multiplies the score; `0.0` drops the hit.
pub trait PostFilter: Send + Sync {
    /// Score factor for `doc`.
    fn filter(&self, doc: DocId, score: f32, searcher: &Searcher<'_>) -> f32;
}

impl<F> PostFilter for F
where
    F: Fn(DocId, f32, &Searcher<'_>) -> f32 + Send + Sync,
{
    fn filter(&self, doc: DocId, score: f32, searcher: &Searcher<'_>) -> f32 {
        self(doc, score, searcher)
    }
}

/// Everything a search needs besides the reader.
#[derive(Clone)]
pub struct SearchRequest {
    query: Arc<dyn Query>,
    config: SearchConfig,
    filter: Option<Arc<dyn Filter>>,
    sort: Option<Sort>,
    post_filter: Option<Arc<dyn PostFilter>>,
}

impl SearchRequest {
    /// A request for the first ten hits of `query` by score.
    pub fn new(query: Arc<dyn Query>) -> Self {
        SearchRequest {
            query,
            config: SearchConfig::default(),
            filter: None,
            sort: None,
            post_filter: None,
        }
    }

    /// Replace the paging parameters.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Skip the first `offset` hits.
    pub fn offset(mut self, offset: usize) -> Self {
        self.config.offset = offset;
        self
    }

    /// Return at most `limit` hits.
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    /// Return every hit.
    pub fn all(mut self) -> Self {
        self.config.limit = None;
        self
    }

    /// Only consider documents `filter` allows.
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Order hits by `sort` instead of score.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Rescale or drop hits after filtering.
    pub fn post_filter(mut self, post_filter: Arc<dyn PostFilter>) -> Self {
        self.post_filter = Some(post_filter);
        self
    }

    /// The query.
    pub fn query(&self) -> &Arc<dyn Query> {
        &self.query
    }

    /// The paging parameters.
    pub fn config(&self) -> SearchConfig {
        self.config
    }
}

impl fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRequest")
            .field("query", &self.query.to_s(""))
            .field("config", &self.config)
            .field("filter", &self.filter.as_ref().map(|filter| filter.to_s()))
            .field("sort", &self.sort.as_ref().map(Sort::to_s))
            .field("post_filter", &self.post_filter.is_some())
            .finish()
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of documents that matched, across all pages.
    pub total_hits: u64,
    /// The requested page of hits in rank order.
    pub hits: Vec<Hit>,
    /// Highest score of any matching document.
    pub max_score: f32,
}

impl TopDocs {
    fn empty() -> Self {
        TopDocs {
            total_hits: 0,
            hits: Vec::new(),
            max_score: 0.0,
        }
    }

    /// Document numbers of the hits.
    pub fn docs(&self) -> Vec<DocId> {
        self.hits.iter().map(|hit| hit.doc).collect()
    }
}

impl fmt::Display for TopDocs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TopDocs: total_hits = {}, max_score = {}", self.total_hits, self.max_score)?;
        for hit in &self.hits {
            writeln!(f, "\t{}: {}", hit.doc, hit.score)?;
        }
        Ok(())
    }
}

/// Runs queries against one reader.
pub struct Searcher<'r> {
    reader: &'r dyn IndexReader,
    similarity: Arc<dyn Similarity>,
}

impl fmt::Debug for Searcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searcher")
            .field("reader", &self.reader.id())
            .field("similarity", &self.similarity)
            .finish()
    }
}

impl<'r> Searcher<'r> {
    /// Create a searcher with the default similarity.
    pub fn new(reader: &'r dyn IndexReader) -> Self {
        Self::with_similarity(reader, Arc::new(DefaultSimilarity))
    }

    /// Create a searcher with a custom similarity.
    pub fn with_similarity(reader: &'r dyn IndexReader, similarity: Arc<dyn Similarity>) -> Self {
        Searcher { reader, similarity }
    }

    /// The searched reader.
    pub fn reader(&self) -> &'r dyn IndexReader {
        self.reader
    }

    /// The similarity weights are bound to.
    pub fn similarity(&self) -> &Arc<dyn Similarity> {
        &self.similarity
    }

    /// Number of documents containing `term` in `field`.
    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u64> {
        self.reader.doc_freq(field, term)
    }

    /// One past the highest document number.
    pub fn max_doc(&self) -> u64 {
        self.reader.max_doc()
    }

    /// Stored fields of `doc`.
    pub fn document(&self, doc: DocId) -> Result<Document> {
        self.reader.document(doc)
    }

    /// Rewrite `query` until it is executable.
    pub fn rewrite(&self, query: &Arc<dyn Query>) -> Result<Arc<dyn Query>> {
        rewrite_fully(query, self.reader)
    }

    /// Rewrite `query` and bind it to this searcher, normalizing its weights.
    pub fn create_weight(&self, query: &Arc<dyn Query>) -> Result<Box<dyn Weight>> {
        let query = self.rewrite(query)?;
        let mut weight = query.create_weight(self)?;
        let sum = weight.sum_of_squared_weights();
        weight.normalize(self.similarity.query_norm(sum));
        Ok(weight)
    }

    /// Run a search and return one page of hits.
    pub fn search(&self, request: &SearchRequest) -> Result<TopDocs> {
        request.config.validate()?;
        let started = Instant::now();
        let capacity = match request.config.limit {
            Some(limit) => request.config.offset.saturating_add(limit),
            None => self.max_doc() as usize,
        };
        let mut collector: Box<dyn Collector> = match &request.sort {
            Some(sort) => Box::new(TopFieldCollector::new(capacity, sort.comparator(self.reader)?)),
            None => Box::new(TopDocsCollector::new(capacity)),
        };

        let scanned = self.scan(
            &request.query,
            request.filter.as_ref(),
            request.post_filter.as_deref(),
            |doc, score| collector.collect(doc, score),
        )?;
        let Some(scanned) = scanned else {
            return Ok(TopDocs::empty());
        };

        let total_hits = collector.total_hits();
        let max_score = collector.max_score();
        let hits = collector.into_hits(request.config.offset);
        trace!(
            "search {} scanned {scanned} docs, {total_hits} hits in {:?}",
            request.query.to_s(""),
            started.elapsed()
        );
        Ok(TopDocs {
            total_hits,
            hits,
            max_score,
        })
    }

    /// Call `f` with every matching document and its score, in document order.
    /// Returns the number of hits.
    pub fn search_each<F>(
        &self,
        query: &Arc<dyn Query>,
        filter: Option<&Arc<dyn Filter>>,
        post_filter: Option<&dyn PostFilter>,
        mut f: F,
    ) -> Result<u64>
    where
        F: FnMut(DocId, f32),
    {
        let mut hits = 0;
        self.scan(query, filter, post_filter, |doc, score| {
            hits += 1;
            f(doc, score);
            Ok(())
        })?;
        Ok(hits)
    }

    /// Document numbers of up to `limit` matches at or after `start_doc`,
    /// in document order and without scoring.
    pub fn search_unscored(
        &self,
        query: &Arc<dyn Query>,
        limit: usize,
        start_doc: DocId,
    ) -> Result<Vec<DocId>> {
        let weight = self.create_weight(query)?;
        let mut docs = Vec::new();
        if limit == 0 {
            return Ok(docs);
        }
        let Some(mut scorer) = weight.scorer(self.reader)? else {
            return Ok(docs);
        };
        let mut found = scorer.skip_to(start_doc)?;
        while found {
            docs.push(scorer.doc());
            if docs.len() >= limit {
                break;
            }
            found = scorer.next()?;
        }
        Ok(docs)
    }

    /// Explain how `doc` scores against `query`.
    pub fn explain(&self, query: &Arc<dyn Query>, doc: DocId) -> Result<Explanation> {
        let weight = self.create_weight(query)?;
        weight.explain(self.reader, doc)
    }

    /// Where `query` matches `field` of `doc`, as compacted ranges with byte
    /// offsets into the field's stored text.
    pub fn match_vector(&self, query: &Arc<dyn Query>, doc: DocId, field: &str) -> Result<MatchVector> {
        let mut matches = MatchVector::new();
        let Some(tv) = self.reader.term_vector(doc, field)? else {
            return Ok(matches);
        };
        let query = self.rewrite(query)?;
        query.match_vector(&mut matches, &tv);
        matches.compact();
        matches.set_offsets(&tv);
        Ok(matches)
    }

    /// Excerpts of `field` in `doc` with the matches of `query` marked up.
    /// Empty when the field is missing or nothing matches.
    pub fn highlight(
        &self,
        query: &Arc<dyn Query>,
        doc: DocId,
        field: &str,
        config: &HighlightConfig,
    ) -> Result<Vec<String>> {
        let matches = self.match_vector(query, doc, field)?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.reader.document(doc)?.values(field).join(VALUE_SEPARATOR);
        trace!("highlighting {} matches in {field} of doc {doc}", matches.len());
        Ok(excerpts(&text, &matches, config))
    }

    /// Every document `query` matches, ignoring scores.
    pub fn bits(&self, query: &Arc<dyn Query>) -> Result<BitVector> {
        let mut bits = BitVector::with_capacity(self.max_doc() as usize);
        let weight = self.create_weight(query)?;
        if let Some(mut scorer) = weight.scorer(self.reader)? {
            while scorer.next()? {
                bits.set(scorer.doc() as usize);
            }
        }
        Ok(bits)
    }

    /// Walk the matches of `query`, calling `collect` for each survivor of
    /// `filter` and `post_filter`. Returns the number of documents the scorer
    /// produced, or `None` when nothing can match.
    fn scan<C>(
        &self,
        query: &Arc<dyn Query>,
        filter: Option<&Arc<dyn Filter>>,
        post_filter: Option<&dyn PostFilter>,
        mut collect: C,
    ) -> Result<Option<u64>>
    where
        C: FnMut(DocId, f32) -> Result<()>,
    {
        let weight = self.create_weight(query)?;
        let bits = filter.map(|filter| filter.get_bitvector(self.reader)).transpose()?;
        let Some(mut scorer) = weight.scorer(self.reader)? else {
            return Ok(None);
        };

        let mut scanned = 0;
        while scorer.next()? {
            scanned += 1;
            let doc = scorer.doc();
            if let Some(bits) = &bits {
                if !bits.get(doc as usize) {
                    continue;
                }
            }
            let mut score = scorer.score()?;
            if let Some(post_filter) = post_filter {
                let factor = post_filter.filter(doc, score, self);
                if factor == 0.0 {
                    continue;
                }
                score *= factor;
            }
            collect(doc, score)?;
        }
        Ok(Some(scanned))
    }
}
