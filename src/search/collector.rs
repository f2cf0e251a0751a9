//! Collectors gather the hits of a search into a ranked page.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::DocId;
use crate::search::sort::SortComparator;
use crate::util::priority_queue::PriorityQueue;

/// A matching document and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Document number.
    pub doc: DocId,
    /// Score of the document.
    pub score: f32,
}

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// Collect a document hit.
    fn collect(&mut self, doc: DocId, score: f32) -> Result<()>;

    /// Number of hits collected so far, kept or not.
    fn total_hits(&self) -> u64;

    /// Highest score collected so far, 0.0 before any hit.
    fn max_score(&self) -> f32;

    /// The kept hits in rank order, skipping the first `offset`.
    fn into_hits(self: Box<Self>, offset: usize) -> Vec<Hit>;
}

/// `a` ranks below `b`: lower score, or equal score and higher document number.
fn score_less_than(a: &Hit, b: &Hit) -> bool {
    a.score < b.score || (a.score == b.score && a.doc > b.doc)
}

/// Keeps the `capacity` best hits by score.
#[derive(Debug)]
pub struct TopDocsCollector {
    queue: PriorityQueue<Hit>,
    total_hits: u64,
    max_score: f32,
}

impl TopDocsCollector {
    /// Create a collector keeping at most `capacity` hits.
    pub fn new(capacity: usize) -> Self {
        TopDocsCollector {
            queue: PriorityQueue::with_less_than(capacity, score_less_than as fn(&Hit, &Hit) -> bool),
            total_hits: 0,
            max_score: 0.0,
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        self.total_hits += 1;
        self.max_score = self.max_score.max(score);
        self.queue.insert(Hit { doc, score });
        Ok(())
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }

    fn max_score(&self) -> f32 {
        self.max_score
    }

    fn into_hits(self: Box<Self>, offset: usize) -> Vec<Hit> {
        self.queue.into_sorted_vec().into_iter().rev().skip(offset).collect()
    }
}

type RankFn = Box<dyn Fn(&Hit, &Hit) -> bool + Send>;

/// Keeps the `capacity` first hits in the order of a [`Sort`](crate::search::sort::Sort).
pub struct TopFieldCollector {
    queue: PriorityQueue<Hit, RankFn>,
    total_hits: u64,
    max_score: f32,
}

impl TopFieldCollector {
    /// Create a collector keeping at most `capacity` hits ordered by `comparator`.
    pub fn new(capacity: usize, comparator: SortComparator) -> Self {
        let less_than: RankFn = Box::new(move |a: &Hit, b: &Hit| comparator.compare(a, b).is_gt());
        TopFieldCollector {
            queue: PriorityQueue::with_less_than(capacity, less_than),
            total_hits: 0,
            max_score: 0.0,
        }
    }
}

impl Debug for TopFieldCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopFieldCollector")
            .field("queue", &self.queue)
            .field("total_hits", &self.total_hits)
            .field("max_score", &self.max_score)
            .finish()
    }
}

impl Collector for TopFieldCollector {
    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        self.total_hits += 1;
        self.max_score = self.max_score.max(score);
        self.queue.insert(Hit { doc, score });
        Ok(())
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }

    fn max_score(&self) -> f32 {
        self.max_score
    }

    fn into_hits(self: Box<Self>, offset: usize) -> Vec<Hit> {
        self.queue.into_sorted_vec().into_iter().rev().skip(offset).collect()
    }
}
