//! Scorer trait and the generic scorers composite queries are built from.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::reader::{DocId, IndexReader};
use crate::search::explanation::Explanation;
use crate::util::bit_vector::BitVector;

/// Forward-only iterator over ascending matching document ids.
///
/// A new scorer is positioned before its first document. [`doc`](Scorer::doc)
/// and [`score`](Scorer::score) are only meaningful after `next` or `skip_to`
/// returned true. Once either returns false the scorer is exhausted.
pub trait Scorer: Send + Debug {
    /// Current document.
    fn doc(&self) -> DocId;

    /// Advance to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Advance at least once, then to the first matching document `>= target`.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// Score of the current document.
    fn score(&mut self) -> Result<f32>;

    /// Explain the frequency part of the score for `doc`.
    fn explain(&mut self, _doc: DocId) -> Result<Explanation> {
        Err(QuarryError::unsupported("this scorer cannot explain"))
    }
}

/// Matches documents every sub-scorer matches; the score is the sum of theirs.
#[derive(Debug)]
pub struct ConjunctionScorer {
    scorers: Vec<Box<dyn Scorer>>,
    started: bool,
    exhausted: bool,
    doc: DocId,
}

impl ConjunctionScorer {
    /// Create a conjunction. An empty conjunction matches nothing.
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        let exhausted = scorers.is_empty();
        ConjunctionScorer {
            scorers,
            started: false,
            exhausted,
            doc: 0,
        }
    }

    /// Number of sub-scorers.
    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    /// Whether there are no sub-scorers.
    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    fn finish(&mut self) -> Result<bool> {
        self.exhausted = true;
        Ok(false)
    }

    fn align(&mut self) -> Result<bool> {
        loop {
            let target = self.scorers.iter().map(|s| s.doc()).max().unwrap_or(DocId::MAX);
            let mut aligned = true;
            for scorer in &mut self.scorers {
                if scorer.doc() < target {
                    if !scorer.skip_to(target)? {
                        return self.finish();
                    }
                    if scorer.doc() != target {
                        aligned = false;
                    }
                }
            }
            if aligned {
                self.doc = target;
                return Ok(true);
            }
        }
    }
}

impl Scorer for ConjunctionScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.started {
            self.started = true;
            for scorer in &mut self.scorers {
                if !scorer.next()? {
                    return self.finish();
                }
            }
        } else if !self.scorers[0].next()? {
            return self.finish();
        }
        self.align()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.started && target <= self.doc {
            return self.next();
        }
        let first_call = !self.started;
        self.started = true;
        for scorer in &mut self.scorers {
            if (first_call || scorer.doc() < target) && !scorer.skip_to(target)? {
                return self.finish();
            }
        }
        self.align()
    }

    fn score(&mut self) -> Result<f32> {
        let mut sum = 0.0;
        for scorer in &mut self.scorers {
            sum += scorer.score()?;
        }
        Ok(sum)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    doc: DocId,
    index: usize,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by doc id.
        other
            .doc
            .cmp(&self.doc)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Matches documents at least `min_matches` sub-scorers match.
///
/// The score is the sum of the matching sub-scores; [`matchers`](Self::matchers)
/// reports how many sub-scorers matched the current document.
#[derive(Debug)]
pub struct DisjunctionScorer {
    scorers: Vec<Box<dyn Scorer>>,
    heap: BinaryHeap<HeapEntry>,
    min_matches: usize,
    started: bool,
    doc: DocId,
    score: f32,
    matchers: usize,
}

impl DisjunctionScorer {
    /// Create a disjunction requiring `min_matches` (at least 1) sub-scorers per document.
    pub fn new(scorers: Vec<Box<dyn Scorer>>, min_matches: usize) -> Self {
        DisjunctionScorer {
            heap: BinaryHeap::with_capacity(scorers.len()),
            scorers,
            min_matches: min_matches.max(1),
            started: false,
            doc: 0,
            score: 0.0,
            matchers: 0,
        }
    }

    /// Number of sub-scorers matching the current document.
    pub fn matchers(&self) -> usize {
        self.matchers
    }

    /// Whether `next` or `skip_to` has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn push(&mut self, index: usize) {
        let doc = self.scorers[index].doc();
        self.heap.push(HeapEntry { doc, index });
    }

    /// Collect every sub-scorer positioned on the smallest doc, advancing them past it.
    fn gather(&mut self) -> Result<bool> {
        loop {
            let Some(top) = self.heap.peek().copied() else {
                return Ok(false);
            };
            let doc = top.doc;
            let mut score = 0.0;
            let mut matchers = 0;
            while let Some(entry) = self.heap.peek().copied() {
                if entry.doc != doc {
                    break;
                }
                self.heap.pop();
                let scorer = &mut self.scorers[entry.index];
                score += scorer.score()?;
                matchers += 1;
                if scorer.next()? {
                    self.push(entry.index);
                }
            }
            if matchers >= self.min_matches {
                self.doc = doc;
                self.score = score;
                self.matchers = matchers;
                return Ok(true);
            }
        }
    }
}

impl Scorer for DisjunctionScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            for i in 0..self.scorers.len() {
                if self.scorers[i].next()? {
                    self.push(i);
                }
            }
        }
        self.gather()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if !self.started {
            self.started = true;
            for i in 0..self.scorers.len() {
                if self.scorers[i].skip_to(target)? {
                    self.push(i);
                }
            }
        } else {
            while let Some(entry) = self.heap.peek().copied() {
                if entry.doc >= target {
                    break;
                }
                self.heap.pop();
                if self.scorers[entry.index].skip_to(target)? {
                    self.push(entry.index);
                }
            }
        }
        self.gather()
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.score)
    }
}

/// Iterates the members of a bit vector, giving every document the same score.
/// A negated vector matches every document past its stored size.
#[derive(Debug)]
pub struct BitVectorScorer {
    bits: Arc<BitVector>,
    max_doc: u64,
    score: f32,
    doc: Option<DocId>,
}

impl BitVectorScorer {
    /// Create a scorer over `bits`, ignoring bits at or beyond `max_doc`.
    pub fn new(bits: Arc<BitVector>, max_doc: u64, score: f32) -> Self {
        BitVectorScorer {
            bits,
            max_doc,
            score,
            doc: None,
        }
    }

    fn advance_from(&mut self, from: u64) -> bool {
        match self.bits.next_member(from as usize) {
            Some(bit) if (bit as u64) < self.max_doc => {
                self.doc = Some(bit as DocId);
                true
            }
            _ => {
                self.doc = Some(self.max_doc);
                false
            }
        }
    }
}

impl Scorer for BitVectorScorer {
    fn doc(&self) -> DocId {
        self.doc.unwrap_or(0)
    }

    fn next(&mut self) -> Result<bool> {
        let from = self.doc.map_or(0, |d| d + 1);
        Ok(self.advance_from(from))
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        let from = self.doc.map_or(target, |d| target.max(d + 1));
        Ok(self.advance_from(from))
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.score)
    }
}

/// Bit vector of the live (non-deleted) documents of `reader`.
pub fn live_docs(reader: &dyn IndexReader) -> BitVector {
    let max_doc = reader.max_doc();
    let mut bits = BitVector::with_capacity(max_doc as usize);
    for doc in 0..max_doc {
        if !reader.is_deleted(doc) {
            bits.set(doc as usize);
        }
    }
    bits
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scorer over a fixed list of (doc, score) pairs.
    #[derive(Debug)]
    pub(crate) struct ListScorer {
        entries: Vec<(DocId, f32)>,
        pos: Option<usize>,
    }

    impl ListScorer {
        pub(crate) fn boxed(entries: &[(DocId, f32)]) -> Box<dyn Scorer> {
            Box::new(ListScorer {
                entries: entries.to_vec(),
                pos: None,
            })
        }
    }

    impl Scorer for ListScorer {
        fn doc(&self) -> DocId {
            self.pos
                .and_then(|p| self.entries.get(p))
                .map_or(DocId::MAX, |e| e.0)
        }

        fn next(&mut self) -> Result<bool> {
            let next = self.pos.map_or(0, |p| p + 1);
            self.pos = Some(next.min(self.entries.len()));
            Ok(next < self.entries.len())
        }

        fn skip_to(&mut self, target: DocId) -> Result<bool> {
            loop {
                if !self.next()? {
                    return Ok(false);
                }
                if self.doc() >= target {
                    return Ok(true);
                }
            }
        }

        fn score(&mut self) -> Result<f32> {
            Ok(self.pos.and_then(|p| self.entries.get(p)).map_or(0.0, |e| e.1))
        }
    }

    fn drain(scorer: &mut dyn Scorer) -> Vec<(DocId, f32)> {
        let mut out = Vec::new();
        while scorer.next().unwrap() {
            let doc = scorer.doc();
            out.push((doc, scorer.score().unwrap()));
        }
        out
    }

    #[test]
    fn test_conjunction() {
        let mut scorer = ConjunctionScorer::new(vec![
            ListScorer::boxed(&[(1, 1.0), (3, 1.0), (5, 1.0), (8, 1.0)]),
            ListScorer::boxed(&[(3, 2.0), (4, 2.0), (8, 2.0), (9, 2.0)]),
            ListScorer::boxed(&[(0, 0.5), (3, 0.5), (8, 0.5)]),
        ]);
        assert_eq!(drain(&mut scorer), vec![(3, 3.5), (8, 3.5)]);
        assert!(!scorer.next().unwrap());
    }

    #[test]
    fn test_conjunction_skip_to() {
        let mut scorer = ConjunctionScorer::new(vec![
            ListScorer::boxed(&[(1, 1.0), (3, 1.0), (5, 1.0), (8, 1.0)]),
            ListScorer::boxed(&[(1, 1.0), (3, 1.0), (8, 1.0)]),
        ]);
        assert!(scorer.skip_to(2).unwrap());
        assert_eq!(scorer.doc(), 3);
        assert!(scorer.skip_to(3).unwrap());
        assert_eq!(scorer.doc(), 8);
        assert!(!scorer.skip_to(9).unwrap());
    }

    #[test]
    fn test_empty_conjunction() {
        let mut scorer = ConjunctionScorer::new(Vec::new());
        assert!(!scorer.next().unwrap());
    }

    #[test]
    fn test_disjunction() {
        let mut scorer = DisjunctionScorer::new(
            vec![
                ListScorer::boxed(&[(1, 1.0), (3, 1.0)]),
                ListScorer::boxed(&[(3, 2.0), (4, 2.0)]),
                ListScorer::boxed(&[(0, 0.5), (3, 0.5)]),
            ],
            1,
        );
        assert!(scorer.next().unwrap());
        assert_eq!((scorer.doc(), scorer.matchers()), (0, 1));
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 1);
        assert!(scorer.next().unwrap());
        assert_eq!((scorer.doc(), scorer.matchers()), (3, 3));
        assert_eq!(scorer.score().unwrap(), 3.5);
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 4);
        assert!(!scorer.next().unwrap());
    }

    #[test]
    fn test_disjunction_min_matches_and_skip() {
        let mut scorer = DisjunctionScorer::new(
            vec![
                ListScorer::boxed(&[(1, 1.0), (3, 1.0), (6, 1.0)]),
                ListScorer::boxed(&[(3, 1.0), (4, 1.0), (6, 1.0)]),
                ListScorer::boxed(&[(1, 1.0), (6, 1.0)]),
            ],
            2,
        );
        assert_eq!(
            drain(&mut scorer).iter().map(|e| e.0).collect::<Vec<_>>(),
            vec![1, 3, 6]
        );

        let mut scorer = DisjunctionScorer::new(
            vec![
                ListScorer::boxed(&[(1, 1.0), (3, 1.0), (6, 1.0)]),
                ListScorer::boxed(&[(4, 1.0), (7, 1.0)]),
            ],
            1,
        );
        assert!(scorer.skip_to(4).unwrap());
        assert_eq!(scorer.doc(), 4);
        assert!(scorer.skip_to(5).unwrap());
        assert_eq!(scorer.doc(), 6);
    }

    #[test]
    fn test_bit_vector_scorer() {
        let bits: BitVector = [2, 5, 9, 40].into_iter().collect();
        let mut scorer = BitVectorScorer::new(Arc::new(bits), 10, 0.75);
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 2);
        assert_eq!(scorer.score().unwrap(), 0.75);
        assert!(scorer.skip_to(3).unwrap());
        assert_eq!(scorer.doc(), 5);
        assert!(scorer.skip_to(5).unwrap());
        assert_eq!(scorer.doc(), 9);
        assert!(!scorer.next().unwrap());
    }

    #[test]
    fn test_bit_vector_scorer_negated_runs_to_max_doc() {
        let bits: BitVector = [0, 2].into_iter().collect();
        let mut scorer = BitVectorScorer::new(Arc::new(bits.not()), 5, 1.0);
        assert_eq!(drain(&mut scorer).iter().map(|e| e.0).collect::<Vec<_>>(), vec![1, 3, 4]);

        let mut scorer = BitVectorScorer::new(Arc::new(bits.not()), 5, 1.0);
        assert!(scorer.skip_to(4).unwrap());
        assert_eq!(scorer.doc(), 4);
        assert!(!scorer.next().unwrap());
    }
}
