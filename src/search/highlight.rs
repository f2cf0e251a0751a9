//! Match vectors and excerpt highlighting.
//!
//! A query reports where it matches a document as a [`MatchVector`]: ranges
//! of term positions taken from the document's [`TermVector`]. Resolving the
//! positions to byte offsets lets [`excerpts`] cut the stored text into
//! excerpts with every match wrapped in tags.

use crate::index::term_vector::TermVector;

/// An inclusive range of term positions matched by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRange {
    /// First matched position.
    pub start: u32,
    /// Last matched position.
    pub end: u32,
    /// Byte offset where the range starts in the field text.
    pub start_offset: usize,
    /// Byte offset one past the end of the range.
    pub end_offset: usize,
    /// Weight of the range when ranking excerpts.
    pub score: f32,
}

/// The matches of one query in one field of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchVector {
    matches: Vec<MatchRange>,
}

impl MatchVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a match covering positions `start..=end`.
    pub fn add(&mut self, start: u32, end: u32) {
        self.matches.push(MatchRange {
            start,
            end: end.max(start),
            start_offset: 0,
            end_offset: 0,
            score: 1.0,
        });
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The recorded ranges.
    pub fn matches(&self) -> &[MatchRange] {
        &self.matches
    }

    /// Order ranges by start position, longest first on ties.
    pub fn sort(&mut self) {
        self.matches
            .sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    }

    /// Sort and merge overlapping ranges. A merged range scores the sum of its parts.
    pub fn compact(&mut self) {
        self.sort();
        let mut merged: Vec<MatchRange> = Vec::with_capacity(self.matches.len());
        for range in self.matches.drain(..) {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => {
                    last.end = last.end.max(range.end);
                    last.score += range.score;
                }
                _ => merged.push(range),
            }
        }
        self.matches = merged;
    }

    /// Resolve positions to byte offsets. Ranges outside the vector are dropped.
    pub fn set_offsets(&mut self, tv: &TermVector) {
        self.matches.retain_mut(|range| {
            match (tv.offset(range.start), tv.offset(range.end)) {
                (Some(first), Some(last)) => {
                    range.start_offset = first.start;
                    range.end_offset = last.end;
                    true
                }
                _ => false,
            }
        });
    }
}

/// How excerpts are cut and marked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Target excerpt length in bytes.
    pub excerpt_length: usize,
    /// Maximum number of excerpts.
    pub num_excerpts: usize,
    /// Inserted before every match.
    pub pre_tag: String,
    /// Inserted after every match.
    pub post_tag: String,
    /// Marks an excerpt that does not reach the start or end of the text.
    pub ellipsis: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            excerpt_length: 150,
            num_excerpts: 2,
            pre_tag: "<b>".to_string(),
            post_tag: "</b>".to_string(),
            ellipsis: "...".to_string(),
        }
    }
}

impl HighlightConfig {
    pub fn excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    pub fn num_excerpts(mut self, num_excerpts: usize) -> Self {
        self.num_excerpts = num_excerpts;
        self
    }

    pub fn tags<P: Into<String>, Q: Into<String>>(mut self, pre_tag: P, post_tag: Q) -> Self {
        self.pre_tag = pre_tag.into();
        self.post_tag = post_tag.into();
        self
    }

    pub fn ellipsis<S: Into<String>>(mut self, ellipsis: S) -> Self {
        self.ellipsis = ellipsis.into();
        self
    }

    /// Highlight the entire field as a single excerpt.
    pub fn whole_field(self) -> Self {
        self.excerpt_length(usize::MAX).num_excerpts(1)
    }
}

/// Consecutive matches that fit in one excerpt.
#[derive(Debug, Clone, Copy)]
struct Window {
    first: usize,
    last: usize,
    score: f32,
}

/// Cut `text` into at most `config.num_excerpts` excerpts around the
/// best-scoring groups of matches, in text order.
///
/// `matches` must be compacted and carry offsets into `text`.
pub fn excerpts(text: &str, matches: &MatchVector, config: &HighlightConfig) -> Vec<String> {
    let ranges = matches.matches();
    if ranges.is_empty() || config.num_excerpts == 0 {
        return Vec::new();
    }

    let mut windows: Vec<Window> = Vec::with_capacity(ranges.len());
    for first in 0..ranges.len() {
        let start = ranges[first].start_offset;
        let mut window = Window {
            first,
            last: first,
            score: ranges[first].score,
        };
        while let Some(next) = ranges.get(window.last + 1) {
            if next.end_offset - start > config.excerpt_length {
                break;
            }
            window.last += 1;
            window.score += next.score;
        }
        windows.push(window);
    }
    windows.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.first.cmp(&b.first)));

    let mut chosen: Vec<Window> = Vec::with_capacity(config.num_excerpts);
    for window in windows {
        if chosen.len() == config.num_excerpts {
            break;
        }
        if chosen.iter().all(|c| window.last < c.first || window.first > c.last) {
            chosen.push(window);
        }
    }
    chosen.sort_by_key(|w| w.first);

    let mut floor = 0;
    let mut excerpts = Vec::with_capacity(chosen.len());
    for (i, window) in chosen.iter().enumerate() {
        let ceiling = chosen
            .get(i + 1)
            .map_or(text.len(), |next| ranges[next.first].start_offset);
        let (start, end) = excerpt_bounds(
            text,
            (ranges[window.first].start_offset, ranges[window.last].end_offset),
            config.excerpt_length,
            (floor, ceiling),
        );
        floor = end;
        excerpts.push(render(text, start, end, ranges, config));
    }
    excerpts
}

/// Byte bounds of an excerpt covering the matched span, padded on both sides
/// up to `length` without leaving `floor..ceiling`, and trimmed to whole
/// words where the padding allows.
fn excerpt_bounds(
    text: &str,
    (match_start, match_end): (usize, usize),
    length: usize,
    (floor, ceiling): (usize, usize),
) -> (usize, usize) {
    let target = length.max(match_end - match_start);
    let pad = target - (match_end - match_start);
    let mut start = match_start.saturating_sub(pad / 2).max(floor);
    let mut end = match_end
        .saturating_add(pad - (match_start - start))
        .min(ceiling);
    let used = end - start;
    if used < target {
        start = start.saturating_sub(target - used).max(floor);
    }

    while !text.is_char_boundary(start) {
        start += 1;
    }
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (snap_start(text, start, match_start), snap_end(text, end, match_end))
}

/// Move `start` forward to the beginning of a word, staying at or before `limit`.
fn snap_start(text: &str, start: usize, limit: usize) -> usize {
    if start == 0 || text[..start].ends_with(char::is_whitespace) {
        return start;
    }
    let head = &text[start..limit];
    match head.find(char::is_whitespace) {
        Some(i) => limit - head[i..].trim_start().len(),
        None => start,
    }
}

/// Move `end` back to the end of a word, staying at or after `limit`.
fn snap_end(text: &str, end: usize, limit: usize) -> usize {
    if end == text.len() || text[end..].starts_with(char::is_whitespace) {
        return end;
    }
    let tail = &text[limit..end];
    match tail.rfind(char::is_whitespace) {
        Some(i) => limit + tail[..i].trim_end().len(),
        None => end,
    }
}

fn render(text: &str, start: usize, end: usize, ranges: &[MatchRange], config: &HighlightConfig) -> String {
    let mut excerpt = String::with_capacity(end - start + 2 * config.ellipsis.len());
    if start > 0 {
        excerpt.push_str(&config.ellipsis);
    }
    let mut cursor = start;
    for range in ranges
        .iter()
        .filter(|r| r.start_offset >= start && r.end_offset <= end)
    {
        excerpt.push_str(&text[cursor..range.start_offset]);
        excerpt.push_str(&config.pre_tag);
        excerpt.push_str(&text[range.start_offset..range.end_offset]);
        excerpt.push_str(&config.post_tag);
        cursor = range.end_offset;
    }
    excerpt.push_str(&text[cursor..end]);
    if end < text.len() {
        excerpt.push_str(&config.ellipsis);
    }
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::analysis::WhitespaceAnalyzer;

    fn matches_for(text: &str, positions: &[(u32, u32)]) -> MatchVector {
        let tv = TermVector::from_values("f", &[text.to_string()], &WhitespaceAnalyzer::new());
        let mut mv = MatchVector::new();
        for &(start, end) in positions {
            mv.add(start, end);
        }
        mv.compact();
        mv.set_offsets(&tv);
        mv
    }

    #[test]
    fn test_compact_merges_overlaps() {
        let mut mv = MatchVector::new();
        mv.add(5, 5);
        mv.add(1, 3);
        mv.add(2, 2);
        mv.add(4, 4);
        mv.compact();
        let spans: Vec<_> = mv.matches().iter().map(|m| (m.start, m.end, m.score)).collect();
        assert_eq!(spans, vec![(1, 3, 2.0), (4, 4, 1.0), (5, 5, 1.0)]);
    }

    #[test]
    fn test_set_offsets_drops_unknown_positions() {
        let mv = matches_for("one two three", &[(1, 2), (7, 7)]);
        assert_eq!(mv.len(), 1);
        assert_eq!((mv.matches()[0].start_offset, mv.matches()[0].end_offset), (4, 13));
    }

    #[test]
    fn test_whole_field() {
        let text = "the quick brown fox jumps over the lazy dog";
        let mv = matches_for(text, &[(1, 1), (8, 8)]);
        let config = HighlightConfig::default().whole_field();
        assert_eq!(
            excerpts(text, &mv, &config),
            vec!["the <b>quick</b> brown fox jumps over the lazy <b>dog</b>"]
        );
    }

    #[test]
    fn test_excerpts_are_padded_and_trimmed_to_words() {
        let text = "aaa bbb ccc ddd eee fff ggg hhh iii jjj";
        let mv = matches_for(text, &[(4, 4)]);
        let config = HighlightConfig::default().excerpt_length(11).tags("[", "]");
        assert_eq!(excerpts(text, &mv, &config), vec!["...ddd [eee] fff..."]);
    }

    #[test]
    fn test_best_excerpts_in_text_order() {
        let text = "x1 hit x2 x3 x4 x5 x6 hit hit x7 x8 x9 hit";
        let mv = matches_for(text, &[(1, 1), (7, 7), (8, 8), (12, 12)]);
        let config = HighlightConfig::default()
            .excerpt_length(10)
            .num_excerpts(2)
            .tags("<", ">")
            .ellipsis("~");
        assert_eq!(excerpts(text, &mv, &config), vec!["x1 <hit> x2~", "~<hit> <hit>~"]);
    }

    #[test]
    fn test_excerpt_stops_before_next_excerpt() {
        let text = "a hit b c d e hit f";
        let mv = matches_for(text, &[(1, 1), (6, 6)]);
        let config = HighlightConfig::default().excerpt_length(12).tags("[", "]");
        assert_eq!(excerpts(text, &mv, &config), vec!["a [hit] b c d...", "...e [hit] f"]);
    }

    #[test]
    fn test_no_matches() {
        let config = HighlightConfig::default();
        assert!(excerpts("text", &MatchVector::new(), &config).is_empty());
        let mv = matches_for("a b", &[(0, 0)]);
        assert!(excerpts("a b", &mv, &config.num_excerpts(0)).is_empty());
    }
}
