//! Integration tests for match vectors and highlighted excerpts.

use std::sync::Arc;

use quarry::index::analysis::AnalyzerKind;
use quarry::prelude::*;

fn reader_of(texts: &[&str]) -> MemoryIndexReader {
    let mut index = MemoryIndex::default();
    for text in texts {
        index.add_document(Document::builder().add_field("body", *text).build());
    }
    index.reader()
}

#[test]
fn test_prefix_highlight_keeps_original_case() -> Result<()> {
    let index = Index::new(IndexConfig::default().analyzer(AnalyzerKind::Standard));
    let doc = index.add_document(
        Document::builder()
            .add_field("body", "The Quick brown fox. The lazy dog.")
            .build(),
    )?;
    let query: Arc<dyn Query> = Arc::new(PrefixQuery::new("body", "qu"));
    let excerpts = index.highlight(&query, doc, "body", &HighlightConfig::default().whole_field())?;
    assert_eq!(excerpts, vec!["The <b>Quick</b> brown fox. The lazy dog."]);
    Ok(())
}

#[test]
fn test_prohibited_clauses_are_not_highlighted() -> Result<()> {
    let reader = reader_of(&["fox and cat"]);
    let searcher = Searcher::new(&reader);
    let fox: Arc<dyn Query> = Arc::new(TermQuery::new("body", "fox"));
    let cat: Arc<dyn Query> = Arc::new(TermQuery::new("body", "cat"));
    let query: Arc<dyn Query> = Arc::new(BooleanQuery::builder().should(fox).must_not(cat).build()?);
    let config = HighlightConfig::default();
    assert_eq!(searcher.highlight(&query, 0, "body", &config)?, vec!["<b>fox</b> and cat"]);
    Ok(())
}

#[test]
fn test_range_highlight_over_multi_valued_field() -> Result<()> {
    let mut index = MemoryIndex::default();
    index.add_document(
        Document::builder()
            .add_field("tags", "apple")
            .add_field("tags", "banana")
            .add_field("tags", "cherry")
            .build(),
    );
    let reader = index.reader();
    let searcher = Searcher::new(&reader);
    let query: Arc<dyn Query> = Arc::new(RangeQuery::new("tags", Some("b"), Some("c"), true, false)?);

    let matches = searcher.match_vector(&query, 0, "tags")?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches.matches()[0].start, 1);

    let config = HighlightConfig::default().tags("[", "]");
    assert_eq!(searcher.highlight(&query, 0, "tags", &config)?, vec!["apple [banana] cherry"]);
    Ok(())
}

#[test]
fn test_sloppy_phrase_and_filtered_query() -> Result<()> {
    let reader = reader_of(&["red big apple and red pear"]);
    let searcher = Searcher::new(&reader);
    let config = HighlightConfig::default().whole_field();

    let sloppy: Arc<dyn Query> = Arc::new(PhraseQuery::from_phrase("body", "red apple").with_slop(1));
    assert_eq!(
        searcher.highlight(&sloppy, 0, "body", &config)?,
        vec!["<b>red</b> big <b>apple</b> and <b>red</b> pear"]
    );

    let exact: Arc<dyn Query> = Arc::new(PhraseQuery::from_phrase("body", "red pear"));
    let filtered: Arc<dyn Query> = Arc::new(FilteredQuery::new(exact, Arc::new(BitVectorFilter::from_iter([0usize]))));
    assert_eq!(
        searcher.highlight(&filtered, 0, "body", &config)?,
        vec!["red big apple and <b>red pear</b>"]
    );
    Ok(())
}

#[test]
fn test_excerpt_is_cut_around_match() -> Result<()> {
    let reader = reader_of(&["one two three four five six seven eight nine ten"]);
    let searcher = Searcher::new(&reader);
    let query: Arc<dyn Query> = Arc::new(TermQuery::new("body", "five"));
    let config = HighlightConfig::default()
        .excerpt_length(15)
        .num_excerpts(1)
        .tags("[", "]")
        .ellipsis("…");
    assert_eq!(searcher.highlight(&query, 0, "body", &config)?, vec!["…four [five] six…"]);
    Ok(())
}
