//! Criterion benchmarks for quarry.
//!
//! Covers the hot paths of query execution:
//! - Term and boolean scoring
//! - Multi-term expansion (prefix, wildcard, fuzzy)
//! - Filter evaluation with and without the reader cache
//! - Sorted collection

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use quarry::index::document::Document;
use quarry::index::memory::{MemoryIndex, MemoryIndexReader};
use quarry::index::reader::IndexReader;
use quarry::query::boolean::BooleanQuery;
use quarry::query::fuzzy::FuzzyQuery;
use quarry::query::prefix::PrefixQuery;
use quarry::query::query::Query;
use quarry::query::range::RangeFilter;
use quarry::query::term::TermQuery;
use quarry::query::wildcard::WildcardQuery;
use quarry::search::filter::Filter;
use quarry::search::searcher::{SearchRequest, Searcher};
use quarry::search::sort::{Sort, SortType};

/// Generate a reader over `count` pseudo-random documents.
fn generate_reader(count: usize) -> MemoryIndexReader {
    let words = [
        "search", "engine", "full", "text", "index", "query", "document", "field", "term", "phrase",
        "boolean", "similarity", "relevance", "score", "analysis", "token", "stemming", "filter",
        "ranking", "retrieval", "searcher", "searching", "indexer", "scorer",
    ];

    let mut index = MemoryIndex::default();
    for i in 0..count {
        let doc_length = 20 + (i % 50); // Variable length documents
        let body: Vec<&str> = (0..doc_length)
            .map(|j| words[(i * 7 + j * 13) % words.len()])
            .collect();
        let doc = Document::builder()
            .add_field("body", body.join(" "))
            .add_field("id", format!("{i:06}"))
            .add_field("rank", ((i * 31) % 1000).to_string())
            .build();
        index.add_document(doc);
    }
    index.reader()
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let reader = generate_reader(5000);
    let searcher = Searcher::new(&reader);

    let term: Arc<dyn Query> = Arc::new(TermQuery::new("body", "search"));
    group.throughput(Throughput::Elements(reader.max_doc()));
    group.bench_function("term_query", |b| {
        let request = SearchRequest::new(Arc::clone(&term));
        b.iter(|| black_box(searcher.search(black_box(&request)).unwrap()))
    });

    let boolean: Arc<dyn Query> = Arc::new(
        BooleanQuery::builder()
            .must(Arc::new(TermQuery::new("body", "search")))
            .should(Arc::new(TermQuery::new("body", "ranking")))
            .must_not(Arc::new(TermQuery::new("body", "token")))
            .build()
            .unwrap(),
    );
    group.bench_function("boolean_query", |b| {
        let request = SearchRequest::new(Arc::clone(&boolean));
        b.iter(|| black_box(searcher.search(black_box(&request)).unwrap()))
    });

    group.finish();
}

fn bench_multi_term(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_term");
    group.sample_size(30);
    let reader = generate_reader(5000);
    let searcher = Searcher::new(&reader);

    let queries: Vec<(&str, Arc<dyn Query>)> = vec![
        ("prefix", Arc::new(PrefixQuery::new("body", "search"))),
        ("wildcard", Arc::new(WildcardQuery::new("body", "s*r?").unwrap())),
        ("fuzzy", Arc::new(FuzzyQuery::new("body", "serch"))),
    ];
    for (name, query) in queries {
        group.bench_function(name, |b| {
            let request = SearchRequest::new(Arc::clone(&query));
            b.iter(|| black_box(searcher.search(black_box(&request)).unwrap()))
        });
    }

    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");
    let reader = generate_reader(5000);
    let filter = RangeFilter::new("id", Some("001000"), Some("002000"), true, false).unwrap();

    group.bench_function("range_filter_uncached", |b| {
        b.iter(|| black_box(filter.compute_bitvector(black_box(&reader)).unwrap()))
    });

    let term: Arc<dyn Query> = Arc::new(TermQuery::new("body", "query"));
    let filter: Arc<dyn Filter> = Arc::new(filter);
    let searcher = Searcher::new(&reader);
    group.bench_function("filtered_search_cached", |b| {
        let request = SearchRequest::new(Arc::clone(&term)).filter(Arc::clone(&filter));
        b.iter(|| black_box(searcher.search(black_box(&request)).unwrap()))
    });

    group.finish();
}

fn bench_sorting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorting");
    let reader = generate_reader(5000);
    let searcher = Searcher::new(&reader);
    let term: Arc<dyn Query> = Arc::new(TermQuery::new("body", "index"));

    for (name, sort_type) in [("integer", SortType::Integer), ("string", SortType::String)] {
        let sort = Sort::by_field("rank", sort_type, false).unwrap();
        group.bench_function(name, |b| {
            let request = SearchRequest::new(Arc::clone(&term)).sort(sort.clone()).limit(50);
            b.iter(|| black_box(searcher.search(black_box(&request)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scoring, bench_multi_term, bench_filters, bench_sorting);
criterion_main!(benches);
