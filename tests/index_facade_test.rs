//! Integration tests for the `Index` facade.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use quarry::index::analysis::AnalyzerKind;
use quarry::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn test_index_from_config_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(file, r#"{{"default_field": "title", "analyzer": "standard", "key": "sku"}}"#)?;
    let config = IndexConfig::from_file(file.path())?;
    assert_eq!(config.analyzer, AnalyzerKind::Standard);

    let index = Index::new(config);
    let json = serde_json::json!({"sku": "a1", "title": "The Rust Book", "price": 39});
    index.add_document(Document::from_json(&json)?)?;
    let json = serde_json::json!({"sku": "b2", "title": "Rust in Action", "price": 45});
    index.add_document(Document::from_json(&json)?)?;

    let query: Arc<dyn Query> = Arc::new(TermQuery::new("title", "rust"));
    let top = index.search(&SearchRequest::new(Arc::clone(&query)))?;
    assert_eq!(top.total_hits, 2);

    // same key replaces the first document
    let json = serde_json::json!({"sku": "a1", "title": "The Go Book"});
    let replacement = index.add_document(Document::from_json(&json)?)?;
    assert_eq!(index.size(), 2);
    assert!(index.has_deletions());
    let top = index.search(&SearchRequest::new(query))?;
    assert_eq!(top.docs(), vec![1]);
    assert_eq!(index.document(replacement)?.get("title"), Some("The Go Book"));
    Ok(())
}

#[test]
fn test_index_delete_and_explain() -> Result<()> {
    let index = Index::default();
    for body in ["alpha beta", "beta gamma", "gamma alpha"] {
        index.add_document(Document::builder().add_field("body", body).build())?;
    }
    let query: Arc<dyn Query> = Arc::new(TermQuery::new("body", "alpha"));
    let top = index.search(&SearchRequest::new(Arc::clone(&query)))?;
    assert_eq!(top.docs(), vec![0, 2]);
    let explanation = index.explain(&query, 2)?;
    assert!((explanation.score() - top.hits[1].score).abs() < 1e-6);

    assert_eq!(index.delete_by_term("body", "gamma")?, 2);
    assert!(index.is_deleted(2));
    let top = index.search(&SearchRequest::new(query))?;
    assert_eq!(top.docs(), vec![0]);
    assert!(index.document(7).is_err());
    Ok(())
}

#[test]
fn test_index_is_shared_across_threads() -> Result<()> {
    let index = Arc::new(Index::default());
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let index = Arc::clone(&index);
            thread::spawn(move || -> Result<()> {
                for i in 0..25 {
                    let doc = Document::builder()
                        .add_field("body", format!("common thread{t} item{i}"))
                        .build();
                    index.add_document(doc)?;
                }
                Ok(())
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread panicked")?;
    }

    let query: Arc<dyn Query> = Arc::new(TermQuery::new("body", "common"));
    let top = index.search(&SearchRequest::new(query).all())?;
    assert_eq!(top.total_hits, 100);
    assert_eq!(index.size(), 100);
    Ok(())
}
