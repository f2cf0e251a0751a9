//! Command implementations for the quarry CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde_json::Value;

use crate::cli::args::{QuarryArgs, QueryCommand};
use crate::cli::output::{HitOutput, SearchOutput, format_json};
use crate::error::{QuarryError, Result};
use crate::index::document::Document;
use crate::index::{Index, IndexConfig};
use crate::query::fuzzy::{FuzzyConfig, FuzzyQuery};
use crate::query::prefix::PrefixQuery;
use crate::query::query::Query;
use crate::query::range::{RangeQuery, TypedRangeQuery};
use crate::query::term::TermQuery;
use crate::query::wildcard::WildcardQuery;
use crate::search::highlight::HighlightConfig;
use crate::search::searcher::SearchRequest;
use crate::search::sort::{Sort, SortType};

/// Execute a CLI invocation and print its result to stdout.
pub fn execute_command(args: QuarryArgs) -> Result<()> {
    let output = run_search(&args)?;
    println!("{}", format_json(&output, args.pretty)?);
    Ok(())
}

/// Load the documents, run the query and collect the printable result.
pub fn run_search(args: &QuarryArgs) -> Result<SearchOutput> {
    let config = match &args.config {
        Some(path) => IndexConfig::from_file(path)?,
        None => IndexConfig::default(),
    };
    let index = Index::new(config);
    let loaded = load_documents(&index, &args.documents)?;
    info!("loaded {loaded} documents from {}", args.documents.display());

    let field = args
        .field
        .clone()
        .unwrap_or_else(|| index.config().default_field.clone());
    let query = build_query(&args.command, &field)?;
    debug!("running {}", query.to_s(&field));

    let mut request = SearchRequest::new(Arc::clone(&query))
        .offset(args.offset)
        .limit(args.limit);
    if let Some(sort) = &args.sort {
        request = request.sort(parse_sort(sort, args.reverse)?);
    }

    let start = Instant::now();
    let top_docs = index.search(&request)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut highlight = HighlightConfig::default();
    if let Some([pre, post]) = args.tags.as_deref() {
        highlight = highlight.tags(pre.as_str(), post.as_str());
    }

    let mut hits = Vec::with_capacity(top_docs.hits.len());
    for hit in &top_docs.hits {
        let explanation = if args.explain {
            Some(index.explain(&query, hit.doc)?.to_s())
        } else {
            None
        };
        let highlights = if args.highlight {
            Some(index.highlight(&query, hit.doc, &field, &highlight)?)
        } else {
            None
        };
        hits.push(HitOutput {
            doc: hit.doc,
            score: hit.score,
            document: index.document(hit.doc)?,
            explanation,
            highlights,
        });
    }

    Ok(SearchOutput {
        query: query.to_s(&field),
        total_hits: top_docs.total_hits,
        max_score: top_docs.max_score,
        hits,
        duration_ms,
    })
}

/// Add every document of a JSON-lines file to `index`. Blank lines are skipped.
pub fn load_documents(index: &Index, path: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| QuarryError::invalid_argument(format!("line {}: {e}", number + 1)))?;
        index.add_document(Document::from_json(&value)?)?;
        count += 1;
    }
    Ok(count)
}

/// Build the query a subcommand describes.
pub fn build_query(command: &QueryCommand, field: &str) -> Result<Arc<dyn Query>> {
    let query: Arc<dyn Query> = match command {
        QueryCommand::Term { text } => Arc::new(TermQuery::new(field, text.as_str())),
        QueryCommand::Prefix { prefix } => Arc::new(PrefixQuery::new(field, prefix.as_str())),
        QueryCommand::Wildcard { pattern } => Arc::new(WildcardQuery::new(field, pattern.as_str())?),
        QueryCommand::Fuzzy {
            text,
            min_similarity,
            prefix_length,
        } => {
            let config = FuzzyConfig::default()
                .min_similarity(*min_similarity)
                .prefix_length(*prefix_length);
            Arc::new(FuzzyQuery::with_config(field, text.as_str(), config)?)
        }
        QueryCommand::Range {
            lower,
            upper,
            exclude_lower,
            exclude_upper,
            typed,
        } => {
            let lower = lower.as_deref();
            let upper = upper.as_deref();
            let include_lower = lower.is_some() && !exclude_lower;
            let include_upper = upper.is_some() && !exclude_upper;
            if *typed {
                Arc::new(TypedRangeQuery::new(field, lower, upper, include_lower, include_upper)?)
            } else {
                Arc::new(RangeQuery::new(field, lower, upper, include_lower, include_upper)?)
            }
        }
    };
    Ok(query)
}

/// Parse `FIELD` or `FIELD:TYPE` into a sort. A bare field sorts by its
/// automatically detected type; `score` and `doc` need no field.
pub fn parse_sort(value: &str, reverse: bool) -> Result<Sort> {
    let (field, sort_type) = match value.split_once(':') {
        Some((field, name)) => (field, SortType::from_str(name)?),
        None => match SortType::from_str(value) {
            Ok(sort_type @ (SortType::Score | SortType::Doc)) => ("", sort_type),
            _ => (value, SortType::Auto),
        },
    };
    Sort::by_field(field, sort_type, reverse)
}
