//! Result rendering: compact listings or JSON.

use anyhow::Result;
use promptdex_core::{
    FanOutResult, IncrementalResult, IndexResult, RelatedFile, SearchResult, StoreStats,
};
use serde::Serialize;
use std::collections::BTreeMap;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_errors(errors: &[String]) {
    for error in errors {
        println!("  error: {}", error);
    }
}

pub(crate) fn index_result(result: &IndexResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    println!("indexed {} files ({} errors)", result.indexed, result.errors.len());
    print_errors(&result.errors);
    Ok(())
}

pub(crate) fn incremental_result(result: &IncrementalResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    println!(
        "updated {}, deleted {}, unchanged {} ({} errors)",
        result.updated,
        result.deleted,
        result.unchanged,
        result.errors.len()
    );
    print_errors(&result.errors);
    Ok(())
}

pub(crate) fn fanout_results(results: &[FanOutResult], json: bool) -> Result<()> {
    if json {
        return print_json(results);
    }
    if results.is_empty() {
        println!("no results");
    }
    for hit in results {
        let strategies: Vec<&str> = hit.matched_strategies.iter().map(|s| s.as_str()).collect();
        println!(
            "{:>7.3}  {:<10} {}  [{}]",
            hit.relevance_score,
            hit.result.document_type.as_str(),
            hit.result.path,
            strategies.join(", ")
        );
        if let Some(snippet) = &hit.result.snippet {
            println!("         {}", snippet);
        }
    }
    Ok(())
}

pub(crate) fn search_results(results: &[SearchResult], json: bool) -> Result<()> {
    if json {
        return print_json(results);
    }
    if results.is_empty() {
        println!("no results");
    }
    for hit in results {
        println!("{:>7.3}  {:<10} {}", hit.score, hit.document_type.as_str(), hit.path);
        if let Some(snippet) = &hit.snippet {
            println!("         {}", snippet);
        }
    }
    Ok(())
}

pub(crate) fn related_files(files: &[RelatedFile], json: bool) -> Result<()> {
    if json {
        return print_json(files);
    }
    for file in files {
        let arrow = match file.direction {
            promptdex_core::Direction::Reverse => "<-",
            _ => "->",
        };
        println!("{} {} {}", arrow, file.depth, file.path);
    }
    Ok(())
}

pub(crate) fn paths(paths: &[String], json: bool) -> Result<()> {
    if json {
        return print_json(paths);
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

pub(crate) fn graph(adjacency: &BTreeMap<String, Vec<String>>, json: bool) -> Result<()> {
    if json {
        return print_json(adjacency);
    }
    for (path, neighbors) in adjacency {
        if neighbors.is_empty() {
            println!("{}", path);
        } else {
            println!("{} -> {}", path, neighbors.join(", "));
        }
    }
    Ok(())
}

pub(crate) fn stats(stats: &StoreStats, json: bool) -> Result<()> {
    if json {
        return print_json(stats);
    }
    println!("documents:      {}", stats.documents);
    for (doc_type, count) in &stats.by_type {
        println!("  {:<12} {}", doc_type, count);
    }
    println!("edges:          {}", stats.edges);
    println!("external edges: {}", stats.external_edges);
    println!("fts rows:       {}", stats.fts_rows);
    println!("schema version: {}", stats.schema_version);
    Ok(())
}
