//! Ranked full-text search over the FTS5 projection.

use super::snippet::extract_snippet;
use super::types::SearchResult;
use crate::config::{DocumentType, SearchConfig, StoreConfig};
use crate::error::{PromptdexError, Result};
use crate::store::{literal_terms, prepare_match_query, DocumentStore};
use rusqlite::Connection;
use std::time::Instant;
use tracing::{debug, warn};

/// Options for full-text search.
#[derive(Debug, Clone)]
pub struct FullTextOptions {
    /// Only return documents of this type.
    pub document_type: Option<DocumentType>,
    pub limit: usize,
    pub offset: usize,
    /// Surface malformed query syntax as [`PromptdexError::QuerySyntax`]
    /// instead of returning no results.
    pub strict: bool,
}

impl Default for FullTextOptions {
    fn default() -> Self {
        Self {
            document_type: None,
            limit: SearchConfig::DEFAULT_LIMIT,
            offset: 0,
            strict: false,
        }
    }
}

/// Search document content and frontmatter text.
///
/// Results are ordered by bm25 relevance; `score` is the negated rank so that
/// higher is better. Each hit carries a snippet anchored on the first literal
/// query term found in its content.
pub fn search_fulltext(
    store: &DocumentStore,
    query: &str,
    options: &FullTextOptions,
) -> Result<Vec<SearchResult>> {
    let match_query = prepare_match_query(query);
    if match_query.is_empty() || options.limit == 0 {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let rows = store.with_connection(|conn| {
        run_match(conn, &match_query, options).map_err(|e| classify_error(query, e.into()))
    });

    let rows = match rows {
        Ok(rows) => rows,
        Err(e @ PromptdexError::QuerySyntax { .. }) if !options.strict => {
            warn!("{}", e);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let terms = literal_terms(query);
    let results: Vec<SearchResult> = rows
        .into_iter()
        .map(|row| SearchResult {
            snippet: Some(extract_snippet(
                &row.content,
                &terms,
                SearchConfig::SNIPPET_LENGTH,
            )),
            path: row.path,
            document_type: DocumentType::from_str(&row.document_type).unwrap_or_default(),
            frontmatter: serde_json::from_str(&row.frontmatter)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default())),
            score: -row.rank,
        })
        .collect();

    debug!(
        "Full-text query {:?} returned {} results in {:?}",
        match_query,
        results.len(),
        start.elapsed()
    );
    Ok(results)
}

struct MatchRow {
    path: String,
    document_type: String,
    frontmatter: String,
    content: String,
    rank: f64,
}

fn run_match(
    conn: &Connection,
    match_query: &str,
    options: &FullTextOptions,
) -> rusqlite::Result<Vec<MatchRow>> {
    let table = StoreConfig::FTS_TABLE;

    let mut where_parts = vec![format!("{} MATCH ?", table)];
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(match_query.to_string())];

    if let Some(doc_type) = options.document_type {
        where_parts.push("d.document_type = ?".to_string());
        params_vec.push(Box::new(doc_type.as_str()));
    }
    params_vec.push(Box::new(i64::try_from(options.limit).unwrap_or(i64::MAX)));
    params_vec.push(Box::new(i64::try_from(options.offset).unwrap_or(i64::MAX)));

    let sql = format!(
        "SELECT d.path, d.document_type, d.frontmatter, d.content, {table}.rank \
         FROM {table} JOIN documents d ON d.path = {table}.path \
         WHERE {} ORDER BY {table}.rank, d.path LIMIT ? OFFSET ?",
        where_parts.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(MatchRow {
            path: row.get(0)?,
            document_type: row.get(1)?,
            frontmatter: row.get(2)?,
            content: row.get(3)?,
            rank: row.get(4)?,
        })
    })?;

    let mut matches = Vec::new();
    for row in rows {
        matches.push(row?);
    }
    Ok(matches)
}

/// FTS5 reports bad MATCH input as a generic SQLite error; pick those out.
fn classify_error(query: &str, err: PromptdexError) -> PromptdexError {
    if let PromptdexError::Database {
        source: Some(rusqlite::Error::SqliteFailure(_, Some(message))),
        ..
    } = &err
    {
        let lower = message.to_lowercase();
        if ["fts5", "syntax error", "unterminated", "no such column", "unknown special query"]
            .iter()
            .any(|marker| lower.contains(marker))
        {
            return PromptdexError::QuerySyntax {
                query: query.to_string(),
                message: message.clone(),
            };
        }
    }
    err
}
