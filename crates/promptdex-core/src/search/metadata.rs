//! Field-filtered search over document metadata.
//!
//! Filter keys are validated against a strict character set before any SQL
//! is assembled. JSON paths and values are always bound as parameters.

use super::types::SearchResult;
use crate::config::{DocumentType, SearchConfig};
use crate::error::{PromptdexError, Result};
use crate::store::DocumentStore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static FIELD_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").unwrap());

const FRONTMATTER_PREFIX: &str = "frontmatter.";
const TYPE_KEY: &str = "type";
const PATH_KEY: &str = "path";

/// Conjunctive filter: every entry must hold for a document to match.
///
/// Keys are `type`, `path` (prefix match), or `frontmatter.<dotted.path>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter(BTreeMap<String, Value>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, replacing any previous one on the same key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Check every key and value without touching the database.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.0 {
            validate_field_path(key)?;
            classify_key(key)?;
            validate_value(key, value)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Value)> for MetadataFilter {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Structured filters plus free-text terms, parsed from a single query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataQuery {
    pub filter: MetadataFilter,
    /// Case-insensitive substrings matched against frontmatter values and the path.
    pub terms: Vec<String>,
}

impl MetadataQuery {
    /// Split `query` into `key=value` filters and free text.
    ///
    /// Tokens whose key is not a valid field path are treated as text. Bare
    /// keys other than `type` and `path` address frontmatter fields. Values
    /// that read as booleans or numbers are typed accordingly.
    pub fn parse(query: &str) -> Self {
        let mut parsed = MetadataQuery::default();

        for token in query.split_whitespace() {
            let Some((key, raw_value)) = token.split_once('=') else {
                parsed.terms.push(token.to_string());
                continue;
            };
            if raw_value.is_empty() || validate_field_path(key).is_err() {
                parsed.terms.push(token.to_string());
                continue;
            }

            let key = if key == TYPE_KEY || key == PATH_KEY || key.starts_with(FRONTMATTER_PREFIX) {
                key.to_string()
            } else {
                format!("{}{}", FRONTMATTER_PREFIX, key)
            };
            if key == TYPE_KEY && DocumentType::from_str(raw_value).is_none() {
                parsed.terms.push(token.to_string());
                continue;
            }

            parsed.filter.insert(key, parse_scalar(raw_value));
        }

        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.terms.is_empty()
    }
}

fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

/// Paging for metadata search.
#[derive(Debug, Clone)]
pub struct MetadataOptions {
    pub limit: usize,
    pub offset: usize,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            limit: SearchConfig::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Reject any field path outside `[A-Za-z0-9_.]` or with empty segments.
pub fn validate_field_path(key: &str) -> Result<()> {
    if !FIELD_PATH.is_match(key) {
        return Err(PromptdexError::validation(
            key,
            "field path may only contain letters, digits, '_' and '.'",
        ));
    }
    if key.split('.').any(str::is_empty) {
        return Err(PromptdexError::validation(
            key,
            "field path has an empty segment",
        ));
    }
    Ok(())
}

enum FieldKind<'a> {
    Type,
    PathPrefix,
    /// Dotted path inside the frontmatter object.
    Frontmatter(&'a str),
}

fn classify_key(key: &str) -> Result<FieldKind<'_>> {
    match key {
        TYPE_KEY => Ok(FieldKind::Type),
        PATH_KEY => Ok(FieldKind::PathPrefix),
        _ => key
            .strip_prefix(FRONTMATTER_PREFIX)
            .map(FieldKind::Frontmatter)
            .ok_or_else(|| {
                PromptdexError::validation(
                    key,
                    "unknown filter key; use 'type', 'path' or 'frontmatter.<field>'",
                )
            }),
    }
}

fn validate_value(key: &str, value: &Value) -> Result<()> {
    match classify_key(key)? {
        FieldKind::Type => {
            let names: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for name in names {
                let valid = name
                    .as_str()
                    .and_then(DocumentType::from_str)
                    .is_some();
                if !valid {
                    return Err(PromptdexError::validation(
                        key,
                        format!("unknown document type {}", name),
                    ));
                }
            }
            Ok(())
        }
        FieldKind::PathPrefix => match value {
            Value::String(_) => Ok(()),
            _ => Err(PromptdexError::validation(key, "path filter must be a string")),
        },
        FieldKind::Frontmatter(_) => match value {
            Value::Object(_) => Err(PromptdexError::validation(
                key,
                "object values are not supported",
            )),
            Value::Array(items)
                if items
                    .iter()
                    .any(|v| matches!(v, Value::Array(_) | Value::Object(_) | Value::Null)) =>
            {
                Err(PromptdexError::validation(
                    key,
                    "array values may only contain scalars",
                ))
            }
            _ => Ok(()),
        },
    }
}

fn json_path(dotted: &str) -> String {
    format!("$.{}", dotted)
}

/// Scalar as an SQL parameter comparable with `json_extract` / `json_each.value`.
fn scalar_param(value: &Value) -> Box<dyn rusqlite::ToSql> {
    match value {
        Value::Bool(b) => Box::new(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translate a validated query into WHERE fragments and their parameters.
fn build_where(query: &MetadataQuery) -> Result<(Vec<String>, Vec<Box<dyn rusqlite::ToSql>>)> {
    let mut where_parts: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    for (key, value) in query.filter.iter() {
        match classify_key(key)? {
            FieldKind::Type => {
                let names: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                let placeholders = vec!["?"; names.len()].join(", ");
                where_parts.push(format!("d.document_type IN ({})", placeholders));
                for name in names {
                    params_vec.push(scalar_param(name));
                }
            }
            FieldKind::PathPrefix => {
                where_parts.push("d.path LIKE ? ESCAPE '\\'".to_string());
                let prefix = value.as_str().unwrap_or_default();
                params_vec.push(Box::new(format!("{}%", escape_like(prefix))));
            }
            FieldKind::Frontmatter(dotted) => {
                let path = json_path(dotted);
                match value {
                    Value::Null => {
                        where_parts.push(
                            "COALESCE(json_type(d.frontmatter, ?), 'null') = 'null'".to_string(),
                        );
                        params_vec.push(Box::new(path));
                    }
                    Value::Bool(b) => {
                        where_parts.push("json_type(d.frontmatter, ?) = ?".to_string());
                        params_vec.push(Box::new(path));
                        params_vec.push(Box::new(if *b { "true" } else { "false" }));
                    }
                    Value::Array(items) => {
                        for item in items {
                            where_parts.push(
                                "EXISTS (SELECT 1 FROM json_each(d.frontmatter, ?) \
                                 WHERE json_each.value = ?)"
                                    .to_string(),
                            );
                            params_vec.push(Box::new(path.clone()));
                            params_vec.push(scalar_param(item));
                        }
                    }
                    scalar => {
                        // Equality on scalars, membership on arrays
                        where_parts.push(
                            "(CASE json_type(d.frontmatter, ?) \
                               WHEN 'array' THEN EXISTS (SELECT 1 FROM json_each(d.frontmatter, ?) \
                                                         WHERE json_each.value = ?) \
                               ELSE json_extract(d.frontmatter, ?) = ? END)"
                                .to_string(),
                        );
                        params_vec.push(Box::new(path.clone()));
                        params_vec.push(Box::new(path.clone()));
                        params_vec.push(scalar_param(scalar));
                        params_vec.push(Box::new(path));
                        params_vec.push(scalar_param(scalar));
                    }
                }
            }
        }
    }

    for term in &query.terms {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        where_parts.push(
            "(LOWER(d.path) LIKE ? ESCAPE '\\' \
              OR EXISTS (SELECT 1 FROM json_tree(d.frontmatter) \
                         WHERE json_tree.atom IS NOT NULL \
                           AND LOWER(json_tree.atom) LIKE ? ESCAPE '\\'))"
                .to_string(),
        );
        params_vec.push(Box::new(pattern.clone()));
        params_vec.push(Box::new(pattern));
    }

    Ok((where_parts, params_vec))
}

/// Documents matching every condition in `filter`, ordered by path.
///
/// An empty filter matches every document.
pub fn search_metadata(
    store: &DocumentStore,
    filter: &MetadataFilter,
    options: &MetadataOptions,
) -> Result<Vec<SearchResult>> {
    let query = MetadataQuery {
        filter: filter.clone(),
        terms: Vec::new(),
    };
    search_metadata_query(store, &query, options)
}

/// Like [`search_metadata`] with additional free-text terms.
pub fn search_metadata_query(
    store: &DocumentStore,
    query: &MetadataQuery,
    options: &MetadataOptions,
) -> Result<Vec<SearchResult>> {
    query.filter.validate()?;
    if options.limit == 0 {
        return Ok(Vec::new());
    }

    let (where_parts, mut params_vec) = build_where(query)?;
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_parts.join(" AND "))
    };
    params_vec.push(Box::new(i64::try_from(options.limit).unwrap_or(i64::MAX)));
    params_vec.push(Box::new(i64::try_from(options.offset).unwrap_or(i64::MAX)));

    let sql = format!(
        "SELECT d.path, d.document_type, d.frontmatter FROM documents d {} \
         ORDER BY d.path LIMIT ? OFFSET ?",
        where_clause
    );

    let results = store.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            let document_type: String = row.get(1)?;
            let frontmatter: String = row.get(2)?;
            Ok(SearchResult {
                path: row.get(0)?,
                document_type: DocumentType::from_str(&document_type).unwrap_or_default(),
                frontmatter: serde_json::from_str(&frontmatter)
                    .unwrap_or_else(|_| Value::Object(Default::default())),
                snippet: None,
                score: 1.0,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    })?;

    debug!(
        "Metadata search with {} filters and {} terms returned {} results",
        query.filter.len(),
        query.terms.len(),
        results.len()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentRecord;
    use serde_json::json;

    fn seed(store: &DocumentStore, path: &str, doc_type: DocumentType, frontmatter: Value) {
        store
            .upsert_document(&DocumentRecord {
                path: path.to_string(),
                document_type: doc_type,
                frontmatter,
                content: String::new(),
                content_hash: crate::indexer::compute_file_hash(path.as_bytes()),
                file_size: 0,
                modified_at: "2024-01-01T00:00:00Z".to_string(),
                indexed_at: "2024-01-01T00:00:00Z".to_string(),
            })
            .unwrap();
    }

    fn fixture() -> DocumentStore {
        let store = DocumentStore::open_in_memory().unwrap();
        seed(
            &store,
            "rules/auth.md",
            DocumentType::Rule,
            json!({"title": "Auth", "tags": ["security", "login"], "alwaysApply": true, "priority": 1}),
        );
        seed(
            &store,
            "rules/style.md",
            DocumentType::Rule,
            json!({"title": "Style", "tags": ["lint"], "alwaysApply": false, "meta": {"owner": "web"}}),
        );
        seed(
            &store,
            "commands/deploy.md",
            DocumentType::Command,
            json!({"title": "Deploy", "tags": "security"}),
        );
        store
    }

    fn paths(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.path.as_str()).collect()
    }

    fn run(store: &DocumentStore, filter: MetadataFilter) -> Vec<String> {
        search_metadata(store, &filter, &MetadataOptions::default())
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect()
    }

    #[test]
    fn test_type_and_path_filters() {
        let store = fixture();
        assert_eq!(
            run(&store, MetadataFilter::new().with("type", "rule")),
            vec!["rules/auth.md", "rules/style.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("path", "commands/")),
            vec!["commands/deploy.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("type", json!(["command", "rule"]))).len(),
            3
        );
    }

    #[test]
    fn test_scalar_equality_and_array_membership() {
        let store = fixture();
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.title", "Style")),
            vec!["rules/style.md"]
        );
        // Array field contains, scalar field equals
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.tags", "security")),
            vec!["commands/deploy.md", "rules/auth.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.priority", 1)),
            vec!["rules/auth.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.meta.owner", "web")),
            vec!["rules/style.md"]
        );
    }

    #[test]
    fn test_boolean_null_and_array_values() {
        let store = fixture();
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.alwaysApply", true)),
            vec!["rules/auth.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.alwaysApply", false)),
            vec!["rules/style.md"]
        );
        assert_eq!(
            run(&store, MetadataFilter::new().with("frontmatter.alwaysApply", Value::Null)),
            vec!["commands/deploy.md"]
        );
        assert_eq!(
            run(
                &store,
                MetadataFilter::new().with("frontmatter.tags", json!(["security", "login"]))
            ),
            vec!["rules/auth.md"]
        );
    }

    #[test]
    fn test_conjunction() {
        let store = fixture();
        let filter = MetadataFilter::new()
            .with("type", "rule")
            .with("frontmatter.tags", "security");
        assert_eq!(run(&store, filter), vec!["rules/auth.md"]);
    }

    #[test]
    fn test_injection_is_rejected() {
        let store = fixture();
        for key in [
            "frontmatter.x'); --",
            "frontmatter.a b",
            "frontmatter.$[0]",
            "frontmatter..x",
            "frontmatter.",
        ] {
            let err = search_metadata(
                &store,
                &MetadataFilter::new().with(key, "v"),
                &MetadataOptions::default(),
            )
            .unwrap_err();
            match err {
                PromptdexError::Validation { field, .. } => assert_eq!(field, key),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_invalid_keys_and_values() {
        let store = fixture();
        for filter in [
            MetadataFilter::new().with("title", "Auth"),
            MetadataFilter::new().with("type", "novel"),
            MetadataFilter::new().with("path", 3),
            MetadataFilter::new().with("frontmatter.meta", json!({"owner": "web"})),
            MetadataFilter::new().with("frontmatter.tags", json!([["nested"]])),
        ] {
            let err = search_metadata(&store, &filter, &MetadataOptions::default()).unwrap_err();
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_query_parse() {
        let parsed = MetadataQuery::parse("type=rule alwaysApply=true priority=2 auth x'=1 a=");
        assert_eq!(
            parsed.filter,
            MetadataFilter::new()
                .with("type", "rule")
                .with("frontmatter.alwaysApply", true)
                .with("frontmatter.priority", 2)
        );
        assert_eq!(parsed.terms, vec!["auth", "x'=1", "a="]);
        assert!(MetadataQuery::parse("   ").is_empty());
    }

    #[test]
    fn test_free_text_terms() {
        let store = fixture();
        let query = MetadataQuery::parse("SECURITY");
        let results =
            search_metadata_query(&store, &query, &MetadataOptions::default()).unwrap();
        assert_eq!(paths(&results), vec!["commands/deploy.md", "rules/auth.md"]);

        let query = MetadataQuery::parse("deploy type=command");
        let results =
            search_metadata_query(&store, &query, &MetadataOptions::default()).unwrap();
        assert_eq!(paths(&results), vec!["commands/deploy.md"]);

        // LIKE wildcards are literal
        let results = search_metadata_query(
            &store,
            &MetadataQuery::parse("%"),
            &MetadataOptions::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }
}
