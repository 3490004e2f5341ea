//! FTS5 query building utilities.

use regex::Regex;
use std::sync::LazyLock;

/// Characters that force a term to be quoted in FTS5 queries.
static FTS5_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\p{L}\p{N}]"#).unwrap());

/// Markers of hand-written FTS5 syntax. A colon only counts as a column
/// filter on a searchable column.
static FTS5_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["()*^]|\b(AND|OR|NOT|NEAR)\b|(?i:\b(frontmatter|content)\s*:)"#).unwrap()
});

const OPERATORS: &[&str] = &["AND", "OR", "NOT", "NEAR"];

/// Searchable FTS5 columns.
const COLUMNS: &[&str] = &["frontmatter", "content"];

/// Escape a term for FTS5 queries.
///
/// Terms containing anything other than letters and digits are wrapped in quotes.
pub fn escape_fts5_term(term: &str) -> String {
    if FTS5_SPECIAL_CHARS.is_match(term) {
        let escaped = term.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        term.to_string()
    }
}

/// True when the input already uses FTS5 query syntax.
pub fn is_advanced_query(query: &str) -> bool {
    FTS5_SYNTAX.is_match(query)
}

/// Build an FTS5 MATCH expression from user input.
///
/// Plain input becomes prefix terms joined with implicit AND:
/// - "jwt tokens" → `jwt* tokens*`
/// - "user-login" → `"user-login"*`
///
/// Input that already uses FTS5 syntax is passed through unchanged, so it may
/// be rejected by SQLite; callers decide how strictly to treat that.
pub fn prepare_match_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if is_advanced_query(trimmed) {
        return trimmed.to_string();
    }

    trimmed
        .to_lowercase()
        .split_whitespace()
        .map(escape_fts5_term)
        .filter(|t| !t.is_empty())
        .map(|t| format!("{}*", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Literal words of a query, with operators and FTS5 punctuation removed.
///
/// Used to locate snippet anchors in document content.
pub fn literal_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || matches!(c, '"' | '(' | ')' | '*' | '^'))
        .filter(|t| !t.is_empty())
        .filter(|t| !OPERATORS.contains(t))
        .map(|t| match t.split_once(':') {
            Some((column, rest)) if COLUMNS.contains(&column.to_ascii_lowercase().as_str()) => rest,
            _ => t.trim_matches(':'),
        })
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
