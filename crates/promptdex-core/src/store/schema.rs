//! Versioned schema for the document index.
//!
//! The applied version lives in the `schema_version` marker table. Migrations
//! are applied in order, all inside a single transaction, so a database is
//! either at its previous version or fully at [`StoreConfig::SCHEMA_VERSION`].

use super::fts5::{FTS5Config, FTS5Manager};
use crate::config::StoreConfig;
use crate::error::{PromptdexError, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

/// Base tables for schema version 1.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    path TEXT PRIMARY KEY,
    document_type TEXT NOT NULL,
    frontmatter TEXT NOT NULL DEFAULT '{}',
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    modified_at TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(document_type);

-- to_path may name a file outside the indexed set (external dependency)
CREATE TABLE IF NOT EXISTS dependency_edges (
    id INTEGER PRIMARY KEY,
    from_path TEXT NOT NULL REFERENCES documents(path) ON DELETE CASCADE,
    to_path TEXT NOT NULL,
    import_kind TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    raw_text TEXT NOT NULL,
    UNIQUE (from_path, to_path, import_kind)
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON dependency_edges(from_path);
CREATE INDEX IF NOT EXISTS idx_edges_to ON dependency_edges(to_path);
"#;

/// Read the applied schema version; 0 when the marker table is absent or empty.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let has_marker: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;
    if has_marker == 0 {
        return Ok(0);
    }

    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0) as u32)
}

/// Bring the schema to the current version.
///
/// A no-op when already current. Returns the number of migrations applied.
pub fn initialize_schema(conn: &mut Connection) -> Result<usize> {
    let current = schema_version(conn)?;
    let target = StoreConfig::SCHEMA_VERSION;

    if current == target {
        debug!("Schema already at version {}", current);
        return Ok(0);
    }
    if current > target {
        return Err(PromptdexError::SchemaVersion {
            found: current,
            supported: target,
        });
    }

    let tx = conn.transaction()?;
    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let mut applied = 0;
    for version in (current + 1)..=target {
        apply_migration(&tx, version)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, chrono::Utc::now().to_rfc3339()],
        )?;
        applied += 1;
    }
    tx.commit()?;

    info!(
        "Migrated index schema from version {} to {}",
        current, target
    );
    Ok(applied)
}

fn apply_migration(tx: &Transaction<'_>, version: u32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(SCHEMA_V1)?;
            let fts_config = FTS5Config::default();
            FTS5Manager::new(&fts_config).ensure_setup(tx)?;
            Ok(())
        }
        other => Err(PromptdexError::Other(format!(
            "No migration defined for schema version {}",
            other
        ))),
    }
}
