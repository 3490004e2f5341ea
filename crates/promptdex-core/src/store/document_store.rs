//! SQLite document store: documents, their FTS5 projection, and dependency edges.

use crate::config::{DocumentType, StoreConfig};
use crate::{PromptdexError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::fts5::{FTS5Config, FTS5Manager};
use super::schema;

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Repo-relative path with `/` separators.
    pub path: String,
    pub document_type: DocumentType,
    /// Always a JSON object; empty when the file has no frontmatter.
    pub frontmatter: serde_json::Value,
    /// Body with the frontmatter block stripped.
    pub content: String,
    pub content_hash: String,
    pub file_size: u64,
    pub modified_at: String,
    pub indexed_at: String,
}

/// A directed reference from one document to another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from_path: String,
    /// Resolved repo-relative path, or the raw specifier when unresolved.
    pub to_path: String,
    pub import_kind: String,
    pub line_number: usize,
    pub raw_text: String,
}

/// Row counts for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub documents: usize,
    pub by_type: BTreeMap<String, usize>,
    pub edges: usize,
    /// Edges whose target is not an indexed document.
    pub external_edges: usize,
    pub fts_rows: usize,
    pub schema_version: u32,
}

const DOCUMENT_COLUMNS: &str = "path, document_type, frontmatter, content, content_hash, \
                                file_size, modified_at, indexed_at";

/// Handle to the on-disk (or in-memory) index.
///
/// All access goes through one connection behind a mutex, which gives the
/// single-writer discipline: two upserts can never interleave.
pub struct DocumentStore {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
    fts5_config: FTS5Config,
}

impl DocumentStore {
    /// Create or open a store at the given path.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| PromptdexError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn, Some(db_path))
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        Self::configure_connection(&conn)?;
        schema::initialize_schema(&mut conn)?;

        let store = Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            fts5_config: FTS5Config::default(),
        };

        // Repairs a database whose triggers were dropped out-of-band
        store.ensure_fts5()?;

        Ok(store)
    }

    /// Configure connection with optimal settings.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.busy_timeout(StoreConfig::BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;
        Ok(())
    }

    fn ensure_fts5(&self) -> Result<()> {
        let conn = self.lock()?;
        FTS5Manager::new(&self.fts5_config).ensure_setup(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PromptdexError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    /// Run a read-only closure against the connection.
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Get the database path; `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Re-run schema initialization. A no-op on a current schema.
    pub fn initialize_schema(&self) -> Result<usize> {
        let mut conn = self.lock()?;
        schema::initialize_schema(&mut conn)
    }

    /// Applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.lock()?;
        schema::schema_version(&conn)
    }

    // ========================================
    // Documents
    // ========================================

    /// Insert or update a document.
    ///
    /// Returns `false` when the stored row already has the same content hash
    /// and type; in that case nothing is written and the FTS row is untouched.
    pub fn upsert_document(&self, record: &DocumentRecord) -> Result<bool> {
        let conn = self.lock()?;

        let frontmatter_json = serde_json::to_string(&record.frontmatter)?;

        let rows = conn.execute(
            "INSERT INTO documents (path, document_type, frontmatter, content, content_hash,
                                    file_size, modified_at, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(path) DO UPDATE SET
                 document_type=excluded.document_type,
                 frontmatter=excluded.frontmatter,
                 content=excluded.content,
                 content_hash=excluded.content_hash,
                 file_size=excluded.file_size,
                 modified_at=excluded.modified_at,
                 indexed_at=excluded.indexed_at
             WHERE documents.content_hash <> excluded.content_hash
                OR documents.document_type <> excluded.document_type",
            params![
                record.path,
                record.document_type.as_str(),
                frontmatter_json,
                record.content,
                record.content_hash,
                record.file_size as i64,
                record.modified_at,
                record.indexed_at,
            ],
        )?;

        if rows > 0 {
            debug!("Upserted document: {}", record.path);
        }
        Ok(rows > 0)
    }

    /// Get a document by path.
    pub fn get_document(&self, path: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE path = ?1", DOCUMENT_COLUMNS),
                params![path],
                Self::row_to_record,
            )
            .optional()?;

        Ok(result)
    }

    /// Delete a document; its FTS row and outgoing edges go with it.
    pub fn delete_document(&self, path: &str) -> Result<bool> {
        let conn = self.lock()?;

        let rows_affected = conn.execute("DELETE FROM documents WHERE path = ?1", params![path])?;

        if rows_affected > 0 {
            debug!("Deleted document: {}", path);
        }

        Ok(rows_affected > 0)
    }

    /// Stored content hash for every document, keyed by path.
    pub fn document_hashes(&self) -> Result<HashMap<String, String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT path, content_hash FROM documents")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut hashes = HashMap::new();
        for row in rows {
            let (path, hash): (String, String) = row?;
            hashes.insert(path, hash);
        }
        Ok(hashes)
    }

    /// All document paths, sorted.
    pub fn all_paths(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT path FROM documents ORDER BY path")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    /// All documents, sorted by path.
    pub fn all_documents(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents ORDER BY path",
            DOCUMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut documents = Vec::new();
        for row in rows {
            match row {
                Ok(record) => documents.push(record),
                Err(e) => warn!("Error reading document row: {}", e),
            }
        }
        Ok(documents)
    }

    /// Get the count of documents.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Convert a row selected with `DOCUMENT_COLUMNS` into a record.
    pub(crate) fn row_to_record(row: &Row) -> rusqlite::Result<DocumentRecord> {
        let document_type: String = row.get(1)?;
        let frontmatter_json: String = row.get(2)?;
        let file_size: i64 = row.get(5)?;

        let frontmatter: serde_json::Value = serde_json::from_str(&frontmatter_json)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));

        Ok(DocumentRecord {
            path: row.get(0)?,
            document_type: DocumentType::from_str(&document_type).unwrap_or_default(),
            frontmatter,
            content: row.get(3)?,
            content_hash: row.get(4)?,
            file_size: file_size.max(0) as u64,
            modified_at: row.get(6)?,
            indexed_at: row.get(7)?,
        })
    }

    // ========================================
    // Dependency edges
    // ========================================

    /// Replace every outgoing edge of `from_path` with `edges`.
    ///
    /// Runs in one transaction; duplicate `(to_path, import_kind)` pairs keep
    /// their first occurrence. Returns the number of edges stored.
    pub fn replace_edges(&self, from_path: &str, edges: &[DependencyEdge]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM dependency_edges WHERE from_path = ?1",
            params![from_path],
        )?;

        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO dependency_edges
                     (from_path, to_path, import_kind, line_number, raw_text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for edge in edges {
                if edge.from_path != from_path {
                    return Err(PromptdexError::Other(format!(
                        "Edge source {} does not match {}",
                        edge.from_path, from_path
                    )));
                }
                stored += stmt.execute(params![
                    edge.from_path,
                    edge.to_path,
                    edge.import_kind,
                    edge.line_number as i64,
                    edge.raw_text,
                ])?;
            }
        }

        tx.commit()?;
        debug!("Stored {} edges for {}", stored, from_path);
        Ok(stored)
    }

    /// Edges leaving `path`, ordered by line.
    pub fn edges_from(&self, path: &str) -> Result<Vec<DependencyEdge>> {
        self.query_edges(
            "SELECT from_path, to_path, import_kind, line_number, raw_text
             FROM dependency_edges WHERE from_path = ?1 ORDER BY line_number, to_path",
            path,
        )
    }

    /// Edges arriving at `path`, ordered by source.
    pub fn edges_to(&self, path: &str) -> Result<Vec<DependencyEdge>> {
        self.query_edges(
            "SELECT from_path, to_path, import_kind, line_number, raw_text
             FROM dependency_edges WHERE to_path = ?1 ORDER BY from_path, line_number",
            path,
        )
    }

    /// Documents with at least one edge whose target is not indexed, sorted.
    pub fn dangling_referrers(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT e.from_path FROM dependency_edges e
             WHERE NOT EXISTS (SELECT 1 FROM documents d WHERE d.path = e.to_path)
             ORDER BY e.from_path",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    fn query_edges(&self, sql: &str, path: &str) -> Result<Vec<DependencyEdge>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![path], |row| {
            let line: i64 = row.get(3)?;
            Ok(DependencyEdge {
                from_path: row.get(0)?,
                to_path: row.get(1)?,
                import_kind: row.get(2)?,
                line_number: line.max(0) as usize,
                raw_text: row.get(4)?,
            })
        })?;

        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }

    /// Get the count of edges.
    pub fn edge_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM dependency_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========================================
    // Maintenance
    // ========================================

    /// Row counts across all tables.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let mut by_type = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT document_type, COUNT(*) FROM documents GROUP BY document_type",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            for row in rows {
                let (doc_type, count): (String, i64) = row?;
                by_type.insert(doc_type, count as usize);
            }
        }

        let documents = by_type.values().sum();
        let edges: i64 =
            conn.query_row("SELECT COUNT(*) FROM dependency_edges", [], |row| row.get(0))?;
        let external_edges: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dependency_edges e
             WHERE NOT EXISTS (SELECT 1 FROM documents d WHERE d.path = e.to_path)",
            [],
            |row| row.get(0),
        )?;
        let fts_rows = FTS5Manager::new(&self.fts5_config).get_stats(&conn)?.row_count;

        Ok(StoreStats {
            documents,
            by_type,
            edges: edges as usize,
            external_edges: external_edges as usize,
            fts_rows,
            schema_version: schema::schema_version(&conn)?,
        })
    }

    /// Rebuild the FTS5 index from the documents table.
    pub fn rebuild_fts(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        FTS5Manager::new(&self.fts5_config).rebuild(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Optimize the FTS5 index.
    pub fn optimize_fts(&self) -> Result<()> {
        let conn = self.lock()?;
        FTS5Manager::new(&self.fts5_config).optimize(&conn)
    }

    /// Checkpoint the WAL file.
    pub fn checkpoint_wal(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        debug!("Checkpointed WAL");
        Ok(())
    }

    /// Remove every document (and, by cascade, every edge).
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM documents", [])?;
        debug!("Cleared document store");
        Ok(())
    }

    /// Checkpoint and close the connection.
    ///
    /// Fails if another handle to the connection is still alive.
    pub fn close(self) -> Result<()> {
        if self.db_path.is_some() {
            self.checkpoint_wal()?;
        }

        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| PromptdexError::Database {
                message: "Store is still shared; cannot close".to_string(),
                source: None,
            })?
            .into_inner()
            .map_err(|_| PromptdexError::Database {
                message: "Connection lock poisoned".to_string(),
                source: None,
            })?;

        conn.close().map_err(|(_, e)| PromptdexError::from(e))?;
        debug!("Closed document store");
        Ok(())
    }
}
