//! FTS5 virtual table setup and management.
//!
//! The full-text table is a projection of `documents` maintained entirely by
//! SQLite triggers, so every insert, update, and delete of a document updates
//! its FTS row inside the same statement.

use crate::config::StoreConfig;
use crate::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Scalar leaves of a document's frontmatter JSON, joined with spaces.
const FRONTMATTER_TEXT_NEW: &str =
    "(SELECT GROUP_CONCAT(value, ' ') FROM json_tree(NEW.frontmatter) WHERE type NOT IN ('object', 'array'))";

/// Configuration for FTS5 table.
#[derive(Debug, Clone)]
pub struct FTS5Config {
    /// Name of the FTS5 virtual table.
    pub table_name: String,
    /// Tokenizer configuration.
    pub tokenizer: String,
}

impl Default for FTS5Config {
    fn default() -> Self {
        Self {
            table_name: StoreConfig::FTS_TABLE.to_string(),
            tokenizer: StoreConfig::FTS_TOKENIZER.to_string(),
        }
    }
}

/// Manager for FTS5 setup and maintenance.
pub struct FTS5Manager<'a> {
    config: &'a FTS5Config,
}

impl<'a> FTS5Manager<'a> {
    /// Create a new FTS5 manager.
    pub fn new(config: &'a FTS5Config) -> Self {
        Self { config }
    }

    /// Check if the FTS5 table exists.
    pub fn table_exists(&self, conn: &Connection) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&self.config.table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Check if all three sync triggers exist.
    pub fn triggers_exist(&self, conn: &Connection) -> Result<bool> {
        let names = self.trigger_names();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='trigger' AND name IN (?1, ?2, ?3)",
            [&names[0], &names[1], &names[2]],
            |row| row.get(0),
        )?;
        Ok(count == 3)
    }

    /// Ensure FTS5 is fully set up.
    pub fn ensure_setup(&self, conn: &Connection) -> Result<()> {
        if !self.table_exists(conn)? {
            self.create_table(conn)?;
            self.populate_from_documents(conn)?;
        } else if !self.triggers_exist(conn)? {
            // Table exists but triggers missing - resync before reattaching
            self.populate_from_documents(conn)?;
        }

        self.create_triggers(conn)?;
        Ok(())
    }

    /// Create the FTS5 virtual table.
    pub fn create_table(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5(
                path UNINDEXED,
                frontmatter,
                content,
                tokenize='{}'
            )",
            self.config.table_name, self.config.tokenizer
        );

        conn.execute(&sql, [])?;
        info!("Created FTS5 table: {}", self.config.table_name);
        Ok(())
    }

    /// Create triggers to keep FTS5 in sync with the documents table.
    pub fn create_triggers(&self, conn: &Connection) -> Result<()> {
        let table = &self.config.table_name;
        let [ai, au, ad] = self.trigger_names();

        let insert_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {ai} AFTER INSERT ON documents BEGIN
                INSERT INTO {table} (path, frontmatter, content)
                VALUES (NEW.path, {FRONTMATTER_TEXT_NEW}, NEW.content);
            END"
        );
        conn.execute(&insert_trigger, [])?;

        let update_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {au} AFTER UPDATE ON documents BEGIN
                DELETE FROM {table} WHERE path = OLD.path;
                INSERT INTO {table} (path, frontmatter, content)
                VALUES (NEW.path, {FRONTMATTER_TEXT_NEW}, NEW.content);
            END"
        );
        conn.execute(&update_trigger, [])?;

        let delete_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {ad} AFTER DELETE ON documents BEGIN
                DELETE FROM {table} WHERE path = OLD.path;
            END"
        );
        conn.execute(&delete_trigger, [])?;

        debug!("Created FTS5 triggers for {}", table);
        Ok(())
    }

    /// Populate FTS5 from the existing documents table.
    pub fn populate_from_documents(&self, conn: &Connection) -> Result<()> {
        let table = &self.config.table_name;

        conn.execute_batch(&format!("DELETE FROM {};", table))?;

        let sql = format!(
            "INSERT INTO {table} (path, frontmatter, content)
             SELECT
                 d.path,
                 (SELECT GROUP_CONCAT(value, ' ') FROM json_tree(d.frontmatter)
                  WHERE type NOT IN ('object', 'array')),
                 d.content
             FROM documents d"
        );
        let rows = conn.execute(&sql, [])?;

        info!("Populated FTS5 table from {} documents", rows);
        Ok(())
    }

    /// Rebuild the FTS5 index completely.
    pub fn rebuild(&self, conn: &Connection) -> Result<()> {
        for trigger in self.trigger_names() {
            conn.execute(&format!("DROP TRIGGER IF EXISTS {}", trigger), [])?;
        }
        conn.execute(
            &format!("DROP TABLE IF EXISTS {}", self.config.table_name),
            [],
        )?;

        self.create_table(conn)?;
        self.populate_from_documents(conn)?;
        self.create_triggers(conn)?;

        info!("Rebuilt FTS5 index");
        Ok(())
    }

    /// Optimize the FTS5 index.
    pub fn optimize(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "INSERT INTO {}({}) VALUES('optimize')",
            self.config.table_name, self.config.table_name
        );
        conn.execute(&sql, [])?;
        debug!("Optimized FTS5 index");
        Ok(())
    }

    /// Get statistics about the FTS5 index.
    pub fn get_stats(&self, conn: &Connection) -> Result<FTS5Stats> {
        let row_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.config.table_name),
            [],
            |row| row.get(0),
        )?;

        Ok(FTS5Stats {
            table_name: self.config.table_name.clone(),
            row_count: row_count as usize,
            tokenizer: self.config.tokenizer.clone(),
        })
    }

    fn trigger_names(&self) -> [String; 3] {
        let table = &self.config.table_name;
        [
            format!("{}_ai", table),
            format!("{}_au", table),
            format!("{}_ad", table),
        ]
    }
}

/// Statistics about an FTS5 index.
#[derive(Debug, Clone)]
pub struct FTS5Stats {
    pub table_name: String,
    pub row_count: usize,
    pub tokenizer: String,
}
