//! SQLite document store with FTS5 full-text search.
//!
//! This module provides:
//! - Versioned schema with a `schema_version` marker table
//! - Document storage with an FTS5 projection kept in sync by triggers
//! - Dependency edges that cascade with their source document
//! - FTS5 query preparation

mod document_store;
mod fts5;
mod query;
mod schema;

pub use document_store::{DependencyEdge, DocumentRecord, DocumentStore, StoreStats};
pub use fts5::{FTS5Config, FTS5Manager, FTS5Stats};
pub use query::{escape_fts5_term, is_advanced_query, literal_terms, prepare_match_query};
pub use schema::{initialize_schema, schema_version};
