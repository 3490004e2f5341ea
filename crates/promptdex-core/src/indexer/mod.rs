//! Document discovery and extraction.
//!
//! Walks a root directory, classifies each matching file by its path, splits
//! frontmatter from the body, fingerprints the raw bytes, and upserts the
//! result into a [`DocumentStore`](crate::store::DocumentStore). Two modes:
//!
//! - full: every file is re-parsed and upserted
//! - incremental: only files whose hash changed are re-parsed, and rows whose
//!   file disappeared are deleted

mod doc_type;
mod frontmatter;
mod hashing;
mod scanner;

pub use doc_type::detect_document_type;
pub use frontmatter::{parse_frontmatter, ParsedDocument};
pub use hashing::{compute_file_hash, hash_file};
pub use scanner::{IncrementalResult, IndexOptions, IndexResult, Indexer};
