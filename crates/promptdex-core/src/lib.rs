//! Promptdex Core - local document index with full-text, metadata, and
//! dependency-graph search.
//!
//! The index lives in a single SQLite file. Documents are discovered by
//! walking a root directory; their frontmatter, body, and references to other
//! files are extracted and kept queryable.
//!
//! # Example
//!
//! ```rust,ignore
//! use promptdex_core::{DocIndex, FanOutOptions};
//!
//! #[tokio::main]
//! async fn main() -> promptdex_core::Result<()> {
//!     let index = DocIndex::open("/path/to/repo")?;
//!
//!     let result = index.index_incremental().await?;
//!     println!("{} updated, {} deleted", result.updated, result.deleted);
//!
//!     for hit in index.search("authentication", &FanOutOptions::default()).await {
//!         println!("{:.3} {}", hit.relevance_score, hit.result.path);
//!     }
//!
//!     index.close()
//! }
//! ```

pub mod config;
pub mod deps;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod search;
pub mod store;

mod api;

// Re-export commonly used types
pub use config::{DocumentType, GraphConfig, IndexerConfig, SearchConfig, StoreConfig};
pub use deps::{DependencyIndexResult, DependencyOptions, ExtractedDependency, ImportKind};
pub use error::{PromptdexError, Result};
pub use graph::{Direction, GraphTraversal, RelatedFile, TraversalOptions};
pub use indexer::{IncrementalResult, IndexOptions, IndexResult, Indexer};
pub use search::{
    FanOutOptions, FanOutResult, FanOutSearch, FullTextOptions, MetadataFilter, MetadataOptions,
    SearchResult, SearchStrategy, StrategyKind, StrategyOptions, StrategyWeights,
};
pub use store::{DependencyEdge, DocumentRecord, DocumentStore, StoreStats};

// Re-export builder from api module
pub use api::DocIndexBuilder;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main entry point: one repository root and the store that indexes it.
///
/// The store handle is owned here and lent to every component call; there is
/// no process-wide instance. Call [`DocIndex::close`] to checkpoint and
/// release the database.
pub struct DocIndex {
    root_dir: PathBuf,
    store: Arc<DocumentStore>,
    index_options: IndexOptions,
    traversal_options: TraversalOptions,
    strategy_timeout: Duration,
    fanout: FanOutSearch,
}

impl DocIndex {
    /// Create a builder for DocIndex.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let index = DocIndex::builder("./repo")
    ///     .in_memory(true)
    ///     .include_external(true)
    ///     .build()?;
    /// ```
    pub fn builder(root_dir: impl Into<PathBuf>) -> DocIndexBuilder {
        DocIndexBuilder::new(root_dir)
    }

    /// Open the index for `root_dir` with default options.
    ///
    /// The database is created at `<root>/.promptdex/index.db` if missing.
    pub fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        DocIndexBuilder::new(root_dir).build()
    }

    /// The indexed repository root.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Checkpoint and close the database.
    ///
    /// Fails if a clone of the store handle is still alive elsewhere.
    pub fn close(self) -> Result<()> {
        let DocIndex { store, fanout, .. } = self;
        // Strategies hold store clones
        drop(fanout);

        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(_) => Err(PromptdexError::Other(
                "Cannot close index: store handle is still in use".to_string(),
            )),
        }
    }
}
