//! Indexing methods on DocIndex.

use crate::deps::{self, DependencyIndexResult};
use crate::error::{PromptdexError, Result};
use crate::indexer::{IncrementalResult, IndexResult, Indexer};
use crate::store::StoreStats;
use crate::DocIndex;

impl DocIndex {
    // ========================================
    // Indexing
    // ========================================

    /// Re-parse and upsert every matching file under the root.
    pub async fn index_full(&self) -> Result<IndexResult> {
        let store = self.store.clone();
        let root_dir = self.root_dir.clone();
        let options = self.index_options.clone();

        tokio::task::spawn_blocking(move || {
            Indexer::new(&store, root_dir, options).index_directory()
        })
        .await
        .map_err(|e| PromptdexError::Other(format!("Indexing task failed: {}", e)))?
    }

    /// Bring the index in line with the filesystem, touching only changed files.
    pub async fn index_incremental(&self) -> Result<IncrementalResult> {
        let store = self.store.clone();
        let root_dir = self.root_dir.clone();
        let options = self.index_options.clone();

        tokio::task::spawn_blocking(move || {
            Indexer::new(&store, root_dir, options).index_incremental()
        })
        .await
        .map_err(|e| PromptdexError::Other(format!("Indexing task failed: {}", e)))?
    }

    /// Recompute dependency edges for every indexed document.
    pub async fn index_dependencies(&self) -> Result<DependencyIndexResult> {
        let store = self.store.clone();
        let root_dir = self.root_dir.clone();
        let options = self.index_options.dependency_options.clone();

        tokio::task::spawn_blocking(move || {
            deps::index_all_dependencies(&store, &root_dir, &options)
        })
        .await
        .map_err(|e| PromptdexError::Other(format!("Dependency task failed: {}", e)))?
    }

    /// Row counts and schema version.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }
}
