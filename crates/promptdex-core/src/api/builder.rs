//! Builder for configuring DocIndex initialization.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SearchConfig, StoreConfig};
use crate::error::{PromptdexError, Result};
use crate::graph::TraversalOptions;
use crate::indexer::IndexOptions;
use crate::search::{FanOutSearch, SearchStrategy};
use crate::store::DocumentStore;
use crate::DocIndex;

/// Builder for configuring DocIndex initialization.
///
/// # Example
///
/// ```rust,ignore
/// use promptdex_core::DocIndex;
///
/// let index = DocIndex::builder("./repo")
///     .db_path("/tmp/repo-index.db")
///     .extensions(["md", "mdc"])
///     .index_dependencies(false)
///     .build()?;
/// ```
pub struct DocIndexBuilder {
    root_dir: PathBuf,
    db_path: Option<PathBuf>,
    in_memory: bool,
    auto_create_dirs: bool,
    strategy_timeout: Duration,
    index_options: IndexOptions,
    traversal_options: TraversalOptions,
    strategies: Vec<Arc<dyn SearchStrategy>>,
}

impl DocIndexBuilder {
    /// Create a new builder for the repository at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            db_path: None,
            in_memory: false,
            auto_create_dirs: false,
            strategy_timeout: SearchConfig::STRATEGY_TIMEOUT,
            index_options: IndexOptions::default(),
            traversal_options: TraversalOptions::default(),
            strategies: Vec::new(),
        }
    }

    /// Store the index at a custom location.
    ///
    /// Default: `<root>/.promptdex/index.db`
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Keep the index in memory only. Overrides [`DocIndexBuilder::db_path`].
    ///
    /// Default: `false`
    pub fn in_memory(mut self, enable: bool) -> Self {
        self.in_memory = enable;
        self
    }

    /// Create the root directory if it doesn't exist.
    ///
    /// Default: `false`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Deadline for each fan-out strategy in [`DocIndex::search_options`].
    pub fn strategy_timeout(mut self, timeout: Duration) -> Self {
        self.strategy_timeout = timeout;
        self
    }

    /// Replace the file extension allow-list.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_options.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Recompute dependency edges while indexing.
    ///
    /// Default: `true`
    pub fn index_dependencies(mut self, enable: bool) -> Self {
        self.index_options.index_dependencies = enable;
        self
    }

    /// Keep edges to references that do not resolve to a file.
    ///
    /// Default: `true`
    pub fn retain_unresolved(mut self, enable: bool) -> Self {
        self.index_options.dependency_options.retain_unresolved = enable;
        self
    }

    /// Skip files larger than `bytes`.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.index_options.max_file_size = bytes;
        self
    }

    /// Include external edges in graph queries.
    ///
    /// Default: `false`
    pub fn include_external(mut self, enable: bool) -> Self {
        self.traversal_options.include_external = enable;
        self
    }

    /// Register an additional fan-out strategy, replacing a built-in one of
    /// the same kind.
    pub fn with_strategy(mut self, strategy: Arc<dyn SearchStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Build the DocIndex instance.
    pub fn build(self) -> Result<DocIndex> {
        if self.auto_create_dirs && !self.root_dir.exists() {
            std::fs::create_dir_all(&self.root_dir)
                .map_err(|e| PromptdexError::io_with_path(e, &self.root_dir))?;
        }
        if !self.root_dir.is_dir() {
            return Err(PromptdexError::Config {
                message: format!("Root directory does not exist: {}", self.root_dir.display()),
            });
        }

        let store = if self.in_memory {
            DocumentStore::open_in_memory()?
        } else {
            let db_path = self.db_path.unwrap_or_else(|| {
                self.root_dir
                    .join(StoreConfig::DB_DIR_NAME)
                    .join(StoreConfig::DB_FILENAME)
            });
            DocumentStore::open(db_path)?
        };
        let store = Arc::new(store);

        let mut fanout = FanOutSearch::with_store(store.clone());
        for strategy in self.strategies {
            fanout.register(strategy);
        }

        tracing::debug!(
            "Opened index for {} (strategies: {:?})",
            self.root_dir.display(),
            fanout.registered()
        );

        Ok(DocIndex {
            root_dir: self.root_dir,
            store,
            index_options: self.index_options,
            traversal_options: self.traversal_options,
            strategy_timeout: self.strategy_timeout,
            fanout,
        })
    }
}
