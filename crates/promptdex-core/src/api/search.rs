//! Search methods on DocIndex.

use crate::error::Result;
use crate::search::{
    self, FanOutOptions, FanOutResult, FullTextOptions, MetadataFilter, MetadataOptions,
    SearchResult,
};
use crate::DocIndex;

impl DocIndex {
    // ========================================
    // Search
    // ========================================

    /// Default fan-out options with the configured strategy timeout.
    pub fn search_options(&self) -> FanOutOptions {
        FanOutOptions {
            timeout: self.strategy_timeout,
            ..Default::default()
        }
    }

    /// Run the fan-out search across the requested strategies.
    pub async fn search(&self, query: &str, options: &FanOutOptions) -> Vec<FanOutResult> {
        self.fanout.search(query, options).await
    }

    /// Full-text search only.
    pub fn search_fulltext(&self, query: &str, options: &FullTextOptions) -> Result<Vec<SearchResult>> {
        search::search_fulltext(&self.store, query, options)
    }

    /// Metadata filter search only. Invalid field paths are rejected before
    /// the store is queried.
    pub fn search_metadata(
        &self,
        filter: &MetadataFilter,
        options: &MetadataOptions,
    ) -> Result<Vec<SearchResult>> {
        search::search_metadata(&self.store, filter, options)
    }
}
