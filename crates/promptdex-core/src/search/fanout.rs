//! Multi-strategy search with weighted reciprocal-rank merging.

use super::fulltext::{search_fulltext, FullTextOptions};
use super::metadata::{search_metadata_query, MetadataOptions, MetadataQuery};
use super::types::{FanOutResult, SearchResult, StrategyKind};
use crate::config::{DocumentType, SearchConfig};
use crate::error::{PromptdexError, Result};
use crate::store::DocumentStore;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-call parameters handed to each strategy by the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyOptions {
    pub limit: usize,
    /// Only return documents of this type.
    pub document_type: Option<DocumentType>,
}

/// An independent search mechanism that can take part in a fan-out.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Return up to `options.limit` results, best first.
    async fn search(&self, query: &str, options: &StrategyOptions) -> Result<Vec<SearchResult>>;
}

/// Full-text strategy in lenient mode.
pub struct FullTextStrategy {
    store: Arc<DocumentStore>,
}

impl FullTextStrategy {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchStrategy for FullTextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FullText
    }

    async fn search(&self, query: &str, options: &StrategyOptions) -> Result<Vec<SearchResult>> {
        let store = self.store.clone();
        let query = query.to_string();
        let options = FullTextOptions {
            limit: options.limit,
            document_type: options.document_type,
            ..Default::default()
        };
        tokio::task::spawn_blocking(move || search_fulltext(&store, &query, &options))
            .await
            .map_err(|e| PromptdexError::StrategyFailed {
                strategy: StrategyKind::FullText.to_string(),
                message: e.to_string(),
            })?
    }
}

/// Metadata strategy driven by [`MetadataQuery::parse`].
pub struct MetadataStrategy {
    store: Arc<DocumentStore>,
}

impl MetadataStrategy {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchStrategy for MetadataStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Metadata
    }

    async fn search(&self, query: &str, options: &StrategyOptions) -> Result<Vec<SearchResult>> {
        let mut parsed = MetadataQuery::parse(query);
        if parsed.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(doc_type) = options.document_type {
            parsed.filter.insert("type", doc_type.as_str());
        }
        let store = self.store.clone();
        let options = MetadataOptions {
            limit: options.limit,
            offset: 0,
        };
        tokio::task::spawn_blocking(move || search_metadata_query(&store, &parsed, &options))
            .await
            .map_err(|e| PromptdexError::StrategyFailed {
                strategy: StrategyKind::Metadata.to_string(),
                message: e.to_string(),
            })?
    }
}

/// Per-strategy multipliers for reciprocal-rank contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyWeights {
    pub full_text: f64,
    pub metadata: f64,
    pub semantic: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            full_text: SearchConfig::FULL_TEXT_WEIGHT,
            metadata: SearchConfig::METADATA_WEIGHT,
            semantic: SearchConfig::SEMANTIC_WEIGHT,
        }
    }
}

impl StrategyWeights {
    pub fn weight(&self, kind: StrategyKind) -> f64 {
        match kind {
            StrategyKind::FullText => self.full_text,
            StrategyKind::Metadata => self.metadata,
            StrategyKind::Semantic => self.semantic,
        }
    }
}

/// Options for a fan-out search.
#[derive(Debug, Clone)]
pub struct FanOutOptions {
    pub limit: usize,
    /// Strategies to run; duplicates are ignored.
    pub strategies: Vec<StrategyKind>,
    pub weights: StrategyWeights,
    /// A strategy that takes longer is treated as failed.
    pub timeout: Duration,
    /// Only return documents of this type; passed down to every strategy.
    pub document_type: Option<DocumentType>,
}

impl Default for FanOutOptions {
    fn default() -> Self {
        Self {
            limit: SearchConfig::DEFAULT_LIMIT,
            strategies: vec![StrategyKind::FullText, StrategyKind::Metadata],
            weights: StrategyWeights::default(),
            timeout: SearchConfig::STRATEGY_TIMEOUT,
            document_type: None,
        }
    }
}

/// Runs registered strategies concurrently and merges their results by path.
#[derive(Default)]
pub struct FanOutSearch {
    strategies: Vec<Arc<dyn SearchStrategy>>,
}

impl FanOutSearch {
    /// Create an aggregator with no strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator with the built-in full-text and metadata strategies.
    pub fn with_store(store: Arc<DocumentStore>) -> Self {
        let mut search = Self::new();
        search.register(Arc::new(FullTextStrategy::new(store.clone())));
        search.register(Arc::new(MetadataStrategy::new(store)));
        search
    }

    /// Add a strategy, replacing any registered strategy of the same kind.
    pub fn register(&mut self, strategy: Arc<dyn SearchStrategy>) {
        let kind = strategy.kind();
        self.strategies.retain(|s| s.kind() != kind);
        self.strategies.push(strategy);
    }

    pub fn registered(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run the requested strategies and merge their rankings.
    ///
    /// A result at position `i` of a strategy's list contributes
    /// `weight / (i + 1)`; contributions for the same path add up. Failed or
    /// timed-out strategies contribute nothing. A blank query returns no
    /// results without running any strategy.
    pub async fn search(&self, query: &str, options: &FanOutOptions) -> Vec<FanOutResult> {
        let query = query.trim();
        if query.is_empty() || options.limit == 0 {
            return Vec::new();
        }

        let mut selected: Vec<Arc<dyn SearchStrategy>> = Vec::new();
        for kind in &options.strategies {
            if selected.iter().any(|s| s.kind() == *kind) {
                continue;
            }
            match self.strategies.iter().find(|s| s.kind() == *kind) {
                Some(strategy) => selected.push(strategy.clone()),
                None => debug!("No {} strategy registered; skipping", kind),
            }
        }

        let start = Instant::now();
        let strategy_options = StrategyOptions {
            limit: options
                .limit
                .saturating_mul(SearchConfig::FANOUT_LIMIT_MULTIPLIER),
            document_type: options.document_type,
        };
        let runs = selected.iter().map(|strategy| {
            let strategy = strategy.clone();
            let timeout = options.timeout;
            async move {
                let kind = strategy.kind();
                let outcome = match tokio::time::timeout(timeout, strategy.search(query, &strategy_options)).await {
                    Ok(result) => result,
                    Err(_) => Err(PromptdexError::StrategyTimeout {
                        strategy: kind.to_string(),
                        timeout,
                    }),
                };
                (kind, outcome)
            }
        });
        let outcomes = join_all(runs).await;

        let mut merged: HashMap<String, FanOutResult> = HashMap::new();
        for (kind, outcome) in outcomes {
            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    warn!("Search strategy {} contributed no results: {}", kind, e);
                    continue;
                }
            };

            let weight = options.weights.weight(kind);
            for (i, result) in results.into_iter().enumerate() {
                let contribution = weight / (i as f64 + 1.0);
                match merged.get_mut(&result.path) {
                    Some(existing) => {
                        existing.relevance_score += contribution;
                        if !existing.matched_strategies.contains(&kind) {
                            existing.matched_strategies.push(kind);
                        }
                        if existing.result.snippet.is_none() {
                            existing.result.snippet = result.snippet;
                        }
                    }
                    None => {
                        merged.insert(
                            result.path.clone(),
                            FanOutResult {
                                result,
                                relevance_score: contribution,
                                matched_strategies: vec![kind],
                            },
                        );
                    }
                }
            }
        }

        let mut ranked: Vec<FanOutResult> = merged
            .into_values()
            .filter(|r| {
                options
                    .document_type
                    .map_or(true, |t| r.result.document_type == t)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.result.path.cmp(&b.result.path))
        });
        ranked.truncate(options.limit);

        debug!(
            "Fan-out over {} strategies returned {} results in {:?}",
            selected.len(),
            ranked.len(),
            start.elapsed()
        );
        ranked
    }
}
