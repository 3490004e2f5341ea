//! Result shapes shared by every search strategy.

use crate::config::DocumentType;
use serde::{Deserialize, Serialize};

/// Identifies a search strategy in fan-out results and weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FullText,
    Metadata,
    /// Reserved for an embedding-backed strategy; none is built in.
    Semantic,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::FullText,
        StrategyKind::Metadata,
        StrategyKind::Semantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FullText => "full-text",
            StrategyKind::Metadata => "metadata",
            StrategyKind::Semantic => "semantic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full-text" | "fulltext" | "text" => Some(StrategyKind::FullText),
            "metadata" | "meta" => Some(StrategyKind::Metadata),
            "semantic" => Some(StrategyKind::Semantic),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One hit from a single strategy.
///
/// `score` is higher-is-better for every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub path: String,
    pub document_type: DocumentType,
    pub frontmatter: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub score: f64,
}

/// A merged hit from the fan-out aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutResult {
    #[serde(flatten)]
    pub result: SearchResult,
    /// Sum of weighted reciprocal ranks across strategies.
    pub relevance_score: f64,
    /// Every strategy that returned this path, in strategy order.
    pub matched_strategies: Vec<StrategyKind>,
}
