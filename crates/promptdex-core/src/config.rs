//! Centralized configuration for promptdex.
//!
//! Compile-time defaults for the store, the indexer, search, and graph
//! traversal, plus the closed set of document types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Store and schema configuration.
pub struct StoreConfig;

impl StoreConfig {
    pub const DB_DIR_NAME: &'static str = ".promptdex";
    pub const DB_FILENAME: &'static str = "index.db";
    pub const SCHEMA_VERSION: u32 = 1;
    pub const FTS_TABLE: &'static str = "documents_fts";
    pub const FTS_TOKENIZER: &'static str = "unicode61 remove_diacritics 1";
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Configuration for directory indexing.
pub struct IndexerConfig;

impl IndexerConfig {
    /// Documentation-style extensions indexed by default.
    pub const DEFAULT_EXTENSIONS: &'static [&'static str] = &["md", "mdc", "markdown", "mdx", "txt"];
    /// Directory names never descended into.
    pub const IGNORED_DIRS: &'static [&'static str] =
        &[".git", "node_modules", "target", StoreConfig::DB_DIR_NAME];
    pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024; // 4MB
}

/// Search and ranking configuration.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const SNIPPET_LENGTH: usize = 160;
    /// Each fan-out strategy is asked for `limit * FANOUT_LIMIT_MULTIPLIER` results.
    pub const FANOUT_LIMIT_MULTIPLIER: usize = 2;
    pub const STRATEGY_TIMEOUT: Duration = Duration::from_secs(5);

    pub const FULL_TEXT_WEIGHT: f64 = 1.0;
    pub const METADATA_WEIGHT: f64 = 0.7;
    pub const SEMANTIC_WEIGHT: f64 = 0.4;
}

/// Dependency graph traversal configuration.
pub struct GraphConfig;

impl GraphConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 3;
    pub const MAX_DEPTH_CAP: usize = 32;
}

/// Classification of an indexed document, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Rule,
    Command,
    Skill,
    Task,
    StoryMap,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Rule,
        DocumentType::Command,
        DocumentType::Skill,
        DocumentType::Task,
        DocumentType::StoryMap,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Rule => "rule",
            DocumentType::Command => "command",
            DocumentType::Skill => "skill",
            DocumentType::Task => "task",
            DocumentType::StoryMap => "story-map",
            DocumentType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rule" => Some(DocumentType::Rule),
            "command" => Some(DocumentType::Command),
            "skill" => Some(DocumentType::Skill),
            "task" => Some(DocumentType::Task),
            "story-map" => Some(DocumentType::StoryMap),
            "other" => Some(DocumentType::Other),
            _ => None,
        }
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        DocumentType::Other
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
