//! Error types for promptdex.
//!
//! Batch operations (directory indexing, dependency extraction) never surface
//! per-file failures through this type; they collect them as strings in their
//! result structs. Everything here is fatal to the single call that produced it.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the promptdex library.
#[derive(Debug, Error)]
pub enum PromptdexError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Index schema version {found} is newer than supported version {supported}")]
    SchemaVersion { found: u32, supported: u32 },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Indexing errors
    #[error("Failed to extract {path}: {message}")]
    Extraction { path: String, message: String },

    // Query errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid full-text query {query:?}: {message}")]
    QuerySyntax { query: String, message: String },

    #[error("Search strategy {strategy} failed: {message}")]
    StrategyFailed { strategy: String, message: String },

    #[error("Search strategy {strategy} timed out after {timeout:?}")]
    StrategyTimeout { strategy: String, timeout: Duration },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for promptdex operations.
pub type Result<T> = std::result::Result<T, PromptdexError>;

impl From<std::io::Error> for PromptdexError {
    fn from(err: std::io::Error) -> Self {
        PromptdexError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PromptdexError {
    fn from(err: serde_json::Error) -> Self {
        PromptdexError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for PromptdexError {
    fn from(err: rusqlite::Error) -> Self {
        PromptdexError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl PromptdexError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PromptdexError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PromptdexError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PromptdexError::Validation { .. } | PromptdexError::QuerySyntax { .. }
        )
    }

    /// Map to a process exit code.
    ///
    /// - 2: invalid input (validation, query syntax)
    /// - 3: index schema is newer than this build
    /// - 1: everything else
    pub fn to_exit_code(&self) -> i32 {
        match self {
            PromptdexError::Validation { .. } | PromptdexError::QuerySyntax { .. } => 2,
            PromptdexError::SchemaVersion { .. } => 3,
            _ => 1,
        }
    }
}
