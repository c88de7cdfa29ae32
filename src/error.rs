//! Error handling for clipseek.

use std::io;

use thiserror::Error;

/// Main error type for clipseek operations.
#[derive(Error, Debug)]
pub enum ClipseekError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(#[from] reqwest::Error),

    #[error("Storage engine error: {0}")]
    Storage(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Index not ready: {0}")]
    IndexNotReady(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Query cancelled")]
    Cancelled,
}

impl ClipseekError {
    /// Whether this error fails the whole query (rather than degrading
    /// one pipeline to an empty result).
    #[must_use]
    pub fn is_fatal_to_query(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_)
                | Self::EmbeddingUnavailable(_)
                | Self::InvalidRequest(_)
                | Self::Cancelled
        )
    }
}

/// Result type alias using ClipseekError.
pub type Result<T> = std::result::Result<T, ClipseekError>;
