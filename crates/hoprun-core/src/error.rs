//! Error types for Hoprun

use thiserror::Error;

/// Core error type for database-facing operations
#[derive(Error, Debug)]
pub enum HoprunError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl HoprunError {
    /// Whether the error came from running a statement rather than reaching
    /// or inspecting the database.
    pub fn is_query_error(&self) -> bool {
        matches!(self, HoprunError::Query(_))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, HoprunError>;
