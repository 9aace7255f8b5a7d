//! Storage errors

use thiserror::Error;
use uuid::Uuid;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("project {project_id} already has a connection")]
    LimitReached { project_id: Uuid },

    #[error("credential encryption failed: {0}")]
    Encryption(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Whether the error is a UNIQUE constraint violation
    pub(crate) fn is_unique_violation(error: &rusqlite::Error) -> bool {
        matches!(
            error,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}
