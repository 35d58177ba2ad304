//! Error types for vitae-core

use thiserror::Error;

/// Result type alias using vitae-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vitae-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Share link not found
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
