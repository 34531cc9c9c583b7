//! Error types for kept-core

use thiserror::Error;

/// Result type alias using kept-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kept-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote backend rejected the call
    #[error("Remote error: {0}")]
    Remote(String),

    /// Operation needs connectivity
    #[error("Offline: {0}")]
    Offline(String),
}
