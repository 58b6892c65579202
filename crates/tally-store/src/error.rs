//! Error types for tally-store.

use std::path::PathBuf;

use tally_types::ContractError;

/// Result type for tally-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Collection not found in database.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Collection names must be non-empty.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    /// Invalid timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// SQLite grouped rows into a bucket that does not exist.
    #[error("Invalid bucket: {0}")]
    InvalidBucket(#[from] ContractError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
