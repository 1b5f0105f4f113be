//! Error types for record queries and configuration.
//!
//! Store failures are opaque to callers: they are shown on the view that
//! issued the query and never retried automatically. Filter input that does
//! not parse is not an error at all; the predicate builder drops it.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a `RecordStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record query failed: {0}")]
    QueryFailed(String),

    #[error("Unexpected record shape: {0}")]
    Decode(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Short message for the view model's `error` slot.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::QueryFailed(_) | StoreError::Decode(_) => {
                "Could not load records. Try again.".to_string()
            }
            StoreError::Unavailable(_) | StoreError::HomeDirNotFound => {
                "The record store is unavailable.".to_string()
            }
            StoreError::Migration(_) => "The record store needs repair.".to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Errors loading ~/.callboard/config.json
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
}
