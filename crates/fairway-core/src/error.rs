//! Error types for fairway-core

use thiserror::Error;

use crate::models::Snapshot;

/// Result type alias using fairway-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fairway-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Request body could not be parsed as JSON
    #[error("Invalid JSON: {0}")]
    MalformedInput(String),

    /// `baseVersion` was absent or not a number
    #[error("Missing or invalid baseVersion")]
    InvalidBaseVersion,

    /// The client's base version is stale, or a concurrent write won the race
    #[error("Version conflict: server is at version {current_version}")]
    VersionConflict {
        current_version: u64,
        server_snapshot: Box<Snapshot>,
    },

    /// The merged snapshot would exceed the configured byte ceiling
    #[error("Snapshot size {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot storage backend error
    #[error("Storage error: {0}")]
    Storage(String),
}
