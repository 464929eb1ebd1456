use std::io;

use thiserror::Error;

use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fairway_core::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(
        "Snapshot is at version {current_version}; fetch it, re-apply your changes and push with --base-version {current_version}"
    )]
    Conflict { current_version: u64 },
    #[error("Snapshot changed while pruning tombstones; nothing was removed, run gc again")]
    PruneRaced,
    #[error("Merged snapshot is too large: {0}")]
    TooLarge(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
