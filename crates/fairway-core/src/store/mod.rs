//! Snapshot persistence backends.
//!
//! A store holds exactly one snapshot document under one logical key. Writes
//! are conditional: `save` only replaces the document when the stored revision
//! still matches what the caller loaded, which turns the version check into a
//! compare-and-swap at the storage boundary.

mod filesystem;
mod memory;
mod r2;

use std::fmt;
use std::future::Future;

pub use filesystem::FilesystemSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use r2::{R2Config, R2SnapshotStore};

use crate::models::Snapshot;
use crate::sync::EncodedSnapshot;
use crate::{Error, Result};

/// Logical key used when none is configured.
pub const DEFAULT_SNAPSHOT_KEY: &str = "storage";

/// Opaque, backend-specific token identifying one stored document state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot as loaded, with the revision to guard the next write.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub snapshot: Snapshot,
    pub revision: Revision,
}

/// Condition the stored document must satisfy for a write to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Nothing has been stored yet.
    DoesNotExist,
    /// The stored document is still at this revision.
    MatchesRevision(Revision),
}

impl WritePrecondition {
    /// Precondition for replacing whatever `load` returned.
    pub fn for_loaded(loaded: Option<&StoredSnapshot>) -> Self {
        loaded.map_or(Self::DoesNotExist, |stored| {
            Self::MatchesRevision(stored.revision.clone())
        })
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { revision: Revision },
    PreconditionFailed,
}

/// Durable home of the snapshot document.
pub trait SnapshotStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn kind(&self) -> &'static str;

    /// Load the stored snapshot, or `None` if nothing was ever saved.
    fn load(&self) -> impl Future<Output = Result<Option<StoredSnapshot>>> + Send;

    /// Atomically replace the stored document if `precondition` holds.
    fn save(
        &self,
        document: EncodedSnapshot,
        precondition: WritePrecondition,
    ) -> impl Future<Output = Result<WriteOutcome>> + Send;
}

/// Store selected at runtime from configuration.
#[derive(Debug)]
pub enum SnapshotBackend {
    Memory(MemorySnapshotStore),
    Filesystem(FilesystemSnapshotStore),
    R2(R2SnapshotStore),
}

impl SnapshotStore for SnapshotBackend {
    fn kind(&self) -> &'static str {
        match self {
            Self::Memory(store) => store.kind(),
            Self::Filesystem(store) => store.kind(),
            Self::R2(store) => store.kind(),
        }
    }

    async fn load(&self) -> Result<Option<StoredSnapshot>> {
        match self {
            Self::Memory(store) => store.load().await,
            Self::Filesystem(store) => store.load().await,
            Self::R2(store) => store.load().await,
        }
    }

    async fn save(
        &self,
        document: EncodedSnapshot,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        match self {
            Self::Memory(store) => store.save(document, precondition).await,
            Self::Filesystem(store) => store.save(document, precondition).await,
            Self::R2(store) => store.save(document, precondition).await,
        }
    }
}

/// Validate a logical snapshot key: non-empty, no path separators or dot
/// segments.
pub fn normalize_snapshot_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput("Snapshot key cannot be empty".to_string()));
    }
    if key.contains(['/', '\\']) || key.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "Snapshot key must be a plain name: {key}"
        )));
    }
    Ok(key.to_string())
}
