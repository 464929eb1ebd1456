//! In-process snapshot store.

use tokio::sync::Mutex;

use super::{Revision, SnapshotStore, StoredSnapshot, WriteOutcome, WritePrecondition};
use crate::models::Snapshot;
use crate::sync::EncodedSnapshot;
use crate::Result;

#[derive(Debug)]
struct StoredBytes {
    bytes: Vec<u8>,
    generation: u64,
}

/// Keeps the serialized snapshot in memory. Revisions are write generations.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<StoredBytes>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `snapshot`.
    pub fn seeded(snapshot: &Snapshot) -> Result<Self> {
        Ok(Self {
            slot: Mutex::new(Some(StoredBytes {
                bytes: snapshot.to_bytes()?,
                generation: 1,
            })),
        })
    }

    /// Exact bytes currently stored.
    pub async fn raw_bytes(&self) -> Option<Vec<u8>> {
        self.slot.lock().await.as_ref().map(|stored| stored.bytes.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<StoredSnapshot>> {
        let slot = self.slot.lock().await;
        let Some(stored) = slot.as_ref() else {
            return Ok(None);
        };
        Ok(Some(StoredSnapshot {
            snapshot: Snapshot::from_slice(&stored.bytes)?,
            revision: Revision::new(stored.generation.to_string()),
        }))
    }

    async fn save(
        &self,
        document: EncodedSnapshot,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        let mut slot = self.slot.lock().await;
        let current = slot.as_ref().map(|stored| stored.generation);

        let allowed = match (&precondition, current) {
            (WritePrecondition::DoesNotExist, None) => true,
            (WritePrecondition::MatchesRevision(expected), Some(generation)) => {
                expected.as_str() == generation.to_string()
            }
            _ => false,
        };
        if !allowed {
            return Ok(WriteOutcome::PreconditionFailed);
        }

        let generation = current.unwrap_or(0) + 1;
        *slot = Some(StoredBytes {
            bytes: document.bytes,
            generation,
        });
        Ok(WriteOutcome::Written {
            revision: Revision::new(generation.to_string()),
        })
    }
}
