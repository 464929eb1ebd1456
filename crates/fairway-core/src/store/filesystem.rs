//! Local filesystem snapshot store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    normalize_snapshot_key, Revision, SnapshotStore, StoredSnapshot, WriteOutcome,
    WritePrecondition,
};
use crate::models::Snapshot;
use crate::sync::EncodedSnapshot;
use crate::{Error, Result};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// Stores the snapshot as `<dir>/<key>.json`.
///
/// The revision is the SHA-256 of the stored bytes, so every write that
/// changes the document changes its revision, version bump or not.
/// Conditional writes hold a `<dir>/.<key>.json.lock` file created with
/// `create_new`, which serializes writers across processes sharing the data
/// directory. The document itself is replaced by write-to-temp, fsync,
/// rename, so readers never observe a partial file.
#[derive(Debug)]
pub struct FilesystemSnapshotStore {
    path: PathBuf,
    lock_path: PathBuf,
    write_lock: Mutex<()>,
}

/// Removes the lock file when the write finishes or fails.
struct LockFileGuard {
    path: PathBuf,
}

impl Drop for LockFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn revision_of(bytes: &[u8]) -> Revision {
    Revision::new(hex::encode(Sha256::digest(bytes)))
}

impl FilesystemSnapshotStore {
    pub async fn open(dir: impl AsRef<Path>, key: &str) -> Result<Self> {
        let key = normalize_snapshot_key(key)?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        Ok(Self {
            path: dir.join(format!("{key}.json")),
            lock_path: dir.join(format!(".{key}.json.lock")),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_current(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn acquire_lock_file(&self) -> Result<LockFileGuard> {
        for _ in 0..LOCK_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)
                .await
            {
                Ok(_) => {
                    return Ok(LockFileGuard {
                        path: self.lock_path.clone(),
                    })
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    if self.lock_is_stale().await {
                        tracing::warn!(
                            path = %self.lock_path.display(),
                            "Removing stale snapshot lock file"
                        );
                        let _ = fs::remove_file(&self.lock_path).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
        Err(Error::Storage(format!(
            "Timed out waiting for snapshot lock {}",
            self.lock_path.display()
        )))
    }

    async fn lock_is_stale(&self) -> bool {
        fs::metadata(&self.lock_path)
            .await
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > STALE_LOCK_AGE)
    }

    async fn replace(&self, bytes: &[u8]) -> Result<()> {
        let temp_name = format!(
            ".{}.tmp.{}",
            self.path
                .file_name()
                .map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
            Uuid::now_v7()
        );
        let temp_path = self.path.with_file_name(temp_name);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(error) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(error.into());
        }
        Ok(())
    }
}

impl SnapshotStore for FilesystemSnapshotStore {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    async fn load(&self) -> Result<Option<StoredSnapshot>> {
        let Some(bytes) = self.read_current().await? else {
            return Ok(None);
        };
        let snapshot = Snapshot::from_slice(&bytes)?;
        Ok(Some(StoredSnapshot {
            snapshot,
            revision: revision_of(&bytes),
        }))
    }

    async fn save(
        &self,
        document: EncodedSnapshot,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        let _lock_file = self.acquire_lock_file().await?;

        let current = self.read_current().await?.map(|bytes| revision_of(&bytes));
        let allowed = match (&precondition, &current) {
            (WritePrecondition::DoesNotExist, None) => true,
            (WritePrecondition::MatchesRevision(expected), Some(stored)) => expected == stored,
            _ => false,
        };
        if !allowed {
            tracing::warn!(
                path = %self.path.display(),
                ?precondition,
                stored_revision = ?current,
                "Snapshot write precondition failed"
            );
            return Ok(WriteOutcome::PreconditionFailed);
        }

        self.replace(&document.bytes).await?;
        Ok(WriteOutcome::Written {
            revision: revision_of(&document.bytes),
        })
    }
}
