use std::time::Duration;

use fairway_core::store::{FilesystemSnapshotStore, SnapshotStore, WriteOutcome, WritePrecondition};
use fairway_core::sync::EncodedSnapshot;
use fairway_core::{Clock, SystemClock};

use crate::cli::LocalStoreArgs;
use crate::commands::common::open_local_store;
use crate::error::CliError;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub async fn run_gc(
    store_args: &LocalStoreArgs,
    retention_days: u64,
    dry_run: bool,
) -> Result<(), CliError> {
    if retention_days == 0 {
        return Err(CliError::Config(
            "--retention-days must be at least 1".to_string(),
        ));
    }
    let store = open_local_store(store_args).await?;
    let retention = Duration::from_secs(retention_days.saturating_mul(SECONDS_PER_DAY));
    let removed = prune_store(&store, retention, &SystemClock, dry_run).await?;

    if dry_run {
        println!("Would remove {removed} expired tombstone(s) from {}", store.path().display());
    } else {
        println!("Removed {removed} expired tombstone(s) from {}", store.path().display());
    }
    Ok(())
}

/// Prune expired tombstones from the stored snapshot in place.
///
/// The snapshot version is left unchanged so clients holding it can still
/// push. Returns the number of tombstones removed (or that would be).
pub async fn prune_store(
    store: &FilesystemSnapshotStore,
    retention: Duration,
    clock: &dyn Clock,
    dry_run: bool,
) -> Result<usize, CliError> {
    let Some(stored) = store.load().await? else {
        return Ok(0);
    };
    let precondition = WritePrecondition::for_loaded(Some(&stored));
    let mut snapshot = stored.snapshot;

    let retention_millis = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    let removed = snapshot.prune_tombstones(clock.now_millis(), retention_millis);
    if removed == 0 || dry_run {
        return Ok(removed);
    }

    let document = EncodedSnapshot {
        version: snapshot.version,
        bytes: snapshot.to_bytes()?,
    };
    match store.save(document, precondition).await? {
        WriteOutcome::Written { .. } => {
            tracing::info!(removed, version = snapshot.version, "Pruned expired tombstones");
            Ok(removed)
        }
        WriteOutcome::PreconditionFailed => Err(CliError::PruneRaced),
    }
}
