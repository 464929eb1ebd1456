//! Fetch and push against a snapshot store

use std::time::Duration;

use super::push::{apply_push, MergeReport};
use super::request::SyncRequest;
use super::size::{SizeGuard, DEFAULT_MAX_SNAPSHOT_BYTES};
use super::version::check_base_version;
use crate::clock::{Clock, SystemClock};
use crate::models::Snapshot;
use crate::store::{SnapshotStore, WriteOutcome, WritePrecondition};
use crate::{Error, Result};

/// Tombstones older than this are dropped from served snapshots by default.
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Tunables for [`SyncService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub max_snapshot_bytes: usize,
    pub tombstone_retention: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            tombstone_retention: DEFAULT_TOMBSTONE_RETENTION,
        }
    }
}

impl SyncSettings {
    fn retention_millis(&self) -> i64 {
        i64::try_from(self.tombstone_retention.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Snapshot persisted by a successful push.
#[derive(Debug, Clone)]
pub struct MergeReceipt {
    pub snapshot: Snapshot,
    pub report: MergeReport,
}

/// Serves the shared snapshot and admits version-gated pushes.
#[derive(Debug)]
pub struct SyncService<S, C = SystemClock> {
    store: S,
    clock: C,
    settings: SyncSettings,
}

impl<S: SnapshotStore> SyncService<S> {
    pub const fn new(store: S, settings: SyncSettings) -> Self {
        Self::with_clock(store, SystemClock, settings)
    }
}

impl<S: SnapshotStore, C: Clock> SyncService<S, C> {
    pub const fn with_clock(store: S, clock: C, settings: SyncSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Current snapshot with expired tombstones hidden.
    ///
    /// Pruning here is not persisted; the next successful push writes it.
    pub async fn fetch(&self) -> Result<Snapshot> {
        let now = self.clock.now_millis();
        let mut snapshot = self
            .store
            .load()
            .await?
            .map_or_else(|| Snapshot::empty(now), |stored| stored.snapshot);

        let pruned = snapshot.prune_tombstones(now, self.settings.retention_millis());
        tracing::info!(
            store = self.store.kind(),
            version = snapshot.version,
            bookings = snapshot.bookings.len(),
            user_profiles = snapshot.user_profiles.len(),
            schedule_items = snapshot.schedule_items.len(),
            emergency_alerts = snapshot.emergency_alerts.len(),
            caddies = snapshot.caddies.len(),
            waitlist = snapshot.waitlist.len(),
            tombstones = snapshot.tombstones.len(),
            pruned_tombstones = pruned,
            "Served snapshot"
        );
        Ok(snapshot)
    }

    /// Merge a client push into the stored snapshot.
    ///
    /// Fails with [`Error::VersionConflict`] when the client's base version is
    /// stale or another writer saved first, and with [`Error::PayloadTooLarge`]
    /// when the merged snapshot would exceed the byte ceiling. Neither failure
    /// changes what is stored.
    pub async fn push(&self, request: SyncRequest) -> Result<MergeReceipt> {
        let now = self.clock.now_millis();
        let stored = self.store.load().await?;
        let precondition = WritePrecondition::for_loaded(stored.as_ref());
        let mut current = stored.map_or_else(|| Snapshot::empty(now), |stored| stored.snapshot);
        current.prune_tombstones(now, self.settings.retention_millis());

        if let Err(stale) = check_base_version(request.base_version, current.version) {
            tracing::warn!(
                base_version = stale.base_version,
                current_version = stale.current_version,
                "Rejected push from stale base version"
            );
            return Err(Error::VersionConflict {
                current_version: current.version,
                server_snapshot: Box::new(current),
            });
        }

        let (merged, report) = apply_push(current, request.deltas, &self.clock);
        let document = SizeGuard::new(self.settings.max_snapshot_bytes).encode(&merged)?;
        let size = document.bytes.len();

        match self.store.save(document, precondition).await? {
            WriteOutcome::Written { revision } => {
                tracing::info!(
                    store = self.store.kind(),
                    version = merged.version,
                    %revision,
                    size,
                    applied = report.applied(),
                    cascaded = report.cascade.cascaded,
                    orphaned = report.cascade.orphaned,
                    bookings = merged.bookings.len(),
                    user_profiles = merged.user_profiles.len(),
                    schedule_items = merged.schedule_items.len(),
                    emergency_alerts = merged.emergency_alerts.len(),
                    caddies = merged.caddies.len(),
                    waitlist = merged.waitlist.len(),
                    tombstones = merged.tombstones.len(),
                    "Saved merged snapshot"
                );
                Ok(MergeReceipt {
                    snapshot: merged,
                    report,
                })
            }
            WriteOutcome::PreconditionFailed => {
                let latest = self.fetch().await?;
                tracing::warn!(
                    attempted_version = merged.version,
                    current_version = latest.version,
                    "Concurrent writer saved first"
                );
                Err(Error::VersionConflict {
                    current_version: latest.version,
                    server_snapshot: Box::new(latest),
                })
            }
        }
    }
}
