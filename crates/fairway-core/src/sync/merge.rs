//! Tombstone-aware last-writer-wins merge of one collection

use indexmap::IndexMap;
use serde::Serialize;

use crate::clock::StampIssuer;
use crate::models::{SyncRecord, TombstoneLedger};

/// What happened to the records of one collection during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Server records dropped because a tombstone already covered them.
    pub purged: usize,
    /// Incoming records that replaced or added an entry.
    pub upserted: usize,
    /// Incoming deletion requests.
    pub tombstoned: usize,
    /// Incoming records refused because a tombstone is at least as new.
    pub rejected: usize,
    /// Incoming records that lost to a newer server copy.
    pub kept_existing: usize,
    /// Incoming records without an id.
    pub skipped: usize,
}

/// Merge `incoming` client records into `server` records of the same kind.
///
/// Every incoming record is stamped with a fresh server timestamp before it
/// is compared, so client clocks never participate in conflict resolution.
/// Deletions are written to `ledger`; insertion order of surviving records is
/// preserved.
pub fn merge_collection<R: SyncRecord>(
    server: Vec<R>,
    incoming: Vec<R>,
    ledger: &mut TombstoneLedger,
    stamps: &mut StampIssuer<'_>,
) -> (Vec<R>, MergeStats) {
    let kind = R::KIND;
    let mut stats = MergeStats::default();
    let mut working: IndexMap<String, R> = IndexMap::with_capacity(server.len());

    for record in server {
        let Some(id) = record.id().map(str::to_owned) else {
            stats.purged += 1;
            continue;
        };
        if ledger.suppresses(kind, &id, record.updated_at()) {
            tracing::debug!(entity = kind.as_str(), id = %id, "Purged tombstoned record");
            stats.purged += 1;
            continue;
        }
        working.insert(id, record);
    }

    for mut record in incoming {
        let Some(id) = record.id().map(str::to_owned) else {
            stats.skipped += 1;
            continue;
        };
        let stamp = stamps.issue();
        record.stamp(stamp);

        if record.is_deleted() {
            ledger.record_deletion(kind, &id, stamp);
            working.shift_remove(&id);
            stats.tombstoned += 1;
            tracing::debug!(entity = kind.as_str(), id = %id, "Tombstoned record");
            continue;
        }

        if ledger.suppresses(kind, &id, stamp) {
            stats.rejected += 1;
            tracing::debug!(entity = kind.as_str(), id = %id, "Rejected tombstoned record");
            continue;
        }

        match working.get_mut(&id) {
            Some(existing) if existing.updated_at() > stamp => {
                stats.kept_existing += 1;
                tracing::debug!(
                    entity = kind.as_str(),
                    id = %id,
                    existing = existing.updated_at(),
                    incoming = stamp,
                    "Kept newer server record"
                );
            }
            Some(existing) => {
                *existing = record;
                stats.upserted += 1;
            }
            None => {
                working.insert(id, record);
                stats.upserted += 1;
            }
        }
    }

    (working.into_values().collect(), stats)
}
