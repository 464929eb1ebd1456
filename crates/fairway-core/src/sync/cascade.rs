//! Booking referential integrity
//!
//! Runs after every collection has been merged. Children whose booking is
//! deleted (pass A) or simply absent (pass B) are tombstoned and removed.
//! Parents are never resurrected to satisfy a child.

use std::collections::HashSet;

use serde::Serialize;

use crate::clock::StampIssuer;
use crate::models::{BookingChild, EntityKind, Snapshot, SyncRecord, TombstoneLedger};

/// Children removed by the integrity passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Children of bookings with an active deletion tombstone.
    pub cascaded: usize,
    /// Children pointing at bookings that do not exist.
    pub orphaned: usize,
}

impl CascadeReport {
    pub const fn total(&self) -> usize {
        self.cascaded + self.orphaned
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Cascade,
    Integrity,
}

/// Lazily issued stamp shared by every tombstone one pass writes.
struct PassStamp<'s, 'c> {
    stamps: &'s mut StampIssuer<'c>,
    issued: Option<i64>,
}

impl PassStamp<'_, '_> {
    fn get(&mut self) -> i64 {
        *self.issued.get_or_insert_with(|| self.stamps.issue())
    }
}

/// Apply both integrity passes to `snapshot`.
pub fn enforce_booking_integrity(
    snapshot: &mut Snapshot,
    stamps: &mut StampIssuer<'_>,
) -> CascadeReport {
    let live_bookings: HashSet<String> = snapshot
        .bookings
        .iter()
        .filter_map(SyncRecord::id)
        .map(str::to_owned)
        .collect();

    // A tombstone overridden by a newer live booking is no longer active.
    let deleted_bookings: HashSet<String> = snapshot
        .tombstones
        .deleted_ids(EntityKind::Bookings)
        .filter(|id| !live_bookings.contains(*id))
        .map(str::to_owned)
        .collect();

    let mut report = CascadeReport::default();

    if !deleted_bookings.is_empty() {
        tracing::debug!(
            deleted_bookings = deleted_bookings.len(),
            "Checking deleted bookings for cascades"
        );
        let mut stamp = PassStamp {
            stamps: &mut *stamps,
            issued: None,
        };
        let is_deleted = |booking_id: &str| deleted_bookings.contains(booking_id);
        report.cascaded = remove_children_where(snapshot, &mut stamp, is_deleted, Pass::Cascade);
    }

    let mut stamp = PassStamp {
        stamps,
        issued: None,
    };
    let is_missing = |booking_id: &str| !live_bookings.contains(booking_id);
    report.orphaned = remove_children_where(snapshot, &mut stamp, is_missing, Pass::Integrity);

    report
}

fn remove_children_where(
    snapshot: &mut Snapshot,
    stamp: &mut PassStamp<'_, '_>,
    doomed: impl Fn(&str) -> bool,
    pass: Pass,
) -> usize {
    let ledger = &mut snapshot.tombstones;
    remove_from(&mut snapshot.schedule_items, ledger, stamp, &doomed, pass)
        + remove_from(&mut snapshot.caddies, ledger, stamp, &doomed, pass)
        + remove_from(&mut snapshot.waitlist, ledger, stamp, &doomed, pass)
}

fn remove_from<R: BookingChild>(
    records: &mut Vec<R>,
    ledger: &mut TombstoneLedger,
    stamp: &mut PassStamp<'_, '_>,
    doomed: &impl Fn(&str) -> bool,
    pass: Pass,
) -> usize {
    let kind = R::KIND;
    let before = records.len();

    records.retain(|record| {
        let Some(booking_id) = record.booking_id().filter(|booking_id| doomed(booking_id)) else {
            return true;
        };
        if let Some(id) = record.id() {
            ledger.record_deletion(kind, id, stamp.get());
            match pass {
                Pass::Cascade => tracing::info!(
                    entity = kind.as_str(),
                    id,
                    booking_id,
                    "Tombstoned child of deleted booking"
                ),
                Pass::Integrity => tracing::warn!(
                    entity = kind.as_str(),
                    id,
                    booking_id,
                    "Tombstoned child referencing missing booking"
                ),
            }
        }
        false
    });

    before - records.len()
}
