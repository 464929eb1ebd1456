//! Pure merge of one admitted push into a snapshot

use std::collections::BTreeMap;

use serde::Serialize;

use super::cascade::{enforce_booking_integrity, CascadeReport};
use super::merge::{merge_collection, MergeStats};
use super::request::ClientDeltas;
use crate::clock::{Clock, StampIssuer};
use crate::models::{EntityKind, Snapshot};
use crate::util::rfc3339_from_millis;

/// Everything a merge did, per collection plus the integrity passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub collections: BTreeMap<EntityKind, MergeStats>,
    pub cascade: CascadeReport,
}

impl MergeReport {
    /// Number of incoming records that changed the snapshot.
    pub fn applied(&self) -> usize {
        self.collections
            .values()
            .map(|stats| stats.upserted + stats.tombstoned)
            .sum()
    }
}

/// Merge `deltas` into `snapshot` and produce the next version.
///
/// Collections merge in a fixed order (bookings first), then the booking
/// integrity passes run over the merged result. The caller is responsible for
/// the version gate, size check and persistence.
pub fn apply_push(
    mut snapshot: Snapshot,
    deltas: ClientDeltas,
    clock: &dyn Clock,
) -> (Snapshot, MergeReport) {
    let mut stamps = StampIssuer::new(clock, snapshot.updated_at);
    let mut report = MergeReport::default();
    let ClientDeltas {
        bookings,
        user_profiles,
        schedule_items,
        emergency_alerts,
        caddies,
        waitlist,
    } = deltas;

    let ledger = &mut snapshot.tombstones;

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.bookings),
        bookings,
        ledger,
        &mut stamps,
    );
    snapshot.bookings = merged;
    report.collections.insert(EntityKind::Bookings, stats);

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.user_profiles),
        user_profiles,
        ledger,
        &mut stamps,
    );
    snapshot.user_profiles = merged;
    report.collections.insert(EntityKind::UserProfiles, stats);

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.schedule_items),
        schedule_items,
        ledger,
        &mut stamps,
    );
    snapshot.schedule_items = merged;
    report.collections.insert(EntityKind::ScheduleItems, stats);

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.emergency_alerts),
        emergency_alerts,
        ledger,
        &mut stamps,
    );
    snapshot.emergency_alerts = merged;
    report.collections.insert(EntityKind::EmergencyAlerts, stats);

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.caddies),
        caddies,
        ledger,
        &mut stamps,
    );
    snapshot.caddies = merged;
    report.collections.insert(EntityKind::Caddies, stats);

    let (merged, stats) = merge_collection(
        std::mem::take(&mut snapshot.waitlist),
        waitlist,
        ledger,
        &mut stamps,
    );
    snapshot.waitlist = merged;
    report.collections.insert(EntityKind::Waitlist, stats);

    report.cascade = enforce_booking_integrity(&mut snapshot, &mut stamps);

    let updated_at = stamps.last().max(clock.now_millis());
    snapshot.version += 1;
    snapshot.updated_at = updated_at;
    snapshot.server_updated_at = rfc3339_from_millis(updated_at);

    (snapshot, report)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Booking, ScheduleItem, SyncRecord, Tombstone, UserProfile};

    fn stamped<R: SyncRecord>(mut record: R, at: i64) -> R {
        record.stamp(at);
        record
    }

    #[test]
    fn push_bumps_version_and_stamps_server_time() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut snapshot = Snapshot::empty(0);
        snapshot.version = 7;

        let deltas = ClientDeltas {
            bookings: vec![Booking::new("B1").with_field("player", "Somchai")],
            ..ClientDeltas::default()
        };
        let (merged, report) = apply_push(snapshot, deltas, &clock);

        assert_eq!(merged.version, 8);
        assert_eq!(merged.updated_at, 1_700_000_000_000);
        assert_eq!(
            merged.server_updated_at.as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(merged.bookings[0].updated_at(), 1_700_000_000_000);
        assert_eq!(report.applied(), 1);
    }

    #[test]
    fn empty_push_still_advances_version() {
        let clock = ManualClock::new(50);
        let mut snapshot = Snapshot::empty(10);
        snapshot.version = 2;

        let (merged, report) = apply_push(snapshot, ClientDeltas::default(), &clock);

        assert_eq!(merged.version, 3);
        assert_eq!(merged.updated_at, 50);
        assert_eq!(report.applied(), 0);
        assert_eq!(report.collections.len(), EntityKind::ALL.len());
    }

    #[test]
    fn deleting_a_booking_cascades_to_its_children() {
        let clock = ManualClock::new(2_000);
        let mut snapshot = Snapshot::empty(1_000);
        snapshot.version = 3;
        snapshot.bookings.push(stamped(Booking::new("B1"), 900));
        snapshot
            .schedule_items
            .push(stamped(ScheduleItem::new("S1").for_booking("B1"), 900));

        let deltas = ClientDeltas {
            bookings: vec![Booking::new("B1").mark_deleted()],
            ..ClientDeltas::default()
        };
        let (merged, report) = apply_push(snapshot, deltas, &clock);

        assert_eq!(merged.version, 4);
        assert!(merged.bookings.is_empty());
        assert!(merged.schedule_items.is_empty());
        assert_eq!(report.cascade.cascaded, 1);
        assert_eq!(
            merged.tombstones.get(EntityKind::Bookings, "B1"),
            Some(&Tombstone::deleted_at(2_000))
        );
        assert_eq!(
            merged.tombstones.get(EntityKind::ScheduleItems, "S1"),
            Some(&Tombstone::deleted_at(2_001))
        );
        assert_eq!(merged.updated_at, 2_001);
    }

    #[test]
    fn lagging_clock_never_moves_updated_at_backwards() {
        let clock = ManualClock::new(100);
        let snapshot = Snapshot::empty(5_000);

        let deltas = ClientDeltas {
            user_profiles: vec![UserProfile::new("U1")],
            ..ClientDeltas::default()
        };
        let (merged, _) = apply_push(snapshot, deltas, &clock);

        assert_eq!(merged.user_profiles[0].updated_at(), 5_001);
        assert_eq!(merged.updated_at, 5_001);
    }
}
