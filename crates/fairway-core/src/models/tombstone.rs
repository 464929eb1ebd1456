//! Tombstone ledger
//!
//! Deletions are recorded per entity kind as `id -> {deleted, updatedAt}`.
//! A deletion tombstone suppresses any record with the same id whose
//! `updatedAt` is not strictly newer than the tombstone.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::kind::EntityKind;
use super::wire;

/// Deletion marker for a single record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    #[serde(default, deserialize_with = "wire::flag")]
    pub deleted: bool,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
}

impl Tombstone {
    #[must_use]
    pub const fn deleted_at(updated_at: i64) -> Self {
        Self {
            deleted: true,
            updated_at,
        }
    }

    /// Whether this tombstone wins over a record stamped at `record_updated_at`.
    pub const fn suppresses(&self, record_updated_at: i64) -> bool {
        self.deleted && self.updated_at >= record_updated_at
    }
}

/// Per-kind tombstone map stored under `tombstones` in the snapshot.
///
/// Keys that name no known collection are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TombstoneLedger {
    entries: BTreeMap<EntityKind, BTreeMap<String, Tombstone>>,
}

impl<'de> Deserialize<'de> for TombstoneLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (name, tombstones) in raw {
            let Ok(kind) = EntityKind::from_str(&name) else {
                tracing::debug!(entity = %name, "Ignoring tombstones for unknown collection");
                continue;
            };
            let tombstones = serde_json::from_value(tombstones).map_err(D::Error::custom)?;
            entries.insert(kind, tombstones);
        }
        Ok(Self { entries })
    }
}

impl TombstoneLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Tombstone> {
        self.entries.get(&kind)?.get(id)
    }

    /// Record (or overwrite) a deletion of `id` at `at`.
    pub fn record_deletion(&mut self, kind: EntityKind, id: &str, at: i64) {
        self.entries
            .entry(kind)
            .or_default()
            .insert(id.to_string(), Tombstone::deleted_at(at));
    }

    /// Whether a record of `kind`/`id` stamped at `updated_at` is dead.
    pub fn suppresses(&self, kind: EntityKind, id: &str, updated_at: i64) -> bool {
        self.get(kind, id)
            .is_some_and(|tombstone| tombstone.suppresses(updated_at))
    }

    /// Ids of `kind` with a deletion tombstone.
    pub fn deleted_ids(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        self.entries
            .get(&kind)
            .into_iter()
            .flat_map(|tombstones| tombstones.iter())
            .filter(|(_, tombstone)| tombstone.deleted)
            .map(|(id, _)| id.as_str())
    }

    /// Drop tombstones stamped before `cutoff`. Returns how many were removed.
    pub fn prune_older_than(&mut self, cutoff: i64) -> usize {
        let mut removed = 0;
        for tombstones in self.entries.values_mut() {
            let before = tombstones.len();
            tombstones.retain(|_, tombstone| tombstone.updated_at >= cutoff);
            removed += before - tombstones.len();
        }
        self.entries.retain(|_, tombstones| !tombstones.is_empty());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn tombstone_wins_ties_and_loses_to_newer_records() {
        let tombstone = Tombstone::deleted_at(200);
        assert!(tombstone.suppresses(100));
        assert!(tombstone.suppresses(200));
        assert!(!tombstone.suppresses(201));
    }

    #[test]
    fn cleared_tombstone_suppresses_nothing() {
        let tombstone = Tombstone {
            deleted: false,
            updated_at: 500,
        };
        assert!(!tombstone.suppresses(1));
    }

    #[test]
    fn record_deletion_overwrites_existing_entry() {
        let mut ledger = TombstoneLedger::new();
        ledger.record_deletion(EntityKind::Bookings, "B1", 100);
        ledger.record_deletion(EntityKind::Bookings, "B1", 300);

        assert_eq!(
            ledger.get(EntityKind::Bookings, "B1"),
            Some(&Tombstone::deleted_at(300))
        );
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(EntityKind::Caddies, "B1").is_none());
    }

    #[test]
    fn deleted_ids_skip_cleared_entries() {
        let ledger: TombstoneLedger = serde_json::from_value(json!({
            "bookings": {
                "B1": {"deleted": true, "updatedAt": 10},
                "B2": {"deleted": false, "updatedAt": 20}
            }
        }))
        .unwrap();

        let ids: Vec<&str> = ledger.deleted_ids(EntityKind::Bookings).collect();
        assert_eq!(ids, vec!["B1"]);
        assert_eq!(ledger.deleted_ids(EntityKind::Waitlist).count(), 0);
    }

    #[test]
    fn unknown_collections_are_dropped_on_load() {
        let ledger: TombstoneLedger = serde_json::from_value(json!({
            "bookings": {"B1": {"deleted": true, "updatedAt": 10}},
            "tee_sheets": {"T1": {"deleted": true, "updatedAt": 10}}
        }))
        .unwrap();

        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(EntityKind::Bookings, "B1").is_some());
        assert_eq!(
            serde_json::to_value(&ledger).unwrap(),
            json!({"bookings": {"B1": {"deleted": true, "updatedAt": 10}}})
        );
    }

    #[test]
    fn prune_removes_only_expired_entries() {
        let mut ledger = TombstoneLedger::new();
        ledger.record_deletion(EntityKind::Bookings, "old", 10);
        ledger.record_deletion(EntityKind::Bookings, "fresh", 1_000);
        ledger.record_deletion(EntityKind::Waitlist, "old", 5);

        assert_eq!(ledger.prune_older_than(500), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.deleted_ids(EntityKind::Waitlist).count(), 0);
        assert!(ledger.get(EntityKind::Bookings, "fresh").is_some());

        assert_eq!(ledger.prune_older_than(500), 0);
    }

    #[test]
    fn ledger_serializes_as_nested_maps() {
        let mut ledger = TombstoneLedger::new();
        ledger.record_deletion(EntityKind::ScheduleItems, "S1", 42);
        assert_eq!(
            serde_json::to_value(&ledger).unwrap(),
            json!({"schedule_items": {"S1": {"deleted": true, "updatedAt": 42}}})
        );
    }
}
