//! Snapshot document

use serde::{Deserialize, Serialize};

use super::record::{
    Booking, CaddyAssignment, EmergencyAlert, ScheduleItem, UserProfile, WaitlistEntry,
};
use super::tombstone::TombstoneLedger;
use crate::Result;

/// The single authoritative dataset shared by every client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub user_profiles: Vec<UserProfile>,
    #[serde(default)]
    pub schedule_items: Vec<ScheduleItem>,
    #[serde(default)]
    pub emergency_alerts: Vec<EmergencyAlert>,
    #[serde(default)]
    pub caddies: Vec<CaddyAssignment>,
    #[serde(default)]
    pub waitlist: Vec<WaitlistEntry>,
    #[serde(default)]
    pub tombstones: TombstoneLedger,
    /// Concurrency token, bumped by exactly one per successful merge.
    #[serde(default)]
    pub version: u64,
    /// Time of the last successful merge (Unix ms).
    #[serde(default, rename = "updatedAt")]
    pub updated_at: i64,
    #[serde(
        default,
        rename = "serverUpdatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_updated_at: Option<String>,
}

/// Per-collection record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub version: u64,
    pub bookings: usize,
    pub user_profiles: usize,
    pub schedule_items: usize,
    pub emergency_alerts: usize,
    pub caddies: usize,
    pub waitlist: usize,
    pub tombstones: usize,
}

impl Snapshot {
    /// Snapshot served before anything has been persisted.
    #[must_use]
    pub fn empty(now_millis: i64) -> Self {
        Self {
            updated_at: now_millis,
            ..Self::default()
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            version: self.version,
            bookings: self.bookings.len(),
            user_profiles: self.user_profiles.len(),
            schedule_items: self.schedule_items.len(),
            emergency_alerts: self.emergency_alerts.len(),
            caddies: self.caddies.len(),
            waitlist: self.waitlist.len(),
            tombstones: self.tombstones.len(),
        }
    }

    /// Drop tombstones older than `retention_millis` relative to `now_millis`.
    pub fn prune_tombstones(&mut self, now_millis: i64, retention_millis: i64) -> usize {
        self.tombstones
            .prune_older_than(now_millis.saturating_sub(retention_millis))
    }
}
