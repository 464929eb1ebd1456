//! Data models for Fairway

mod kind;
mod record;
mod snapshot;
mod tombstone;
mod wire;

pub use kind::EntityKind;
pub use record::{
    Booking, BookingChild, CaddyAssignment, EmergencyAlert, ScheduleItem, SyncRecord, UserProfile,
    WaitlistEntry,
};
pub use snapshot::{Snapshot, SnapshotStats};
pub use tombstone::{Tombstone, TombstoneLedger};
