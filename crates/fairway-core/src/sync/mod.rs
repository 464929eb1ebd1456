//! Snapshot synchronization
//!
//! Clients fetch the whole snapshot, edit locally, and push deltas together
//! with the version they started from. A push is admitted only when that base
//! version is current; admitted deltas are merged record by record with
//! server-issued timestamps, deletions become tombstones, and booking children
//! follow their parent booking.

mod cascade;
mod merge;
mod push;
mod request;
mod service;
mod size;
mod version;

pub use cascade::{enforce_booking_integrity, CascadeReport};
pub use merge::{merge_collection, MergeStats};
pub use push::{apply_push, MergeReport};
pub use request::{ClientDeltas, SyncRequest};
pub use service::{MergeReceipt, SyncService, SyncSettings, DEFAULT_TOMBSTONE_RETENTION};
pub use size::{too_large_message, EncodedSnapshot, SizeGuard, DEFAULT_MAX_SNAPSHOT_BYTES};
pub use version::{check_base_version, StaleBase};
