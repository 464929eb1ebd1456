//! fairway-core - Core library for Fairway
//!
//! This crate contains the snapshot models, tombstone ledger, merge engine and
//! snapshot stores shared by the Fairway HTTP API and the operator CLI.

pub mod clock;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use models::{EntityKind, Snapshot, SnapshotStats, Tombstone, TombstoneLedger};
pub use sync::{MergeReceipt, SyncRequest, SyncService, SyncSettings};
