//! Typed entity records
//!
//! Each collection has its own record type. All of them share the sync
//! envelope (`id`/`userId`, `updatedAt`, `deleted`) and keep every other field
//! the client sent in a flattened side-channel map, so domain fields survive a
//! merge untouched.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::EntityKind;
use super::wire;

/// Shared view of a synchronized record.
pub trait SyncRecord: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Collection this record type belongs to.
    const KIND: EntityKind;

    /// Identifying value, or `None` when the record has no usable id.
    fn id(&self) -> Option<&str>;

    /// Server-assigned modification time (Unix ms).
    fn updated_at(&self) -> i64;

    /// Overwrite the modification time with a server stamp.
    fn stamp(&mut self, updated_at: i64);

    /// Whether the client flagged this record as a deletion.
    fn is_deleted(&self) -> bool;
}

/// Record that may hang off a booking through `bookingId`.
pub trait BookingChild: SyncRecord {
    fn booking_id(&self) -> Option<&str>;
}

/// A tee-time booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(default, deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A staff, golfer, or caddy profile keyed by `userId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "wire::id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A schedule entry, usually tied to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    #[serde(default, deserialize_with = "wire::id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "wire::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub booking_id: Option<String>,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A course-wide emergency alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    #[serde(default, deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A caddy row, optionally assigned to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaddyAssignment {
    #[serde(default, deserialize_with = "wire::id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "wire::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub booking_id: Option<String>,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A waitlist entry, optionally waiting on a specific booking slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    #[serde(default, deserialize_with = "wire::id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "wire::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub booking_id: Option<String>,
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "wire::flag",
        skip_serializing_if = "wire::is_false"
    )]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

macro_rules! impl_sync_record {
    ($record:ty, $kind:expr, $id:ident) => {
        impl SyncRecord for $record {
            const KIND: EntityKind = $kind;

            fn id(&self) -> Option<&str> {
                Some(self.$id.as_str()).filter(|id| !id.is_empty())
            }

            fn updated_at(&self) -> i64 {
                self.updated_at
            }

            fn stamp(&mut self, updated_at: i64) {
                self.updated_at = updated_at;
            }

            fn is_deleted(&self) -> bool {
                self.deleted
            }
        }

        impl $record {
            /// Set an arbitrary domain field.
            #[must_use]
            pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.fields.insert(key.into(), value.into());
                self
            }

            /// Mark this record as a deletion request.
            #[must_use]
            pub fn mark_deleted(mut self) -> Self {
                self.deleted = true;
                self
            }
        }
    };
}

macro_rules! impl_booking_child {
    ($record:ty) => {
        impl BookingChild for $record {
            fn booking_id(&self) -> Option<&str> {
                self.booking_id.as_deref()
            }
        }

        impl $record {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self {
                    id: id.into(),
                    booking_id: None,
                    updated_at: 0,
                    deleted: false,
                    fields: Map::new(),
                }
            }

            /// Link this record to a booking.
            #[must_use]
            pub fn for_booking(mut self, booking_id: impl Into<String>) -> Self {
                self.booking_id = Some(booking_id.into());
                self
            }
        }
    };
}

impl_sync_record!(Booking, EntityKind::Bookings, id);
impl_sync_record!(UserProfile, EntityKind::UserProfiles, user_id);
impl_sync_record!(ScheduleItem, EntityKind::ScheduleItems, id);
impl_sync_record!(EmergencyAlert, EntityKind::EmergencyAlerts, id);
impl_sync_record!(CaddyAssignment, EntityKind::Caddies, id);
impl_sync_record!(WaitlistEntry, EntityKind::Waitlist, id);

impl_booking_child!(ScheduleItem);
impl_booking_child!(CaddyAssignment);
impl_booking_child!(WaitlistEntry);

impl Booking {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            updated_at: 0,
            deleted: false,
            fields: Map::new(),
        }
    }
}

impl UserProfile {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            updated_at: 0,
            deleted: false,
            fields: Map::new(),
        }
    }
}

impl EmergencyAlert {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            updated_at: 0,
            deleted: false,
            fields: Map::new(),
        }
    }
}
