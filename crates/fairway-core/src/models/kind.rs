//! Entity collection kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the six synchronized collections in a snapshot.
///
/// The serialized name doubles as the collection's field name in the
/// snapshot document and as its key in the tombstone ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bookings,
    UserProfiles,
    ScheduleItems,
    EmergencyAlerts,
    Caddies,
    Waitlist,
}

impl EntityKind {
    /// Every kind, in merge order.
    pub const ALL: [Self; 6] = [
        Self::Bookings,
        Self::UserProfiles,
        Self::ScheduleItems,
        Self::EmergencyAlerts,
        Self::Caddies,
        Self::Waitlist,
    ];

    /// Kinds whose records may reference a booking through `bookingId`.
    pub const BOOKING_CHILDREN: [Self; 3] = [Self::ScheduleItems, Self::Caddies, Self::Waitlist];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bookings => "bookings",
            Self::UserProfiles => "user_profiles",
            Self::ScheduleItems => "schedule_items",
            Self::EmergencyAlerts => "emergency_alerts",
            Self::Caddies => "caddies",
            Self::Waitlist => "waitlist",
        }
    }

    /// Name of the identifying field on records of this kind.
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::UserProfiles => "userId",
            _ => "id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind: {s}"))
    }
}
