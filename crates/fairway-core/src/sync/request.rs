//! Client push payloads

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{
    Booking, CaddyAssignment, EmergencyAlert, EntityKind, ScheduleItem, UserProfile,
    WaitlistEntry,
};
use crate::{Error, Result};

/// Records a client submits for merging, one list per collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientDeltas {
    pub bookings: Vec<Booking>,
    pub user_profiles: Vec<UserProfile>,
    pub schedule_items: Vec<ScheduleItem>,
    pub emergency_alerts: Vec<EmergencyAlert>,
    pub caddies: Vec<CaddyAssignment>,
    pub waitlist: Vec<WaitlistEntry>,
}

impl ClientDeltas {
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
            && self.user_profiles.is_empty()
            && self.schedule_items.is_empty()
            && self.emergency_alerts.is_empty()
            && self.caddies.is_empty()
            && self.waitlist.is_empty()
    }
}

/// A parsed `Sync(baseVersion, deltas)` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    /// Version the client's copy was derived from.
    pub base_version: f64,
    pub deltas: ClientDeltas,
}

impl SyncRequest {
    #[must_use]
    pub fn new(base_version: u64, deltas: ClientDeltas) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let base_version = base_version as f64;
        Self {
            base_version,
            deltas,
        }
    }

    /// Parse a raw request body. An empty body reads as `{}`.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let body = if body.is_empty() { b"{}".as_slice() } else { body };
        let value: Value = serde_json::from_slice(body)
            .map_err(|error| Error::MalformedInput(error.to_string()))?;
        Self::from_value(value)
    }

    /// Build a request from an already-parsed JSON value.
    ///
    /// Collections that are present but not arrays are treated as empty, and
    /// array elements that are not objects are skipped.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(Error::InvalidBaseVersion);
        };

        let base_version = body
            .get("baseVersion")
            .and_then(Value::as_f64)
            .ok_or(Error::InvalidBaseVersion)?;

        let deltas = ClientDeltas {
            bookings: take_collection(&mut body, EntityKind::Bookings),
            user_profiles: take_collection(&mut body, EntityKind::UserProfiles),
            schedule_items: take_collection(&mut body, EntityKind::ScheduleItems),
            emergency_alerts: take_collection(&mut body, EntityKind::EmergencyAlerts),
            caddies: take_collection(&mut body, EntityKind::Caddies),
            waitlist: take_collection(&mut body, EntityKind::Waitlist),
        };

        Ok(Self {
            base_version,
            deltas,
        })
    }

    /// Wire form of this request, as sent by clients.
    pub fn to_value(&self) -> Result<Value> {
        let mut body = match serde_json::to_value(&self.deltas)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("baseVersion".to_string(), Value::from(self.base_version));
        Ok(Value::Object(body))
    }
}

fn take_collection<R: DeserializeOwned>(body: &mut Map<String, Value>, kind: EntityKind) -> Vec<R> {
    let Some(Value::Array(items)) = body.remove(kind.as_str()) else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::debug!(entity = kind.as_str(), %error, "Skipping undecodable record");
                None
            }
        })
        .collect()
}
