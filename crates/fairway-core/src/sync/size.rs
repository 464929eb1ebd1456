//! Snapshot byte budget

use crate::models::Snapshot;
use crate::util::rounded_kib;
use crate::{Error, Result};

/// Default ceiling for a persisted snapshot (1 MiB).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 1024 * 1024;

/// Serialized snapshot ready to hand to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSnapshot {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// Rejects snapshots whose serialized form exceeds a fixed byte ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    limit: usize,
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOT_BYTES)
    }
}

impl SizeGuard {
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Serialize `snapshot` and admit it only if it fits the budget.
    ///
    /// The returned bytes are exactly what was measured, so the store persists
    /// the document the check approved.
    pub fn encode(&self, snapshot: &Snapshot) -> Result<EncodedSnapshot> {
        let bytes = snapshot.to_bytes()?;
        if bytes.len() > self.limit {
            tracing::warn!(
                size = bytes.len(),
                limit = self.limit,
                version = snapshot.version,
                "Merged snapshot exceeds size limit"
            );
            return Err(Error::PayloadTooLarge {
                size: bytes.len(),
                limit: self.limit,
            });
        }
        Ok(EncodedSnapshot {
            version: snapshot.version,
            bytes,
        })
    }
}

/// Human-facing message for a rejected snapshot, in whole KiB.
pub fn too_large_message(size: usize, limit: usize) -> String {
    format!(
        "Data size {}KB exceeds {}KB limit",
        rounded_kib(size),
        rounded_kib(limit)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Booking;

    fn padded_snapshot(padding: usize) -> Snapshot {
        let mut snapshot = Snapshot::empty(0);
        snapshot
            .bookings
            .push(Booking::new("B1").with_field("notes", "x".repeat(padding)));
        snapshot
    }

    #[test]
    fn snapshot_within_budget_is_encoded() {
        let snapshot = padded_snapshot(10);
        let encoded = SizeGuard::new(4_096).encode(&snapshot).unwrap();
        assert_eq!(encoded.bytes, snapshot.to_bytes().unwrap());
        assert_eq!(encoded.version, 0);
    }

    #[test]
    fn exact_limit_is_allowed() {
        let snapshot = padded_snapshot(10);
        let size = snapshot.to_bytes().unwrap().len();
        assert!(SizeGuard::new(size).encode(&snapshot).is_ok());
        assert!(matches!(
            SizeGuard::new(size - 1).encode(&snapshot),
            Err(Error::PayloadTooLarge { limit, .. }) if limit == size - 1
        ));
    }

    #[test]
    fn oversize_snapshot_reports_size_and_limit() {
        let snapshot = padded_snapshot(DEFAULT_MAX_SNAPSHOT_BYTES);
        match SizeGuard::default().encode(&snapshot) {
            Err(Error::PayloadTooLarge { size, limit }) => {
                assert!(size > limit);
                assert_eq!(limit, DEFAULT_MAX_SNAPSHOT_BYTES);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn message_uses_rounded_kib() {
        assert_eq!(
            too_large_message(1_200_000, DEFAULT_MAX_SNAPSHOT_BYTES),
            "Data size 1172KB exceeds 1024KB limit"
        );
    }
}
