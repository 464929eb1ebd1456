//! Server-side time sources for merge timestamps.
//!
//! Record and tombstone timestamps are never taken from clients. Every merge
//! draws them from a [`StampIssuer`], which wraps a wall clock and guarantees
//! that stamps handed out during one merge are strictly increasing and never
//! fall below the snapshot's previous `updatedAt`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Wall-clock source in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and offline tooling.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_millis)),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Issues merge timestamps for a single merge.
pub struct StampIssuer<'a> {
    clock: &'a dyn Clock,
    last: i64,
}

impl<'a> StampIssuer<'a> {
    /// Create an issuer whose first stamp is strictly greater than `floor`.
    pub fn new(clock: &'a dyn Clock, floor: i64) -> Self {
        Self { clock, last: floor }
    }

    /// Next stamp: the current wall time, bumped past the previous stamp if
    /// the clock has not moved or went backwards.
    pub fn issue(&mut self) -> i64 {
        let stamp = self.clock.now_millis().max(self.last.saturating_add(1));
        self.last = stamp;
        stamp
    }

    /// Most recent stamp issued, or the floor when none was issued yet.
    pub const fn last(&self) -> i64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_follow_wall_clock_when_it_advances() {
        let clock = ManualClock::new(1_000);
        let mut stamps = StampIssuer::new(&clock, 0);
        assert_eq!(stamps.issue(), 1_000);
        clock.advance(50);
        assert_eq!(stamps.issue(), 1_050);
    }

    #[test]
    fn stamps_are_strictly_increasing_on_a_frozen_clock() {
        let clock = ManualClock::new(1_000);
        let mut stamps = StampIssuer::new(&clock, 0);
        let issued: Vec<i64> = (0..4).map(|_| stamps.issue()).collect();
        assert_eq!(issued, vec![1_000, 1_001, 1_002, 1_003]);
        assert_eq!(stamps.last(), 1_003);
    }

    #[test]
    fn stamps_never_fall_below_floor() {
        let clock = ManualClock::new(500);
        let mut stamps = StampIssuer::new(&clock, 9_000);
        assert_eq!(stamps.last(), 9_000);
        assert_eq!(stamps.issue(), 9_001);
    }
}
