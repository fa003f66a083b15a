//! Time management for the monitoring loop
//!
//! Provides a clock abstraction so the same rule graph can run against:
//! - System clock (production)
//! - Manual clock (tests, replay of recorded telemetry)
//!
//! Rules and monitors never read the clock themselves. The monitor samples its
//! [`TimeSource`] once per trigger and passes that instant down to every
//! ruleset and rule it evaluates, so one trigger sees one consistent "now".

use core::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since epoch (or since an arbitrary origin for manual clocks)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic/manual)
    fn is_wall_clock(&self) -> bool;
}

/// Wall clock time source
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven time source
///
/// Shared between threads through `Arc`; `set`/`advance` take `&self`.
#[derive(Debug, Default)]
pub struct ManualClock {
    timestamp: AtomicU64,
}

impl ManualClock {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Milliseconds elapsed from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
