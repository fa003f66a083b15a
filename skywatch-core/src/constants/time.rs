//! Time-Related Constants
//!
//! Intervals and fractions used by the monitor scheduler and the monitors it
//! drives.

// ===== SCHEDULING =====

/// Default pause between two scheduler passes (milliseconds).
///
/// One pass per second keeps weather and enclosure rules responsive without
/// sampling slow feeds faster than they update.
pub const DEFAULT_SCHEDULER_INTERVAL_MS: u64 = 1000;

/// Fraction of a monitor's period that must elapse before it evaluates again.
///
/// A monitor woken early (data-available notification, or several wakes in a
/// row) returns immediately unless more than half its period has passed since
/// the last evaluation.
pub const MONITOR_RATE_LIMIT_FRACTION: f64 = 0.5;

/// Default monitor period when none is configured (milliseconds).
pub const DEFAULT_MONITOR_PERIOD_MS: u64 = 10_000;
