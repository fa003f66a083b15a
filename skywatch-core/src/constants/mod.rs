//! Constants for Skywatch Core
//!
//! Centralised numeric values used by filters, monitors and the scheduler.
//! All values are in milliseconds unless the name says otherwise.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Time**: scheduler interval, monitor rate limiting
//! - **Buffers**: capacity limits for value tables and multiplexers
//! - **States**: discrete encodings shared by debounce filters and rules

/// Time-related constants for intervals and rate limiting.
pub mod time;

/// Capacity limits for fixed-size tables.
pub mod buffers;

/// Discrete state encodings.
pub mod states;

pub use time::{DEFAULT_MONITOR_PERIOD_MS, DEFAULT_SCHEDULER_INTERVAL_MS, MONITOR_RATE_LIMIT_FRACTION};

pub use buffers::{MAX_MUX_INPUTS, MAX_VALID_VALUES, MAX_WEIGHTS};

pub use states::{STATE_BAD, STATE_GOOD};
