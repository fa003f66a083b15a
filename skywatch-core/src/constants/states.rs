//! Discrete State Encodings
//!
//! External subsystems (weather monitoring system, enclosure, power) report a
//! GOOD/BAD state as a discrete reading. Debounce filters consume and produce
//! these encodings.

/// Discrete value meaning "subsystem reports GOOD".
pub const STATE_GOOD: i32 = 1;

/// Discrete value meaning "subsystem reports BAD".
pub const STATE_BAD: i32 = 0;
