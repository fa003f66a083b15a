//! Buffer Sizes and Table Limits
//!
//! Discrete filters, weighted filters and multiplexers keep their tables in
//! fixed-capacity `heapless` collections. These limits bound those tables;
//! exceeding one is a configuration error, never a runtime failure.

// ===== DISCRETE VALUE TABLES =====

/// Maximum number of valid values a modal or steady-state filter accepts.
///
/// Must be a power of two: the modal filter counts occurrences in a
/// `heapless::FnvIndexMap` of this capacity.
pub const MAX_VALID_VALUES: usize = 32;

/// Maximum number of members in an any-of rule set.
pub const MAX_ANYOF_VALUES: usize = 16;

// ===== WEIGHTED COMBINATIONS =====

/// Maximum number of weights in a weighted averaging filter.
pub const MAX_WEIGHTS: usize = 64;

/// Maximum number of sub-filters a multiplexer combines.
pub const MAX_MUX_INPUTS: usize = 16;

// ===== SAMPLE BUFFERS =====

/// Upper bound on a count-based filter buffer.
///
/// Guards against a typo like `AVER 100000` allocating an enormous deque.
pub const MAX_FILTER_SAMPLES: usize = 10_000;

const _: () = assert!(
    MAX_VALID_VALUES.is_power_of_two(),
    "valid value table capacity must be a power of 2"
);
