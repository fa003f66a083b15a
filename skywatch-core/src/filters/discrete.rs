//! Discrete-state strategies: modal, steady-state and timed steady-state
//!
//! All three work on the `discrete` field of buffered readings and only count
//! values present in the filter's [`ValueTable`]. Anything else (a sensor
//! reporting an undocumented state code) is skipped, not counted and not an
//! error. When no decision can be made they return the configured default.

use heapless::FnvIndexMap;

use crate::buffer::ReadingBuffer;
use crate::constants::buffers::MAX_VALID_VALUES;
use crate::errors::{ConfigError, ConfigResult};

/// Set of discrete values a filter recognises, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTable {
    values: heapless::Vec<i32, MAX_VALID_VALUES>,
}

impl ValueTable {
    /// Build a table; duplicates are dropped, order is kept
    pub fn new(values: &[i32]) -> ConfigResult<Self> {
        if values.is_empty() {
            return Err(ConfigError::invalid("value table", "no valid values given"));
        }

        let mut table = heapless::Vec::new();
        for &value in values {
            if table.contains(&value) {
                continue;
            }
            table.push(value).map_err(|_| {
                ConfigError::invalid(
                    "value table",
                    format!("more than {} valid values", MAX_VALID_VALUES),
                )
            })?;
        }
        Ok(Self { values: table })
    }

    /// Whether `value` is recognised
    pub fn contains(&self, value: i32) -> bool {
        self.values.contains(&value)
    }

    /// Recognised values in declaration order
    pub fn values(&self) -> &[i32] {
        &self.values
    }
}

type Tally = FnvIndexMap<i32, usize, MAX_VALID_VALUES>;

/// Count occurrences of each recognised value, keyed in first-seen order
fn tally(buffer: &ReadingBuffer, table: &ValueTable) -> Tally {
    let mut counts = Tally::new();
    for reading in buffer.iter() {
        let value = reading.discrete;
        if !table.contains(value) {
            log::trace!("skipping unrecognised discrete value {}", value);
            continue;
        }
        match counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                // Cannot overflow: the table itself is bounded by the same capacity
                let _ = counts.insert(value, 1);
            }
        }
    }
    counts
}

/// Most frequent recognised value
///
/// Ties go to the value seen first (oldest) in the buffer.
pub fn modal(buffer: &ReadingBuffer, table: &ValueTable, default: i32) -> i32 {
    let mut best: Option<(i32, usize)> = None;
    for (&value, &count) in tally(buffer, table).iter() {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value).unwrap_or(default)
}

/// Value on which every buffered sample agrees
///
/// The buffer must hold its full complement of samples; an unrecognised sample
/// breaks agreement.
pub fn steady_state(buffer: &ReadingBuffer, table: &ValueTable, default: i32) -> i32 {
    if buffer.is_empty() || !buffer.is_full() {
        return default;
    }
    unanimous(buffer, table).unwrap_or(default)
}

/// Value held unchanged for at least `period_ms`
///
/// The buffer is a time window lagging by one reading, so its oldest entry is
/// the value in force when the window opened. The value is steady only if the
/// buffered readings cover the whole period and all agree.
pub fn timed_steady_state(
    buffer: &ReadingBuffer,
    table: &ValueTable,
    default: i32,
    period_ms: u64,
) -> i32 {
    if buffer.is_empty() || buffer.span_ms() < period_ms {
        return default;
    }
    unanimous(buffer, table).unwrap_or(default)
}

fn unanimous(buffer: &ReadingBuffer, table: &ValueTable) -> Option<i32> {
    let counts = tally(buffer, table);
    let mut leader: Option<(i32, usize)> = None;
    for (&value, &count) in counts.iter() {
        match leader {
            Some((_, lead)) if count < lead => {}
            _ => leader = Some((value, count)),
        }
    }
    leader
        .filter(|&(_, count)| count == buffer.len())
        .map(|(value, _)| value)
}
