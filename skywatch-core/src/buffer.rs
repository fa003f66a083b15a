//! Time-Ordered Reading Buffer for Filter History
//!
//! ## Overview
//!
//! Every sensor filter keeps a private history of the readings it has accepted.
//! The aggregation strategies (averages, modal counts, steady-state checks) run
//! over that history on each readout.
//!
//! ## Invariants
//!
//! - Timestamps are strictly increasing from oldest to newest. A reading whose
//!   timestamp is not newer than the most recent entry is rejected: the sensor
//!   has not produced anything new since the last readout, or it replayed an
//!   old value.
//! - The buffer never exceeds its capacity:
//!   - [`Capacity::Samples`]: at most N readings, oldest evicted first.
//!   - [`Capacity::Window`]: readings older than the window are evicted, but
//!     only once the *two* oldest readings are both outside it. The oldest
//!     surviving reading therefore describes the value in force at the start
//!     of the window, which the next evaluation needs.
//!
//! ```text
//! Window = 10s, newest at t=30s, cutoff = 20s
//!
//!   t=8  t=15  t=22  t=30        t=8 and t=15 both < 20  → evict t=8
//!   ───  ────  ────  ────        t=15 < 20 but t=22 ≥ 20 → keep t=15
//! ```
//!
//! ## Thread Safety
//!
//! Not thread-safe. Each buffer is owned by exactly one filter, and the filter
//! is shared (when it is shared at all) behind a mutex.

use std::collections::VecDeque;

use crate::time::Timestamp;
use crate::traits::Reading;

/// How much history a buffer keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Keep the N most recent readings
    Samples(usize),
    /// Keep readings inside a trailing window (milliseconds), lagging by one
    Window(u64),
}

/// Bounded, strictly time-ordered buffer of readings
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    /// Readings, oldest at the front
    data: VecDeque<Reading>,

    /// Eviction policy
    capacity: Capacity,
}

impl ReadingBuffer {
    /// Creates a new empty buffer
    pub fn new(capacity: Capacity) -> Self {
        let initial = match capacity {
            Capacity::Samples(n) => n,
            Capacity::Window(_) => 16,
        };
        Self {
            data: VecDeque::with_capacity(initial),
            capacity,
        }
    }

    /// Count-bounded buffer
    pub fn samples(n: usize) -> Self {
        Self::new(Capacity::Samples(n))
    }

    /// Time-window buffer
    pub fn window(ms: u64) -> Self {
        Self::new(Capacity::Window(ms))
    }

    /// Adds a reading, returning `false` if it was rejected as stale
    ///
    /// ```rust
    /// # use skywatch_core::buffer::ReadingBuffer;
    /// # use skywatch_core::traits::Reading;
    /// let mut buf = ReadingBuffer::samples(2);
    ///
    /// assert!(buf.push(Reading::continuous(100, 1.0)));
    /// assert!(!buf.push(Reading::continuous(100, 9.0))); // same timestamp
    /// assert!(buf.push(Reading::continuous(200, 2.0)));
    /// assert!(buf.push(Reading::continuous(300, 3.0)));   // evicts t=100
    ///
    /// assert_eq!(buf.len(), 2);
    /// ```
    pub fn push(&mut self, reading: Reading) -> bool {
        if let Some(last) = self.data.back() {
            if reading.timestamp <= last.timestamp {
                return false;
            }
        }

        self.data.push_back(reading);
        self.evict(reading.timestamp);
        true
    }

    fn evict(&mut self, newest: Timestamp) {
        match self.capacity {
            Capacity::Samples(n) => {
                while self.data.len() > n {
                    self.data.pop_front();
                }
            }
            Capacity::Window(window) => {
                let cutoff = newest.saturating_sub(window);
                // Only drop the oldest once its successor is also outside the window
                while self.data.len() >= 2 && self.data[1].timestamp < cutoff {
                    self.data.pop_front();
                }
            }
        }
    }

    /// Get number of stored readings
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if a count-bounded buffer holds its full complement
    ///
    /// Window buffers are never "full".
    pub fn is_full(&self) -> bool {
        match self.capacity {
            Capacity::Samples(n) => self.data.len() == n,
            Capacity::Window(_) => false,
        }
    }

    /// Eviction policy
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Most recent reading
    pub fn last(&self) -> Option<&Reading> {
        self.data.back()
    }

    /// Oldest reading
    pub fn first(&self) -> Option<&Reading> {
        self.data.front()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator {
        self.data.iter()
    }

    /// Iterate from newest to oldest
    pub fn iter_recent(&self) -> impl Iterator<Item = &Reading> {
        self.data.iter().rev()
    }

    /// Time between oldest and newest reading
    pub fn span_ms(&self) -> u64 {
        match (self.data.front(), self.data.back()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => 0,
        }
    }

    /// Clear all readings
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
