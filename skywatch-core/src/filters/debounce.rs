//! Debounce strategy for subsystem GOOD/BAD states
//!
//! External subsystems (the weather monitoring system, enclosure, power
//! supplies) report a discrete GOOD or BAD state that can flap when conditions
//! hover around a limit. A debounce filter keeps an externally visible state and
//! only flips it once the raw state has disagreed for long enough:
//!
//! - `WMS`: BAD→GOOD needs a good streak; GOOD→BAD is immediate
//! - `WMSBAD`: GOOD→BAD needs a bad streak; BAD→GOOD is immediate
//! - `SYS`: both directions need a streak
//!
//! Streaks are measured in consecutive accepted samples or in elapsed time
//! since the first disagreeing sample. Any sample agreeing with the visible
//! state resets the streak.

use crate::constants::states::{STATE_BAD, STATE_GOOD};
use crate::time::Timestamp;
use crate::traits::Reading;

/// How long a disagreeing raw state must persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakThreshold {
    /// Number of consecutive disagreeing samples
    Count(u32),
    /// Milliseconds since the first disagreeing sample
    Time(u64),
}

/// Debounced GOOD/BAD state
#[derive(Debug, Clone, PartialEq)]
pub struct Debounce {
    /// Threshold for BAD→GOOD, `None` = immediate
    to_good: Option<StreakThreshold>,
    /// Threshold for GOOD→BAD, `None` = immediate
    to_bad: Option<StreakThreshold>,
    visible: i32,
    streak_count: u32,
    streak_start: Option<Timestamp>,
}

impl Debounce {
    /// Debounce recovery only, starting BAD
    pub fn good_streak(threshold: StreakThreshold) -> Self {
        Self::new(Some(threshold), None, STATE_BAD)
    }

    /// Debounce degradation only, starting GOOD
    pub fn bad_streak(threshold: StreakThreshold) -> Self {
        Self::new(None, Some(threshold), STATE_GOOD)
    }

    /// Debounce both directions, starting BAD
    pub fn both(to_good: StreakThreshold, to_bad: StreakThreshold) -> Self {
        Self::new(Some(to_good), Some(to_bad), STATE_BAD)
    }

    fn new(
        to_good: Option<StreakThreshold>,
        to_bad: Option<StreakThreshold>,
        initial: i32,
    ) -> Self {
        Self {
            to_good,
            to_bad,
            visible: initial,
            streak_count: 0,
            streak_start: None,
        }
    }

    /// Override the initial visible state
    pub fn starting(mut self, state: i32) -> Self {
        self.visible = if state == STATE_GOOD { STATE_GOOD } else { STATE_BAD };
        self
    }

    /// Currently visible state
    pub fn state(&self) -> i32 {
        self.visible
    }

    /// Feed one newly accepted raw sample
    pub fn observe(&mut self, reading: &Reading) {
        let raw = if reading.discrete == STATE_GOOD {
            STATE_GOOD
        } else {
            STATE_BAD
        };

        if raw == self.visible {
            self.clear_streak();
            return;
        }

        self.streak_count += 1;
        let start = *self.streak_start.get_or_insert(reading.timestamp);

        let threshold = if raw == STATE_GOOD {
            self.to_good
        } else {
            self.to_bad
        };

        let flip = match threshold {
            None => true,
            Some(StreakThreshold::Count(n)) => self.streak_count >= n,
            Some(StreakThreshold::Time(ms)) => reading.timestamp.saturating_sub(start) >= ms,
        };

        if flip {
            log::debug!(
                "debounced state {} -> {} after {} samples",
                self.visible,
                raw,
                self.streak_count
            );
            self.visible = raw;
            self.clear_streak();
        }
    }

    fn clear_streak(&mut self) {
        self.streak_count = 0;
        self.streak_start = None;
    }
}
