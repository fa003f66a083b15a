//! Rules: stateful predicates over filter readouts
//!
//! ## Overview
//!
//! A rule pulls one readout from its filter per invocation and decides whether
//! its condition holds. Four evaluation policies exist, all carried by the one
//! [`ConditionRule`] type through the [`Condition`] enum:
//!
//! | Keyword  | Policy                         | Memory              |
//! |----------|--------------------------------|---------------------|
//! | `THRESH` | `value > T` (or `<`)           | none, level         |
//! | `DELINV` | crossing confirmed after delay | arm/fire/disarm     |
//! | `SELECT` | `value == V` (or `!=`)         | none, level         |
//! | `ANYOF`  | `value ∈ {…}` held for delay   | arm/fire/disarm     |
//!
//! ## Confirmation State Machine
//!
//! The delayed policies share one state machine:
//!
//! ```text
//!            arm condition
//!   Idle ───────────────────→ Armed(since)
//!    ▲  ▲                       │   │
//!    │  └─── hold lost ─────────┘   │ held for ≥ delay
//!    │                              ▼
//!    └───────── hold lost ─────── Fired  (reports true while held)
//! ```
//!
//! For `DELINV` the arm condition is crossing the threshold and the hold
//! condition is staying on the far side of the inversion level, so a fired
//! rule is only cleared by re-entering the inversion band, never merely by the
//! threshold condition going false.

mod membership;
mod threshold;

pub use membership::AnyOfSet;
pub use threshold::Direction;

use crate::time::{elapsed_ms, Timestamp};
use crate::traits::{lock, Rule, SharedFilter};

/// Evaluation policy of a [`ConditionRule`]
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Level-triggered threshold comparison
    Threshold {
        /// Comparison level
        threshold: f64,
        /// Which side of the level fires
        direction: Direction,
    },
    /// Threshold crossing that must persist for `delay_ms`, cleared by the inversion level
    DelayedInvertible {
        /// Level that arms the rule
        threshold: f64,
        /// Level that disarms or clears the rule
        invert: f64,
        /// Confirmation delay (milliseconds)
        delay_ms: u64,
        /// Which side of the threshold arms
        direction: Direction,
    },
    /// Level-triggered equality on a discrete value
    Select {
        /// Value compared against
        value: i32,
        /// Fire on inequality instead
        negate: bool,
    },
    /// Set membership that must persist for `delay_ms`
    AnyOf {
        /// Accepted values
        values: AnyOfSet,
        /// Confirmation delay (milliseconds)
        delay_ms: u64,
    },
}

/// Position in the confirmation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RulePhase {
    /// Nothing pending
    #[default]
    Idle,
    /// Condition met, waiting for the delay to elapse
    Armed {
        /// When the condition was first met
        since: Timestamp,
    },
    /// Condition confirmed
    Fired,
}

impl RulePhase {
    /// Whether the rule currently reports fired
    pub fn is_fired(&self) -> bool {
        matches!(self, RulePhase::Fired)
    }

    /// Advance the machine; returns whether the rule reports true
    fn advance(&mut self, now: Timestamp, delay_ms: u64, arm: bool, hold: bool) -> bool {
        match *self {
            RulePhase::Idle => {
                if !arm {
                    return false;
                }
                if delay_ms == 0 {
                    *self = RulePhase::Fired;
                    true
                } else {
                    *self = RulePhase::Armed { since: now };
                    false
                }
            }
            RulePhase::Armed { since } => {
                if !hold {
                    *self = RulePhase::Idle;
                    false
                } else if elapsed_ms(since, now) >= delay_ms {
                    *self = RulePhase::Fired;
                    true
                } else {
                    false
                }
            }
            RulePhase::Fired => {
                if hold {
                    true
                } else {
                    *self = RulePhase::Idle;
                    false
                }
            }
        }
    }
}

/// Rule evaluating one [`Condition`] over one filter
pub struct ConditionRule {
    name: String,
    filter: SharedFilter,
    condition: Condition,
    phase: RulePhase,
}

impl ConditionRule {
    pub fn new(name: impl Into<String>, filter: SharedFilter, condition: Condition) -> Self {
        Self {
            name: name.into(),
            filter,
            condition,
            phase: RulePhase::Idle,
        }
    }

    /// Level-triggered threshold rule
    pub fn threshold(
        name: impl Into<String>,
        filter: SharedFilter,
        threshold: f64,
        direction: Direction,
    ) -> Self {
        Self::new(name, filter, Condition::Threshold { threshold, direction })
    }

    /// Policy in use
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Current state machine position
    pub fn phase(&self) -> RulePhase {
        self.phase
    }

    /// Stateless test of a value against a threshold condition
    ///
    /// Only meaningful for [`Condition::Threshold`] and [`Condition::Select`];
    /// delayed policies report whether the value would arm them.
    pub fn check_condition(&self, value: f64) -> bool {
        match &self.condition {
            Condition::Threshold {
                threshold,
                direction,
            } => direction.crosses(value, *threshold),
            Condition::DelayedInvertible {
                threshold,
                direction,
                ..
            } => direction.crosses(value, *threshold),
            Condition::Select { value: target, negate } => {
                membership::select_matches(value, *target, *negate)
            }
            Condition::AnyOf { values, .. } => values.matches(value),
        }
    }

    /// Evaluate a readout taken at `now`
    pub fn evaluate(&mut self, value: f64, now: Timestamp) -> bool {
        let before = self.phase;
        let result = match &self.condition {
            Condition::Threshold { .. } | Condition::Select { .. } => self.check_condition(value),
            Condition::DelayedInvertible {
                threshold,
                invert,
                delay_ms,
                direction,
            } => {
                let arm = direction.crosses(value, *threshold);
                let hold = !direction.reenters(value, *invert);
                self.phase.advance(now, *delay_ms, arm, hold)
            }
            Condition::AnyOf { values, delay_ms } => {
                let member = values.matches(value);
                self.phase.advance(now, *delay_ms, member, member)
            }
        };

        if before != self.phase {
            log::debug!(
                "rule {}: {:?} -> {:?} (value {}, t={})",
                self.name,
                before,
                self.phase,
                value,
                now
            );
        }
        result
    }
}

impl Rule for ConditionRule {
    fn invoke(&mut self, now: Timestamp) -> bool {
        let value = lock(&self.filter).readout();
        self.evaluate(value, now)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.phase = RulePhase::Idle;
    }
}
