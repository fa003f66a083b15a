//! Rulesets: boolean combinations of rules with edge-triggered output
//!
//! A ruleset combines one or more rules under a policy and reports `true` only
//! on the evaluation where the combination *becomes* true. While the combined
//! condition stays true the ruleset is latched and reports `false`; it re-arms
//! once an evaluation sees the combination false again.
//!
//! ```text
//! combined:  F  T  T  T  F  T
//! reported:  F  T  F  F  F  T
//! ```
//!
//! Every member rule is invoked on every evaluation, including after the
//! result is already decided, because rules advance their own timers and
//! filters keep sampling only when pulled.

use std::sync::{Arc, Mutex};

use crate::errors::{ConfigError, ConfigResult};
use crate::time::Timestamp;
use crate::traits::{lock, SharedRule};

/// How member results are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Policy {
    /// Exactly one rule, result passed through
    Simple,
    /// All rules must hold
    Conjunctive,
    /// Any rule holding suffices
    Disjunctive,
}

impl Policy {
    /// Parse a ruleset keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "SIMPLE" => Some(Policy::Simple),
            "CONJ" | "AND" => Some(Policy::Conjunctive),
            "DISJ" | "OR" => Some(Policy::Disjunctive),
            _ => None,
        }
    }
}

/// Ruleset shared between monitors
pub type SharedRuleset = Arc<Mutex<Ruleset>>;

/// Edge-triggered combination of rules
pub struct Ruleset {
    name: String,
    policy: Policy,
    rules: Vec<SharedRule>,
    enabled: bool,
}

impl Ruleset {
    /// Build a ruleset, checking the rule count against the policy
    pub fn new(name: impl Into<String>, policy: Policy, rules: Vec<SharedRule>) -> ConfigResult<Self> {
        let name = name.into();
        match policy {
            Policy::Simple if rules.len() != 1 => {
                return Err(ConfigError::invalid(
                    "SIMPLE ruleset",
                    format!("{} needs exactly one rule, got {}", name, rules.len()),
                ));
            }
            _ if rules.is_empty() => {
                return Err(ConfigError::invalid(
                    "ruleset",
                    format!("{} has no rules", name),
                ));
            }
            _ => {}
        }

        Ok(Self::assemble(name, policy, rules))
    }

    /// Single-rule ruleset
    ///
    /// Infallible form of `new(name, Policy::Simple, vec![rule])`.
    pub fn simple(name: impl Into<String>, rule: SharedRule) -> Self {
        Self::assemble(name.into(), Policy::Simple, vec![rule])
    }

    fn assemble(name: String, policy: Policy, rules: Vec<SharedRule>) -> Self {
        debug_assert!(!rules.is_empty());
        debug_assert!(policy != Policy::Simple || rules.len() == 1);
        Self {
            name,
            policy,
            rules,
            enabled: true,
        }
    }

    /// Wrap for sharing between monitors
    pub fn shared(self) -> SharedRuleset {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Whether the next true combination will be reported
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate all member rules at `now`; true only on a false→true edge
    pub fn invoke(&mut self, now: Timestamp) -> bool {
        let results = self.rules.iter().map(|rule| lock(rule).invoke(now));

        // fold, not all()/any(): every rule must be invoked
        let combined = match self.policy {
            Policy::Simple | Policy::Conjunctive => results.fold(true, |acc, r| acc & r),
            Policy::Disjunctive => results.fold(false, |acc, r| acc | r),
        };

        match (self.enabled, combined) {
            (true, true) => {
                self.enabled = false;
                log::info!("ruleset {} fired at t={}", self.name, now);
                true
            }
            (false, false) => {
                self.enabled = true;
                log::debug!("ruleset {} re-armed at t={}", self.name, now);
                false
            }
            _ => false,
        }
    }

    /// Re-arm the latch and reset every member rule
    pub fn reset(&mut self) {
        self.enabled = true;
        for rule in &self.rules {
            lock(rule).reset();
        }
    }
}
