//! Discrete comparisons: equality and set membership

use crate::constants::buffers::MAX_ANYOF_VALUES;
use crate::errors::{ConfigError, ConfigResult};

/// Readouts are continuous; discrete comparisons use the nearest integer
#[inline]
fn as_discrete(value: f64) -> i32 {
    libm::round(value) as i32
}

/// Non-finite readouts match neither `EQ` nor `NEQ`
pub(super) fn select_matches(value: f64, target: i32, negate: bool) -> bool {
    value.is_finite() && ((as_discrete(value) == target) != negate)
}

/// Value set of an `ANYOF` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyOfSet {
    values: heapless::Vec<i32, MAX_ANYOF_VALUES>,
}

impl AnyOfSet {
    pub fn new(values: &[i32]) -> ConfigResult<Self> {
        if values.is_empty() {
            return Err(ConfigError::invalid("ANYOF rule", "empty value set"));
        }
        let mut set = heapless::Vec::new();
        for &value in values {
            if set.contains(&value) {
                continue;
            }
            set.push(value).map_err(|_| {
                ConfigError::invalid(
                    "ANYOF rule",
                    format!("more than {} values", MAX_ANYOF_VALUES),
                )
            })?;
        }
        Ok(Self { values: set })
    }

    /// Whether the readout rounds to a member
    pub fn matches(&self, value: f64) -> bool {
        value.is_finite() && self.values.contains(&as_discrete(value))
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, ConditionRule, RulePhase};
    use crate::traits::{share_filter, Filter};

    struct Unused;

    impl Filter for Unused {
        fn readout(&mut self) -> f64 {
            0.0
        }

        fn name(&self) -> &str {
            "unused"
        }
    }

    #[test]
    fn select_compares_rounded_value() {
        assert!(select_matches(2.0, 2, false));
        assert!(select_matches(1.6, 2, false));
        assert!(!select_matches(2.0, 2, true));
        assert!(select_matches(3.0, 2, true));
    }

    #[test]
    fn select_ignores_non_finite_readouts() {
        assert!(!select_matches(f64::NAN, 0, false));
        assert!(!select_matches(f64::NAN, 0, true));
        assert!(!select_matches(f64::INFINITY, i32::MAX, false));
        assert!(!select_matches(f64::NEG_INFINITY, i32::MIN, false));

        let mut rule = ConditionRule::new(
            "enclosure_bad",
            share_filter(Unused),
            Condition::Select {
                value: 0,
                negate: false,
            },
        );
        assert!(!rule.evaluate(f64::NAN, 0));
        assert_eq!(rule.phase(), RulePhase::Idle);
    }

    #[test]
    fn set_dedups_and_bounds() {
        let set = AnyOfSet::new(&[1, 4, 1]).unwrap();
        assert_eq!(set.values(), &[1, 4]);
        assert!(AnyOfSet::new(&[]).is_err());

        let too_many: Vec<i32> = (0..=MAX_ANYOF_VALUES as i32).collect();
        assert!(AnyOfSet::new(&too_many).is_err());
    }

    #[test]
    fn non_finite_is_never_a_member() {
        let set = AnyOfSet::new(&[0]).unwrap();
        assert!(!set.matches(f64::NAN));
    }

    #[test]
    fn anyof_rule_holds_membership_for_delay() {
        let mut rule = ConditionRule::new(
            "roof",
            share_filter(Unused),
            Condition::AnyOf {
                values: AnyOfSet::new(&[2, 3]).unwrap(),
                delay_ms: 500,
            },
        );

        assert!(!rule.evaluate(2.0, 0));
        assert!(!rule.evaluate(3.0, 400));
        assert!(rule.evaluate(2.0, 500));
        assert!(rule.evaluate(3.0, 600));
        assert!(!rule.evaluate(1.0, 700));
        assert_eq!(rule.phase(), RulePhase::Idle);
    }
}
