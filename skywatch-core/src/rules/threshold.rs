//! Threshold direction and the comparisons built on it

/// Which side of a threshold counts as exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Fires above the threshold
    Up,
    /// Fires below the threshold
    Down,
}

impl Direction {
    /// Parse a comparison keyword (`GT`, `>`, `ABOVE`, `LT`, `<`, `BELOW`)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "GT" | ">" | "ABOVE" | "UP" => Some(Direction::Up),
            "LT" | "<" | "BELOW" | "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Strictly past `level` on the firing side
    #[inline]
    pub fn crosses(self, value: f64, level: f64) -> bool {
        match self {
            Direction::Up => value > level,
            Direction::Down => value < level,
        }
    }

    /// Strictly back past the inversion level
    #[inline]
    pub fn reenters(self, value: f64, invert: f64) -> bool {
        match self {
            Direction::Up => value < invert,
            Direction::Down => value > invert,
        }
    }

    /// Whether `invert` sits on the correct side of `threshold`
    pub fn valid_inversion(self, threshold: f64, invert: f64) -> bool {
        match self {
            Direction::Up => invert <= threshold,
            Direction::Down => invert >= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ConditionRule;
    use crate::traits::{share_filter, Filter};
    use proptest::prelude::*;

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
    fn keywords() {
        assert_eq!(Direction::from_keyword("gt"), Some(Direction::Up));
        assert_eq!(Direction::from_keyword("BELOW"), Some(Direction::Down));
        assert_eq!(Direction::from_keyword("<"), Some(Direction::Down));
        assert_eq!(Direction::from_keyword("sideways"), None);
    }

    #[test]
    fn equality_never_crosses() {
        assert!(!Direction::Up.crosses(5.0, 5.0));
        assert!(!Direction::Down.crosses(5.0, 5.0));
    }

    #[test]
    fn inversion_side() {
        assert!(Direction::Up.valid_inversion(10.0, 8.0));
        assert!(!Direction::Up.valid_inversion(10.0, 12.0));
        assert!(Direction::Down.valid_inversion(-5.0, -3.0));
    }

    proptest! {
        #[test]
        fn simple_threshold_is_stateless(
            threshold in -1000.0f64..1000.0,
            values in proptest::collection::vec(-2000.0f64..2000.0, 1..50),
        ) {
            let mut rule = ConditionRule::threshold(
                "t",
                share_filter(Unused),
                threshold,
                Direction::Up,
            );
            for (i, &value) in values.iter().enumerate() {
                let fired = rule.evaluate(value, i as u64);
                prop_assert_eq!(fired, value > threshold);
            }
        }
    }
}
