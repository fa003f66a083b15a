//! Error Types for Configuration and Sensor Acquisition
//!
//! ## Design Philosophy
//!
//! Skywatch separates errors by *when* they can happen:
//!
//! 1. **Load time**: Everything that can be wrong with a filter, rule, ruleset or
//!    monitor definition is caught while the configuration is loaded and reported
//!    as a [`ConfigError`]. These are fatal: the supervisor refuses to start with
//!    a half-built rule graph.
//!
//! 2. **Run time**: Filters and rules never fail. A sensor that cannot be sampled,
//!    an empty buffer or a value outside a filter's table degrades to a documented
//!    default and is logged at low severity. [`SensorError`] exists so sensors can
//!    report *why* an acquisition did not happen; the filter logs it and carries on.
//!
//! ## Error Categories
//!
//! ### Syntax
//! - `Syntax`: a line could not be tokenised into a known directive shape
//! - `InvalidNumber`: a numeric field did not parse
//!
//! ### References
//! - `UnknownSensor`, `UnknownFilter`, `UnknownRule`, `UnknownRuleset`,
//!   `UnknownMonitor`: a directive names something that was never declared
//! - `UnknownTestValue`: a symbolic discrete value was never `DEFINE`d
//!
//! ### Semantics
//! - `Duplicate`: a name is declared twice
//! - `Invalid`: parameters are well-formed but meaningless (zero samples, ...)
//! - `Unsupported`: the construct is recognised but deliberately not implemented
//!
//! Every variant carries the 1-based line number (0 when the error came from
//! programmatic construction rather than a file).

use thiserror_no_std::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors, each naming the offending line and construct
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration source could not be read
    #[error("cannot read configuration {path}: {message}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O error message
        message: String,
    },

    /// Line does not have the shape of the directive it starts with
    #[error("line {line}: malformed {construct}: {message}")]
    Syntax {
        /// Line number (1-based, 0 = programmatic)
        line: usize,
        /// Directive or clause being parsed
        construct: &'static str,
        /// What was wrong
        message: String,
    },

    /// Numeric field did not parse
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidNumber {
        /// Line number
        line: usize,
        /// Field being parsed
        field: &'static str,
        /// Raw token
        value: String,
    },

    /// Referenced sensor is not in the sensor registry
    #[error("line {line}: unknown sensor '{name}'")]
    UnknownSensor {
        /// Line number
        line: usize,
        /// Sensor name
        name: String,
    },

    /// Referenced filter was never declared
    #[error("line {line}: unknown filter '{name}'")]
    UnknownFilter {
        /// Line number
        line: usize,
        /// Filter name
        name: String,
    },

    /// Filter type keyword has no registered constructor
    #[error("line {line}: unknown filter type '{keyword}'")]
    UnknownFilterType {
        /// Line number
        line: usize,
        /// Type keyword
        keyword: String,
    },

    /// Referenced rule was never declared
    #[error("line {line}: unknown rule '{name}'")]
    UnknownRule {
        /// Line number
        line: usize,
        /// Rule name
        name: String,
    },

    /// Referenced ruleset was never declared
    #[error("line {line}: unknown ruleset '{name}'")]
    UnknownRuleset {
        /// Line number
        line: usize,
        /// Ruleset name
        name: String,
    },

    /// Referenced monitor was never declared
    #[error("line {line}: unknown monitor '{name}'")]
    UnknownMonitor {
        /// Line number
        line: usize,
        /// Monitor name
        name: String,
    },

    /// Symbolic discrete value was never defined
    #[error("line {line}: unknown test value '{value}'")]
    UnknownTestValue {
        /// Line number
        line: usize,
        /// Symbol as written
        value: String,
    },

    /// Name declared twice within the same namespace
    #[error("line {line}: duplicate {kind} '{name}'")]
    Duplicate {
        /// Line number
        line: usize,
        /// Namespace (filter, rule, ...)
        kind: &'static str,
        /// Repeated name
        name: String,
    },

    /// Parameters parse but make no sense
    #[error("line {line}: invalid {construct}: {reason}")]
    Invalid {
        /// Line number
        line: usize,
        /// Construct being built
        construct: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Recognised construct that is deliberately not implemented
    #[error("line {line}: unsupported {construct}: {reason}")]
    Unsupported {
        /// Line number
        line: usize,
        /// Construct keyword
        construct: &'static str,
        /// Explanation
        reason: &'static str,
    },
}

impl ConfigError {
    /// Shorthand for a programmatic `Invalid` error (line 0)
    pub fn invalid(construct: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            line: 0,
            construct,
            reason: reason.into(),
        }
    }

    /// Attach a line number to an error raised without one
    ///
    /// Errors that already carry a non-zero line keep it.
    pub fn at_line(mut self, at: usize) -> Self {
        match &mut self {
            Self::Io { .. } => {}
            Self::Syntax { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::UnknownSensor { line, .. }
            | Self::UnknownFilter { line, .. }
            | Self::UnknownFilterType { line, .. }
            | Self::UnknownRule { line, .. }
            | Self::UnknownRuleset { line, .. }
            | Self::UnknownMonitor { line, .. }
            | Self::UnknownTestValue { line, .. }
            | Self::Duplicate { line, .. }
            | Self::Invalid { line, .. }
            | Self::Unsupported { line, .. } => {
                if *line == 0 {
                    *line = at;
                }
            }
        }
        self
    }

    /// Line number the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::Syntax { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::UnknownSensor { line, .. }
            | Self::UnknownFilter { line, .. }
            | Self::UnknownFilterType { line, .. }
            | Self::UnknownRule { line, .. }
            | Self::UnknownRuleset { line, .. }
            | Self::UnknownMonitor { line, .. }
            | Self::UnknownTestValue { line, .. }
            | Self::Duplicate { line, .. }
            | Self::Invalid { line, .. }
            | Self::Unsupported { line, .. } => Some(*line),
        }
    }
}

/// Reasons a sensor acquisition did not produce a new reading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Sensor hardware or feed is offline
    #[error("sensor {sensor} unavailable: {reason}")]
    Unavailable {
        /// Sensor name
        sensor: String,
        /// Underlying cause
        reason: String,
    },

    /// Sensor has never produced a value
    #[error("sensor {sensor} has no reading yet")]
    NoData {
        /// Sensor name
        sensor: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_line_fills_missing_line() {
        let err = ConfigError::invalid("filter", "zero samples").at_line(12);
        assert_eq!(err.line(), Some(12));
        assert!(err.to_string().contains("line 12"));
    }

    #[test]
    fn at_line_keeps_existing_line() {
        let err = ConfigError::UnknownFilter { line: 3, name: "wind".into() }.at_line(9);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn messages_name_the_construct() {
        let err = ConfigError::UnknownTestValue { line: 4, value: "CLOUDY".into() };
        assert_eq!(err.to_string(), "line 4: unknown test value 'CLOUDY'");
    }
}
