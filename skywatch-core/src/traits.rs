//! Core traits for sensors, filters and rules
//!
//! These traits are the seams of the monitoring pipeline:
//!
//! ```text
//! Sensor ──sample/read──→ Filter ──readout──→ Rule ──invoke──→ Ruleset ──→ Monitor
//! ```
//!
//! Everything is pulled: a monitor trigger invokes its rulesets, each rule asks
//! its filter for one readout, and the filter samples its sensor. Components
//! referenced from more than one place in a configuration are shared as
//! `Arc<Mutex<dyn Trait>>`, which serialises access to their internal state.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::SensorError;
use crate::time::Timestamp;

/// Single sensor acquisition
///
/// Immutable once produced. Which of the value fields is meaningful depends on
/// the sensor: a wind speed sensor fills `continuous`, a weather state sensor
/// fills `discrete`, a frame counter fills `temporal`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Acquisition time in milliseconds
    pub timestamp: Timestamp,
    /// Analogue value
    pub continuous: f64,
    /// Enumerated state value
    pub discrete: i32,
    /// Time or counter value
    pub temporal: i64,
}

impl Reading {
    /// Reading carrying an analogue value
    pub fn continuous(timestamp: Timestamp, value: f64) -> Self {
        Self {
            timestamp,
            continuous: value,
            ..Self::default()
        }
    }

    /// Reading carrying an enumerated state
    pub fn discrete(timestamp: Timestamp, value: i32) -> Self {
        Self {
            timestamp,
            continuous: f64::from(value),
            discrete: value,
            ..Self::default()
        }
    }

    /// Reading carrying a time or counter value
    pub fn temporal(timestamp: Timestamp, value: i64) -> Self {
        Self {
            timestamp,
            continuous: value as f64,
            temporal: value,
            ..Self::default()
        }
    }
}

/// Source of raw readings (instrument, weather station, telemetry feed)
pub trait Sensor: Send {
    /// Trigger an acquisition
    ///
    /// `Err(nb::Error::WouldBlock)` means acquisition is still in progress; the
    /// caller proceeds with whatever [`read`](Sensor::read) returns.
    fn sample(&mut self) -> nb::Result<(), SensorError>;

    /// Most recently acquired reading, never blocks
    fn read(&self) -> Option<Reading>;

    /// Sensor name for diagnostics
    fn name(&self) -> &str;
}

/// Aggregator turning a stream of readings into one value per call
pub trait Filter: Send {
    /// Sample the underlying feed and return the aggregated value
    ///
    /// Never fails: empty or unusable data yields the filter's documented default.
    fn readout(&mut self) -> f64;

    /// Filter name
    fn name(&self) -> &str;
}

/// Stateful predicate over one filter's output
pub trait Rule: Send {
    /// Pull one readout from the filter and evaluate it at instant `now`
    fn invoke(&mut self, now: Timestamp) -> bool;

    /// Rule name
    fn name(&self) -> &str;

    /// Return to the idle state, forgetting timers and fired flags
    fn reset(&mut self) {}
}

/// Sensor shared between filters
pub type SharedSensor = Arc<Mutex<dyn Sensor>>;

/// Filter shared between rules and multiplexers
pub type SharedFilter = Arc<Mutex<dyn Filter>>;

/// Rule shared between rulesets
pub type SharedRule = Arc<Mutex<dyn Rule>>;

/// Wrap a sensor for sharing
pub fn share_sensor<S: Sensor + 'static>(sensor: S) -> SharedSensor {
    Arc::new(Mutex::new(sensor))
}

/// Wrap a filter for sharing
pub fn share_filter<F: Filter + 'static>(filter: F) -> SharedFilter {
    Arc::new(Mutex::new(filter))
}

/// Wrap a rule for sharing
pub fn share_rule<R: Rule + 'static>(rule: R) -> SharedRule {
    Arc::new(Mutex::new(rule))
}

/// Lock a shared component, recovering from poisoning
///
/// A panic inside one evaluation must not take the whole monitor down; the
/// component's state is used as the panicking call left it.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("recovering poisoned lock");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_reading_mirrors_continuous() {
        let reading = Reading::discrete(10, 3);
        assert_eq!(reading.discrete, 3);
        assert_eq!(reading.continuous, 3.0);
        assert_eq!(reading.timestamp, 10);
    }

    #[test]
    fn temporal_reading_keeps_counter() {
        let reading = Reading::temporal(10, 1_700_000_000_000);
        assert_eq!(reading.temporal, 1_700_000_000_000);
    }
}
