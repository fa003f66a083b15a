//! Sensor Filters
//!
//! ## Overview
//!
//! A filter turns the noisy, irregular stream of readings from one sensor into
//! a single representative value per call. Rules never look at raw readings;
//! they look at filter readouts.
//!
//! ```text
//!             readout()
//!                │
//!   ┌────────────▼────────────┐
//!   │ sample() + read() ──────┼──→ sensor
//!   │ push into ReadingBuffer │     (stale timestamps rejected)
//!   │ aggregate               │
//!   └────────────┬────────────┘
//!                ▼
//!              f64
//! ```
//!
//! ## Strategies
//!
//! [`SensorFilter`] is one type with a pluggable [`Aggregation`]:
//!
//! | Keyword  | Strategy                | Empty / undecided |
//! |----------|-------------------------|-------------------|
//! | `AVER`   | arithmetic mean         | 0.0               |
//! | `WAV`    | weighted mean           | 0.0               |
//! | `EXPAV`  | exponentially weighted  | 0.0               |
//! | `MODAL`  | most frequent state     | default           |
//! | `STEADY` | unanimous full buffer   | default           |
//! | `PERIOD` | unanimous over period   | default           |
//! | `TIME`   | pass-through temporal   | 0.0               |
//! | `WMS`... | debounced GOOD/BAD      | initial state     |
//!
//! [`Multiplexer`] combines several filters into one weighted sum.
//!
//! ## Failure Handling
//!
//! `readout()` never fails. Sensor errors are logged and the filter aggregates
//! whatever history it already holds; a non-finite aggregate is replaced by the
//! strategy's default.

pub mod averaging;
pub mod debounce;
pub mod discrete;
pub mod multiplexer;

pub use debounce::{Debounce, StreakThreshold};
pub use discrete::ValueTable;
pub use multiplexer::Multiplexer;

use crate::buffer::{Capacity, ReadingBuffer};
use crate::constants::buffers::{MAX_FILTER_SAMPLES, MAX_WEIGHTS};
use crate::errors::{ConfigError, ConfigResult, SensorError};
use crate::traits::{lock, Filter, Reading, SharedSensor};

/// Aggregation strategy applied to a filter's buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Arithmetic mean of continuous values
    Average,
    /// Weighted mean, first weight on the most recent reading
    WeightedAverage {
        /// Weights from most recent to oldest
        weights: heapless::Vec<f64, MAX_WEIGHTS>,
    },
    /// Mean weighted by exponential decay with age
    ExponentialAverage {
        /// Decay time constant (milliseconds)
        time_constant_ms: f64,
    },
    /// Most frequent recognised discrete value
    Modal {
        /// Recognised values
        table: ValueTable,
        /// Returned when nothing recognised is buffered
        default: i32,
    },
    /// Discrete value shared by every sample of a full buffer
    SteadyState {
        /// Recognised values
        table: ValueTable,
        /// Returned when samples disagree
        default: i32,
    },
    /// Discrete value held for a whole period
    TimedSteadyState {
        /// Required holding period (milliseconds)
        period_ms: u64,
        /// Recognised values
        table: ValueTable,
        /// Returned when the value changed or the period is not yet covered
        default: i32,
    },
    /// Latest temporal value unchanged
    Temporal,
    /// Debounced GOOD/BAD state
    Debounce(Debounce),
}

impl Aggregation {
    /// Value returned when aggregation produced nothing usable
    pub fn fallback(&self) -> f64 {
        match self {
            Aggregation::Modal { default, .. }
            | Aggregation::SteadyState { default, .. }
            | Aggregation::TimedSteadyState { default, .. } => f64::from(*default),
            Aggregation::Debounce(debounce) => f64::from(debounce.state()),
            _ => 0.0,
        }
    }

    fn apply(&mut self, buffer: &ReadingBuffer, fresh: Option<&Reading>) -> f64 {
        match self {
            Aggregation::Average => averaging::average(buffer),
            Aggregation::WeightedAverage { weights } => {
                averaging::weighted_average(buffer, weights)
            }
            Aggregation::ExponentialAverage { time_constant_ms } => {
                averaging::exponential_average(buffer, *time_constant_ms)
            }
            Aggregation::Modal { table, default } => {
                f64::from(discrete::modal(buffer, table, *default))
            }
            Aggregation::SteadyState { table, default } => {
                f64::from(discrete::steady_state(buffer, table, *default))
            }
            Aggregation::TimedSteadyState {
                period_ms,
                table,
                default,
            } => f64::from(discrete::timed_steady_state(buffer, table, *default, *period_ms)),
            Aggregation::Temporal => buffer.last().map(|r| r.temporal as f64).unwrap_or(0.0),
            Aggregation::Debounce(debounce) => {
                if let Some(reading) = fresh {
                    debounce.observe(reading);
                }
                f64::from(debounce.state())
            }
        }
    }
}

/// Diagnostic view of a filter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FilterSnapshot {
    /// Filter name
    pub name: String,
    /// Readings currently buffered
    pub buffered: usize,
    /// Value returned by the last readout
    pub last_value: f64,
    /// Samples rejected as stale since creation
    pub rejected: u64,
    /// Sensor errors seen since creation
    pub sensor_errors: u64,
}

/// Filter reading one sensor through an aggregation strategy
pub struct SensorFilter {
    name: String,
    sensor: SharedSensor,
    buffer: ReadingBuffer,
    aggregation: Aggregation,
    last_value: f64,
    rejected: u64,
    sensor_errors: u64,
}

impl SensorFilter {
    /// Create a filter with an explicit buffer policy and strategy
    pub fn new(
        name: impl Into<String>,
        sensor: SharedSensor,
        capacity: Capacity,
        aggregation: Aggregation,
    ) -> ConfigResult<Self> {
        match capacity {
            Capacity::Samples(0) => {
                return Err(ConfigError::invalid("filter", "sample count must be at least 1"))
            }
            Capacity::Samples(n) if n > MAX_FILTER_SAMPLES => {
                return Err(ConfigError::invalid(
                    "filter",
                    format!("sample count {} exceeds {}", n, MAX_FILTER_SAMPLES),
                ))
            }
            Capacity::Window(0) => {
                return Err(ConfigError::invalid("filter", "period must be positive"))
            }
            _ => {}
        }

        let last_value = aggregation.fallback();
        Ok(Self {
            name: name.into(),
            sensor,
            buffer: ReadingBuffer::new(capacity),
            aggregation,
            last_value,
            rejected: 0,
            sensor_errors: 0,
        })
    }

    /// Mean of the last `samples` continuous readings
    pub fn averaging(
        name: impl Into<String>,
        sensor: SharedSensor,
        samples: usize,
    ) -> ConfigResult<Self> {
        Self::new(name, sensor, Capacity::Samples(samples), Aggregation::Average)
    }

    /// Weighted mean; one buffered sample per weight
    pub fn weighted_averaging(
        name: impl Into<String>,
        sensor: SharedSensor,
        samples: usize,
        weights: &[f64],
    ) -> ConfigResult<Self> {
        if weights.is_empty() {
            return Err(ConfigError::invalid("weighted filter", "no weights given"));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::invalid(
                "weighted filter",
                "weights must be finite and non-negative",
            ));
        }
        let weights = heapless::Vec::from_slice(weights).map_err(|_| {
            ConfigError::invalid("weighted filter", format!("more than {} weights", MAX_WEIGHTS))
        })?;
        Self::new(
            name,
            sensor,
            Capacity::Samples(samples),
            Aggregation::WeightedAverage { weights },
        )
    }

    /// Exponentially weighted mean with decay constant `time_constant_ms`
    pub fn exponential_averaging(
        name: impl Into<String>,
        sensor: SharedSensor,
        samples: usize,
        time_constant_ms: f64,
    ) -> ConfigResult<Self> {
        if !(time_constant_ms.is_finite() && time_constant_ms > 0.0) {
            return Err(ConfigError::invalid(
                "exponential filter",
                "time constant must be positive",
            ));
        }
        Self::new(
            name,
            sensor,
            Capacity::Samples(samples),
            Aggregation::ExponentialAverage { time_constant_ms },
        )
    }

    /// Most frequent recognised state over `samples` readings
    pub fn modal(
        name: impl Into<String>,
        sensor: SharedSensor,
        samples: usize,
        table: ValueTable,
        default: i32,
    ) -> ConfigResult<Self> {
        Self::new(
            name,
            sensor,
            Capacity::Samples(samples),
            Aggregation::Modal { table, default },
        )
    }

    /// State on which all `samples` readings agree
    pub fn steady_state(
        name: impl Into<String>,
        sensor: SharedSensor,
        samples: usize,
        table: ValueTable,
        default: i32,
    ) -> ConfigResult<Self> {
        Self::new(
            name,
            sensor,
            Capacity::Samples(samples),
            Aggregation::SteadyState { table, default },
        )
    }

    /// State held unchanged for `period_ms`
    pub fn timed_steady_state(
        name: impl Into<String>,
        sensor: SharedSensor,
        period_ms: u64,
        table: ValueTable,
        default: i32,
    ) -> ConfigResult<Self> {
        Self::new(
            name,
            sensor,
            Capacity::Window(period_ms),
            Aggregation::TimedSteadyState {
                period_ms,
                table,
                default,
            },
        )
    }

    /// Latest temporal value
    pub fn temporal(name: impl Into<String>, sensor: SharedSensor) -> ConfigResult<Self> {
        Self::new(name, sensor, Capacity::Samples(1), Aggregation::Temporal)
    }

    /// Debounced GOOD/BAD state
    pub fn debounce(
        name: impl Into<String>,
        sensor: SharedSensor,
        debounce: Debounce,
    ) -> ConfigResult<Self> {
        Self::new(name, sensor, Capacity::Samples(1), Aggregation::Debounce(debounce))
    }

    /// Strategy in use
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// Buffered history
    pub fn buffer(&self) -> &ReadingBuffer {
        &self.buffer
    }

    /// Diagnostic snapshot
    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            name: self.name.clone(),
            buffered: self.buffer.len(),
            last_value: self.last_value,
            rejected: self.rejected,
            sensor_errors: self.sensor_errors,
        }
    }

    /// Sample the sensor and buffer its reading; returns the reading if it was new
    fn acquire(&mut self) -> Option<Reading> {
        let reading = {
            let mut sensor = lock(&self.sensor);
            match sensor.sample() {
                Ok(()) => {}
                Err(nb::Error::WouldBlock) => {
                    log::trace!("{}: acquisition in progress on {}", self.name, sensor.name());
                }
                Err(nb::Error::Other(err)) => {
                    self.sensor_errors += 1;
                    log_sensor_error(&self.name, &err);
                }
            }
            sensor.read()?
        };

        if self.buffer.push(reading) {
            Some(reading)
        } else {
            self.rejected += 1;
            log::trace!(
                "{}: rejected stale reading at {} (latest {:?})",
                self.name,
                reading.timestamp,
                self.buffer.last().map(|r| r.timestamp)
            );
            None
        }
    }
}

fn log_sensor_error(filter: &str, err: &SensorError) {
    match err {
        SensorError::NoData { .. } => log::trace!("{}: {}", filter, err),
        SensorError::Unavailable { .. } => log::debug!("{}: {}", filter, err),
    }
}

impl Filter for SensorFilter {
    fn readout(&mut self) -> f64 {
        let fresh = self.acquire();
        let mut value = self.aggregation.apply(&self.buffer, fresh.as_ref());

        if !value.is_finite() {
            log::debug!("{}: non-finite aggregate, using default", self.name);
            value = self.aggregation.fallback();
        }

        self.last_value = value;
        value
    }

    fn name(&self) -> &str {
        &self.name
    }
}
