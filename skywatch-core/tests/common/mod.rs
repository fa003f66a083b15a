//! Common test utilities for integration tests
//!
//! This module provides:
//! - A scripted sensor replaying a fixed sequence of readings
//! - Series builders for continuous and discrete telemetry
//! - A site fixture: feeds, sensors registry, recording sink and manual clock

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use skywatch_core::{
    share_sensor, ConfigLoader, FeedHandle, FeedSensor, ManualClock, Reading, RecordingSink,
    Sensor, SensorError, SensorRegistry, Timestamp,
};

/// Sensor replaying a script, one reading per `sample()`
pub struct ScriptedSensor {
    name: String,
    script: VecDeque<Reading>,
    current: Option<Reading>,
}

impl ScriptedSensor {
    pub fn new(name: &str, script: Vec<Reading>) -> Self {
        Self {
            name: name.to_string(),
            script: script.into(),
            current: None,
        }
    }
}

impl Sensor for ScriptedSensor {
    fn sample(&mut self) -> nb::Result<(), SensorError> {
        match self.script.pop_front() {
            Some(reading) => {
                self.current = Some(reading);
                Ok(())
            }
            None => Err(nb::Error::Other(SensorError::Unavailable {
                sensor: self.name.clone(),
                reason: "script exhausted".into(),
            })),
        }
    }

    fn read(&self) -> Option<Reading> {
        self.current
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Continuous readings at `start`, `start + step`, ...
pub fn continuous_series(start: Timestamp, step: u64, values: &[f64]) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Reading::continuous(start + i as u64 * step, v))
        .collect()
}

/// Discrete readings at `start`, `start + step`, ...
pub fn discrete_series(start: Timestamp, step: u64, values: &[i32]) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Reading::discrete(start + i as u64 * step, v))
        .collect()
}

/// Observatory fixture: an anemometer feed, a sky state feed and an
/// enclosure status feed, events recorded in memory, time set by hand
pub struct Site {
    pub wind: FeedHandle,
    pub sky: FeedHandle,
    pub enclosure: FeedHandle,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<ManualClock>,
    pub loader: ConfigLoader,
}

impl Site {
    pub fn new() -> Self {
        let (wind, wind_feed) = FeedSensor::new("anemometer");
        let (sky, sky_feed) = FeedSensor::new("cloud_sensor");
        let (enclosure, enclosure_feed) = FeedSensor::new("enclosure");

        let sensors = SensorRegistry::new()
            .with_sensor("anemometer", share_sensor(wind))
            .and_then(|r| r.with_sensor("cloud_sensor", share_sensor(sky)))
            .and_then(|r| r.with_sensor("enclosure", share_sensor(enclosure)))
            .expect("distinct sensor names");

        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::new(0));
        let loader = ConfigLoader::new(sensors)
            .with_sink(sink.clone())
            .with_clock(clock.clone());

        Self {
            wind: wind_feed,
            sky: sky_feed,
            enclosure: enclosure_feed,
            sink,
            clock,
            loader,
        }
    }

    /// Move the clock to `t` and publish a wind reading stamped `t`
    pub fn wind_at(&self, t: Timestamp, speed: f64) {
        self.clock.set(t);
        self.wind.publish(Reading::continuous(t, speed));
    }

    /// Move the clock to `t` and publish a sky state stamped `t`
    pub fn sky_at(&self, t: Timestamp, state: i32) {
        self.clock.set(t);
        self.sky.publish(Reading::discrete(t, state));
    }
}
