//! Bundled sensor implementations
//!
//! Real instruments live outside this crate and implement [`Sensor`] directly.
//! Two adapters cover the common cases:
//!
//! - [`FeedSensor`]: values are *pushed* by a telemetry feed (status poller,
//!   weather station client) through a [`FeedHandle`]. Publishing can notify a
//!   [`DataListener`] so the monitor scheduler runs an early pass.
//! - [`FnSensor`]: values are *pulled* by calling a closure on each sample.

use std::sync::{Arc, Mutex};

use crate::errors::SensorError;
use crate::traits::{lock, Reading, Sensor};

/// Receiver of "new data available" notifications
pub trait DataListener: Send + Sync {
    /// Called after a feed published a new reading
    fn data_available(&self);
}

/// Sensor whose readings are pushed from elsewhere
pub struct FeedSensor {
    name: String,
    latest: Arc<Mutex<Option<Reading>>>,
}

/// Publishing side of a [`FeedSensor`]
#[derive(Clone)]
pub struct FeedHandle {
    latest: Arc<Mutex<Option<Reading>>>,
    listener: Option<Arc<dyn DataListener>>,
}

impl FeedSensor {
    /// Create a feed sensor and the handle used to publish into it
    pub fn new(name: impl Into<String>) -> (Self, FeedHandle) {
        let latest = Arc::new(Mutex::new(None));
        let sensor = Self {
            name: name.into(),
            latest: Arc::clone(&latest),
        };
        let handle = FeedHandle {
            latest,
            listener: None,
        };
        (sensor, handle)
    }
}

impl FeedHandle {
    /// Notify `listener` whenever a reading is published
    pub fn with_listener(mut self, listener: Arc<dyn DataListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Replace the feed's latest reading
    pub fn publish(&self, reading: Reading) {
        *lock(&self.latest) = Some(reading);
        if let Some(listener) = &self.listener {
            listener.data_available();
        }
    }
}

impl Sensor for FeedSensor {
    fn sample(&mut self) -> nb::Result<(), SensorError> {
        // Nothing to acquire: the feed pushes. Only report an empty feed.
        if lock(&self.latest).is_some() {
            Ok(())
        } else {
            Err(nb::Error::Other(SensorError::NoData {
                sensor: self.name.clone(),
            }))
        }
    }

    fn read(&self) -> Option<Reading> {
        *lock(&self.latest)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Sensor that acquires by calling a closure
pub struct FnSensor<F> {
    name: String,
    acquire: F,
    latest: Option<Reading>,
}

impl<F> FnSensor<F>
where
    F: FnMut() -> Result<Reading, SensorError> + Send,
{
    pub fn new(name: impl Into<String>, acquire: F) -> Self {
        Self {
            name: name.into(),
            acquire,
            latest: None,
        }
    }
}

impl<F> Sensor for FnSensor<F>
where
    F: FnMut() -> Result<Reading, SensorError> + Send,
{
    fn sample(&mut self) -> nb::Result<(), SensorError> {
        let reading = (self.acquire)().map_err(nb::Error::Other)?;
        self.latest = Some(reading);
        Ok(())
    }

    fn read(&self) -> Option<Reading> {
        self.latest
    }

    fn name(&self) -> &str {
        &self.name
    }
}
