//! Condition monitoring engine for Skywatch
//!
//! Turns raw telemetry (wind speed, sky state, enclosure and power status) into
//! debounced, edge-triggered events for a telescope operations supervisor.
//!
//! ```text
//! Sensor → SensorFilter → ConditionRule → Ruleset → Monitor → EventSink
//!                                                      ▲
//!                                        MonitorScheduler (tokio)
//! ```
//!
//! Key properties:
//! - Filters never fail; empty or unusable data yields a documented default
//! - Rules confirm crossings over time and clear through a separate level
//! - Rulesets report a condition once per arm/fire cycle
//! - Monitors evaluate in registration order and rate-limit early triggers
//! - Configuration errors are caught at load time, never during monitoring
//!
//! ```no_run
//! use std::sync::Arc;
//! use skywatch_core::{ConfigLoader, FeedSensor, LogSink, SensorRegistry, share_sensor};
//!
//! # fn main() -> Result<(), skywatch_core::ConfigError> {
//! let (anemometer, feed) = FeedSensor::new("anemometer");
//! let sensors = SensorRegistry::new().with_sensor("anemometer", share_sensor(anemometer))?;
//!
//! let config = ConfigLoader::new(sensors)
//!     .with_sink(Arc::new(LogSink))
//!     .load_str(
//!         "FILTER wind READS anemometer AVER 5\n\
//!          RULE high_wind DELINV WHEN wind GT 15 INVERT 12 DELTA 60000\n\
//!          RULESET close SIMPLE high_wind\n\
//!          MONITOR weather 10000\n\
//!          weather ASSOC close FIRES CLOSE_DOME\n",
//!     )?;
//! # let _ = (config, feed);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod filters;
pub mod monitor;
pub mod rules;
pub mod ruleset;
#[cfg(feature = "scheduler")]
pub mod scheduler;
pub mod sensors;
pub mod time;
pub mod traits;

pub use buffer::{Capacity, ReadingBuffer};
pub use config::{
    ConfigLoader, Configuration, FilterRegistry, FilterSet, MonitorSet, RuleTable, RulesetTable,
    SensorRegistry,
};
pub use constants::{STATE_BAD, STATE_GOOD};
pub use errors::{ConfigError, ConfigResult, SensorError};
pub use events::{EventSink, LogSink, MonitorEvent, RecordingSink};
pub use filters::{Aggregation, FilterSnapshot, Multiplexer, SensorFilter, ValueTable};
pub use monitor::{Monitor, MonitorStats, SharedMonitor, TriggerOutcome};
pub use rules::{Condition, ConditionRule, Direction, RulePhase};
pub use ruleset::{Policy, Ruleset, SharedRuleset};
pub use sensors::{DataListener, FeedHandle, FeedSensor, FnSensor};
pub use time::{ManualClock, SystemClock, TimeSource, Timestamp};
pub use traits::{
    share_filter, share_rule, share_sensor, Filter, Reading, Rule, Sensor, SharedFilter,
    SharedRule, SharedSensor,
};

#[cfg(feature = "scheduler")]
pub use events::ChannelSink;
#[cfg(feature = "scheduler")]
pub use scheduler::{MonitorScheduler, SchedulerConfig, SchedulerHandle, WakeHandle};
