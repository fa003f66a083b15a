//! Monitor events and the sinks that receive them
//!
//! ## Overview
//!
//! When a ruleset reports a rising edge, its monitor posts the symbolic event
//! identifier bound to that ruleset. What happens next (a telescope operations
//! supervisor closing the dome, a pager alert, a log line) is outside the
//! engine: the monitor hands a [`MonitorEvent`] to an [`EventSink`] and moves
//! on to the next binding.
//!
//! ```text
//! Monitor ──post_event──→ EventSink ──→ log / channel / memory / your own
//! ```
//!
//! Posting is fire-and-forget. A sink must not block the trigger path for
//! long and has no way to report failure back to the monitor; sinks that can
//! fail (a closed channel) log and drop the event.
//!
//! ## Payload Format
//!
//! Events carry a text payload for sinks that forward strings:
//!
//! ```text
//! monitor=<monitor id> ruleset=<ruleset name> time=<ms>
//! ```

use std::fmt;
use std::sync::Mutex;

use crate::time::Timestamp;
use crate::traits::lock;

/// One posted event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorEvent {
    /// Symbolic identifier from the `ASSOC ... FIRES <event>` binding
    pub event_id: String,
    /// Monitor that evaluated the ruleset
    pub monitor: String,
    /// Ruleset that fired
    pub ruleset: String,
    /// Trigger instant (milliseconds)
    pub time: Timestamp,
}

impl MonitorEvent {
    pub fn new(
        event_id: impl Into<String>,
        monitor: impl Into<String>,
        ruleset: impl Into<String>,
        time: Timestamp,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            monitor: monitor.into(),
            ruleset: ruleset.into(),
            time,
        }
    }

    /// Text payload (`monitor=.. ruleset=.. time=..`)
    pub fn payload(&self) -> String {
        format!(
            "monitor={} ruleset={} time={}",
            self.monitor, self.ruleset, self.time
        )
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.event_id, self.payload())
    }
}

/// Receiver of posted events
pub trait EventSink: Send + Sync {
    /// Deliver one event; must not fail or block for long
    fn post_event(&self, event: MonitorEvent);
}

/// Sink writing every event to the log at `info`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn post_event(&self, event: MonitorEvent) {
        log::info!("event {}", event);
    }
}

/// Sink keeping every event in memory, in posting order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything posted so far
    pub fn events(&self) -> Vec<MonitorEvent> {
        lock(&self.events).clone()
    }

    /// Posted event identifiers, in order
    pub fn event_ids(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .map(|event| event.event_id.clone())
            .collect()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<MonitorEvent> {
        std::mem::take(&mut *lock(&self.events))
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }
}

impl EventSink for RecordingSink {
    fn post_event(&self, event: MonitorEvent) {
        lock(&self.events).push(event);
    }
}

#[cfg(feature = "scheduler")]
pub use channel::ChannelSink;

#[cfg(feature = "scheduler")]
mod channel {
    use super::{EventSink, MonitorEvent};
    use tokio::sync::mpsc;

    /// Sink forwarding events into a tokio channel
    ///
    /// The receiving side typically lives in the task that acts on events.
    #[derive(Debug, Clone)]
    pub struct ChannelSink {
        tx: mpsc::UnboundedSender<MonitorEvent>,
    }

    impl ChannelSink {
        /// Create a sink and the receiver it feeds
        pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    impl EventSink for ChannelSink {
        fn post_event(&self, event: MonitorEvent) {
            if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
                log::warn!("event receiver closed, dropping {}", event.event_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_format() {
        let event = MonitorEvent::new("CLOSE_DOME", "weather", "high_wind", 42_000);
        assert_eq!(event.payload(), "monitor=weather ruleset=high_wind time=42000");
        assert_eq!(
            event.to_string(),
            "CLOSE_DOME [monitor=weather ruleset=high_wind time=42000]"
        );
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.post_event(MonitorEvent::new("A", "m", "r1", 1));
        sink.post_event(MonitorEvent::new("B", "m", "r2", 1));
        assert_eq!(sink.event_ids(), vec!["A", "B"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[cfg(feature = "scheduler")]
    #[test]
    fn channel_sink_forwards_and_survives_closed_receiver() {
        let (sink, mut rx) = ChannelSink::new();
        sink.post_event(MonitorEvent::new("A", "m", "r", 5));
        assert_eq!(rx.try_recv().map(|e| e.event_id).ok().as_deref(), Some("A"));

        drop(rx);
        sink.post_event(MonitorEvent::new("B", "m", "r", 6));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn event_serializes() {
        let event = MonitorEvent::new("A", "m", "r", 5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_id"], "A");
        assert_eq!(json["time"], 5);
    }
}
