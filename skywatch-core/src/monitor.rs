//! Monitors: periodic evaluation of rulesets bound to event identifiers
//!
//! A monitor owns an ordered list of `(ruleset, event id)` bindings. Each
//! trigger samples the clock once, evaluates every ruleset in registration
//! order with that instant, and posts the bound event for each ruleset that
//! reports a rising edge.
//!
//! Triggers arriving less than half a period after the previous evaluation are
//! rate-limited and return without touching any ruleset, so a scheduler woken
//! repeatedly by data feeds cannot drive a monitor faster than intended.

use std::sync::{Arc, Mutex};

use crate::constants::time::{DEFAULT_MONITOR_PERIOD_MS, MONITOR_RATE_LIMIT_FRACTION};
use crate::events::{EventSink, LogSink, MonitorEvent};
use crate::ruleset::SharedRuleset;
use crate::time::{elapsed_ms, SystemClock, TimeSource, Timestamp};
use crate::traits::lock;

/// Monitor shared with a scheduler
pub type SharedMonitor = Arc<Mutex<Monitor>>;

/// Result of one [`Monitor::trigger`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Too soon after the previous evaluation, nothing evaluated
    RateLimited,
    /// Rulesets evaluated; `fired` events were posted
    Evaluated {
        /// Number of events posted
        fired: usize,
    },
}

impl TriggerOutcome {
    pub fn fired(&self) -> usize {
        match self {
            TriggerOutcome::RateLimited => 0,
            TriggerOutcome::Evaluated { fired } => *fired,
        }
    }
}

/// Counters kept across triggers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorStats {
    /// Triggers that evaluated rulesets
    pub evaluations: u64,
    /// Triggers rejected by the rate limit
    pub rate_limited: u64,
    /// Events posted to the sink
    pub events_posted: u64,
}

struct Binding {
    ruleset: SharedRuleset,
    event_id: String,
}

/// Periodic evaluator of rulesets
pub struct Monitor {
    id: String,
    period_ms: u64,
    last_trigger: Option<Timestamp>,
    bindings: Vec<Binding>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn TimeSource>,
    stats: MonitorStats,
}

impl Monitor {
    /// Monitor posting to the log, timed by the system clock
    pub fn new(id: impl Into<String>, period_ms: u64) -> Self {
        Self {
            id: id.into(),
            period_ms,
            last_trigger: None,
            bindings: Vec::new(),
            sink: Arc::new(LogSink),
            clock: Arc::new(SystemClock),
            stats: MonitorStats::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the sink after construction (configuration loaders build monitors first)
    pub fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    pub fn set_clock(&mut self, clock: Arc<dyn TimeSource>) {
        self.clock = clock;
    }

    /// Wrap for sharing with a scheduler
    pub fn shared(self) -> SharedMonitor {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Instant of the last evaluation, if any
    pub fn last_trigger(&self) -> Option<Timestamp> {
        self.last_trigger
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind `ruleset` to `event_id`; bindings are evaluated in registration order
    pub fn associate_ruleset(&mut self, ruleset: SharedRuleset, event_id: impl Into<String>) {
        let event_id = event_id.into();
        log::debug!(
            "monitor {}: {} fires {}",
            self.id,
            lock(&ruleset).name(),
            event_id
        );
        self.bindings.push(Binding { ruleset, event_id });
    }

    /// Builder form of [`associate_ruleset`](Self::associate_ruleset)
    pub fn with_ruleset(mut self, ruleset: SharedRuleset, event_id: impl Into<String>) -> Self {
        self.associate_ruleset(ruleset, event_id);
        self
    }

    /// Evaluate at the clock's current time
    pub fn trigger(&mut self) -> TriggerOutcome {
        let now = self.clock.now();
        self.trigger_at(now)
    }

    /// Evaluate at an explicit instant
    pub fn trigger_at(&mut self, now: Timestamp) -> TriggerOutcome {
        if let Some(last) = self.last_trigger {
            let guard = MONITOR_RATE_LIMIT_FRACTION * self.period_ms as f64;
            if elapsed_ms(last, now) as f64 <= guard {
                self.stats.rate_limited += 1;
                log::trace!("monitor {}: rate-limited at t={}", self.id, now);
                return TriggerOutcome::RateLimited;
            }
        }
        self.last_trigger = Some(now);
        self.stats.evaluations += 1;

        let mut fired = 0;
        for binding in &self.bindings {
            let mut ruleset = lock(&binding.ruleset);
            if ruleset.invoke(now) {
                let event = MonitorEvent::new(&binding.event_id, &self.id, ruleset.name(), now);
                drop(ruleset);
                log::info!("monitor {}: posting {}", self.id, event.event_id);
                self.sink.post_event(event);
                fired += 1;
            }
        }

        self.stats.events_posted += fired as u64;
        TriggerOutcome::Evaluated { fired }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new("monitor", DEFAULT_MONITOR_PERIOD_MS)
    }
}
