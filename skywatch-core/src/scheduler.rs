//! Monitor scheduler: one loop triggering every monitor in turn
//!
//! ## Overview
//!
//! The scheduler runs a single tokio task. Each pass triggers every registered
//! monitor in registration order; between passes the loop waits for whichever
//! comes first:
//!
//! ```text
//!            ┌──────────── interval elapsed ────────────┐
//!   wait ────┤                                          ├──→ pass ──→ wait
//!            └──── WakeHandle::wake (new data) ─────────┘
//!            └──── shutdown ──→ exit
//! ```
//!
//! Timer expiry and an early wake are treated identically. Monitors protect
//! themselves against being driven too fast through their own rate limit, so
//! feeds may call [`WakeHandle::wake`] on every new sample.
//!
//! A wake arriving while a pass is running is remembered and causes one extra
//! pass immediately after; any number of wakes in that window collapse into
//! one.
//!
//! Passes run on tokio's blocking pool. Sampling a sensor may block on I/O or
//! hardware, and the monitors are guarded by `std::sync::Mutex`; neither may
//! hold up the runtime threads that drive task timeouts. The loop awaits each
//! pass before waiting again, so passes never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::constants::time::DEFAULT_SCHEDULER_INTERVAL_MS;
use crate::monitor::{SharedMonitor, TriggerOutcome};
use crate::sensors::DataListener;
use crate::traits::lock;

/// Scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Pause between passes when nothing wakes the loop (milliseconds)
    pub interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SCHEDULER_INTERVAL_MS,
        }
    }
}

/// Counters updated by the scheduler loop
#[derive(Debug, Default)]
pub struct SchedulerStats {
    passes: AtomicU64,
    evaluations: AtomicU64,
    events_posted: AtomicU64,
}

impl SchedulerStats {
    /// Completed passes
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Monitor triggers that were not rate-limited
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Events posted by all monitors
    pub fn events_posted(&self) -> u64 {
        self.events_posted.load(Ordering::Relaxed)
    }
}

/// Cloneable handle waking the scheduler early
#[derive(Debug, Clone)]
pub struct WakeHandle {
    notify: Arc<Notify>,
}

impl WakeHandle {
    /// Request a pass as soon as possible
    pub fn wake(&self) {
        self.notify.notify_one();
    }
}

impl DataListener for WakeHandle {
    fn data_available(&self) {
        self.wake();
    }
}

/// Scheduler under construction
pub struct MonitorScheduler {
    config: SchedulerConfig,
    monitors: Vec<SharedMonitor>,
    notify: Arc<Notify>,
    stats: Arc<SchedulerStats>,
}

impl MonitorScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            monitors: Vec::new(),
            notify: Arc::new(Notify::new()),
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Register a monitor; passes trigger monitors in registration order
    pub fn add_monitor(&mut self, monitor: SharedMonitor) {
        self.monitors.push(monitor);
    }

    pub fn with_monitor(mut self, monitor: SharedMonitor) -> Self {
        self.add_monitor(monitor);
        self
    }

    /// Register several monitors, keeping their order
    pub fn with_monitors<I>(mut self, monitors: I) -> Self
    where
        I: IntoIterator<Item = SharedMonitor>,
    {
        self.monitors.extend(monitors);
        self
    }

    /// Wake handle usable before the loop is spawned (e.g. to hand to feeds)
    pub fn wake_handle(&self) -> WakeHandle {
        WakeHandle {
            notify: Arc::clone(&self.notify),
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Trigger every monitor once, returning the number of events posted
    pub fn pass(&self) -> u64 {
        run_pass(&self.monitors, &self.stats)
    }

    /// Start the loop on the current tokio runtime
    ///
    /// The loop stops when [`SchedulerHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let wake = self.wake_handle();
        let stats = self.stats();

        log::info!(
            "monitor scheduler starting: {} monitors, interval {} ms",
            self.monitors.len(),
            self.config.interval_ms
        );
        let join = tokio::spawn(self.run(shutdown_rx));

        SchedulerHandle {
            wake,
            stats,
            shutdown_tx,
            join,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_millis(self.config.interval_ms);
        let monitors: Arc<[SharedMonitor]> = self.monitors.into();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
                _ = self.notify.notified() => log::trace!("scheduler woken early"),
            }

            let pass_monitors = Arc::clone(&monitors);
            let pass_stats = Arc::clone(&self.stats);
            let pass = tokio::task::spawn_blocking(move || run_pass(&pass_monitors, &pass_stats));
            if let Err(e) = pass.await {
                log::error!("monitor pass ended abnormally: {}", e);
            }
        }
        log::info!(
            "monitor scheduler stopped after {} passes",
            self.stats.passes()
        );
    }
}

impl Default for MonitorScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

fn run_pass(monitors: &[SharedMonitor], stats: &SchedulerStats) -> u64 {
    let mut posted = 0;
    for monitor in monitors {
        if let TriggerOutcome::Evaluated { fired } = lock(monitor).trigger() {
            stats.evaluations.fetch_add(1, Ordering::Relaxed);
            posted += fired as u64;
        }
    }
    stats.events_posted.fetch_add(posted, Ordering::Relaxed);
    stats.passes.fetch_add(1, Ordering::Relaxed);
    posted
}

/// Handle to a running scheduler loop
pub struct SchedulerHandle {
    wake: WakeHandle,
    stats: Arc<SchedulerStats>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request an early pass
    pub fn wake(&self) {
        self.wake.wake();
    }

    pub fn wake_handle(&self) -> WakeHandle {
        self.wake.clone()
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the loop and wait for the current pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            log::error!("monitor scheduler task ended abnormally: {}", e);
        }
    }
}
