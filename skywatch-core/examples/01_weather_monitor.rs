//! Weather Monitoring Example
//!
//! Loads a small observatory configuration, feeds it simulated anemometer
//! readings and prints the events the monitor posts.
//!
//! ## What You'll Learn
//!
//! - Registering sensors and loading a configuration from text
//! - Publishing telemetry through a feed that wakes the scheduler
//! - Receiving events through a channel sink
//!
//! ## Pipeline
//!
//! ```text
//! FeedHandle → FeedSensor → AVER filter → DELINV rule → Ruleset → Monitor → ChannelSink
//!     └────── wake ──────→ MonitorScheduler ─────────────────────────┘
//! ```
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_weather_monitor
//! ```

use std::sync::Arc;
use std::time::Duration;

use skywatch_core::{
    share_sensor, ChannelSink, ConfigLoader, FeedSensor, MonitorScheduler, Reading,
    SchedulerConfig, SensorRegistry, SystemClock, TimeSource,
};

const CONFIG: &str = "
# Close the dome when the 3-sample mean wind stays above 15 m/s for 2 s,
# reopen permission once it has dropped back below 12 m/s.
FILTER wind READS anemometer AVER 3
RULE high_wind DELINV WHEN wind GT 15 INVERT 12 DELTA 2000
RULE calm      THRESH WHEN wind LT 5
RULESET close_dome SIMPLE high_wind
RULESET all_calm   SIMPLE calm
MONITOR weather 400
weather ASSOC close_dome FIRES CLOSE_DOME
weather ASSOC all_calm   FIRES WIND_CALM
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Skywatch Weather Monitor Example");
    println!("================================\n");

    let (anemometer, feed) = FeedSensor::new("anemometer");
    let sensors = SensorRegistry::new().with_sensor("anemometer", share_sensor(anemometer))?;

    let (sink, mut events) = ChannelSink::new();
    let config = ConfigLoader::new(sensors)
        .with_sink(Arc::new(sink))
        .load_str(CONFIG)?;

    println!(
        "Loaded {} filter(s), {} rule(s), {} monitor(s)\n",
        config.filters.len(),
        config.rules.len(),
        config.monitors.len()
    );

    let scheduler = config.scheduler(SchedulerConfig { interval_ms: 500 });
    let feed = feed.with_listener(Arc::new(scheduler.wake_handle()));
    let handle = scheduler.spawn();

    // Simulated gust front: calm, rising, sustained, easing
    let profile = [
        3.0, 3.5, 4.0, 8.0, 12.0, 16.0, 18.0, 19.0, 18.5, 17.0, 17.5, 16.0, 13.0, 11.0, 8.0,
        4.0, 3.0, 2.5,
    ];

    let clock = SystemClock;
    for speed in profile {
        feed.publish(Reading::continuous(clock.now(), speed));
        println!("  wind {:>5.1} m/s", speed);
        tokio::time::sleep(Duration::from_millis(300)).await;

        while let Ok(event) = events.try_recv() {
            println!("  >>> {}", event);
        }
    }

    let stats = handle.stats();
    handle.shutdown().await;

    println!("\nScheduler passes:    {}", stats.passes());
    println!("Monitor evaluations: {}", stats.evaluations());
    println!("Events posted:       {}", stats.events_posted());

    Ok(())
}
