//! Configuration loading
//!
//! ## Overview
//!
//! A site's monitoring setup is a plain text file, one directive per line,
//! `#` starting a comment. [`ConfigLoader`] reads it and returns a
//! [`Configuration`]: the complete object graph of filters, rules, rulesets and
//! monitors, ready to hand to a [`MonitorScheduler`](crate::scheduler::MonitorScheduler).
//! Nothing is registered globally; two loaders can build two independent
//! graphs in one process.
//!
//! ## Grammar
//!
//! ```text
//! DEFINE  <symbol> <int>
//! FILTER  <name> READS <sensor> <TYPE> <params...>
//! MUX     <name> COMBINE <filter> <weight> [<filter> <weight> ...]
//! RULE    <name> THRESH WHEN <filter> (GT|>|ABOVE|LT|<|BELOW) <value>
//! RULE    <name> DELINV WHEN <filter> (GT|LT|...) <value> INVERT <inv> DELTA <ms>
//! RULE    <name> SELECT FROM <filter> (EQ|==|IS|NEQ|!=|NOT) <value>
//! RULE    <name> ANYOF  FROM <filter> IN <v1>[,<v2>...] [DELTA <ms>]
//! RULESET <name> (SIMPLE|CONJ|DISJ) <rule> [<rule> ...]
//! MONITOR <name> <periodMs>
//! <monitor> ASSOC <ruleset> FIRES <eventId>
//! ```
//!
//! Filter types are resolved through the [`FilterRegistry`]; see
//! [`crate::filters`] for the built-in keywords and their parameters.
//! Discrete values (`SELECT`, `ANYOF`, valid value lists, defaults) may be
//! written as integers or as symbols declared earlier with `DEFINE`.
//!
//! Names must be declared before they are referenced. Any malformed line
//! aborts the load with a [`ConfigError`] naming the line; a line starting with
//! an unrecognised keyword is logged and skipped.
//!
//! ## Example
//!
//! ```text
//! DEFINE CLEAR  1
//! DEFINE CLOUDY 2
//!
//! FILTER wind   READS anemometer AVER 5
//! FILTER sky    READS cloud_sensor MODAL 5 0 CLEAR CLOUDY
//!
//! RULE high_wind DELINV WHEN wind GT 15 INVERT 12 DELTA 60000
//! RULE cloudy    SELECT FROM sky EQ CLOUDY
//!
//! RULESET close_dome DISJ high_wind cloudy
//!
//! MONITOR weather 10000
//! weather ASSOC close_dome FIRES CLOSE_DOME
//! ```

mod parser;
mod registry;
mod tables;

pub use parser::{tokenize, Cursor, Symbols};
pub use registry::{FilterConstructor, FilterRegistry, FilterSpec, SensorRegistry};
pub use tables::NamedTable;

use std::path::Path;
use std::sync::Arc;

use crate::errors::{ConfigError, ConfigResult};
use crate::events::{EventSink, LogSink};
use crate::filters::Multiplexer;
use crate::monitor::{Monitor, SharedMonitor};
use crate::rules::{AnyOfSet, Condition, ConditionRule, Direction};
use crate::ruleset::{Policy, Ruleset, SharedRuleset};
use crate::time::{SystemClock, TimeSource};
use crate::traits::{lock, share_filter, share_rule, SharedFilter, SharedRule};

/// Filters and multiplexers by name
pub type FilterSet = NamedTable<SharedFilter>;

/// Rules by name
pub type RuleTable = NamedTable<SharedRule>;

/// Rulesets by name
pub type RulesetTable = NamedTable<SharedRuleset>;

/// Monitors by name, in declaration order
pub type MonitorSet = NamedTable<SharedMonitor>;

/// Object graph built from one configuration source
pub struct Configuration {
    /// `DEFINE`d symbols
    pub symbols: Symbols,
    /// Filters and multiplexers
    pub filters: FilterSet,
    /// Rules
    pub rules: RuleTable,
    /// Rulesets
    pub rulesets: RulesetTable,
    /// Monitors, in declaration order
    pub monitors: MonitorSet,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("symbols", &self.symbols)
            .field("filters", &self.filters.names().collect::<Vec<_>>())
            .field("rules", &self.rules.names().collect::<Vec<_>>())
            .field("rulesets", &self.rulesets.names().collect::<Vec<_>>())
            .field("monitors", &self.monitors.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Configuration {
    fn new() -> Self {
        Self {
            symbols: Symbols::new(),
            filters: NamedTable::new("filter"),
            rules: NamedTable::new("rule"),
            rulesets: NamedTable::new("ruleset"),
            monitors: NamedTable::new("monitor"),
        }
    }

    pub fn filter(&self, name: &str) -> Option<&SharedFilter> {
        self.filters.get(name)
    }

    pub fn rule(&self, name: &str) -> Option<&SharedRule> {
        self.rules.get(name)
    }

    pub fn ruleset(&self, name: &str) -> Option<&SharedRuleset> {
        self.rulesets.get(name)
    }

    pub fn monitor(&self, name: &str) -> Option<&SharedMonitor> {
        self.monitors.get(name)
    }

    /// Scheduler driving every monitor in declaration order
    #[cfg(feature = "scheduler")]
    pub fn scheduler(
        &self,
        config: crate::scheduler::SchedulerConfig,
    ) -> crate::scheduler::MonitorScheduler {
        crate::scheduler::MonitorScheduler::new(config)
            .with_monitors(self.monitors.values().cloned())
    }
}

/// Builds a [`Configuration`] from the text grammar
pub struct ConfigLoader {
    sensors: SensorRegistry,
    filters: FilterRegistry,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn TimeSource>,
}

impl ConfigLoader {
    /// Loader resolving sensors from `sensors`, with the built-in filter types
    pub fn new(sensors: SensorRegistry) -> Self {
        Self {
            sensors,
            filters: FilterRegistry::new(),
            sink: Arc::new(LogSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_filter_registry(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Sink given to every monitor
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Clock given to every monitor
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Filter registry, for adding site-specific keywords
    pub fn filter_registry_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Load from a file
    pub fn load_file(&self, path: impl AsRef<Path>) -> ConfigResult<Configuration> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("loading monitor configuration from {}", path.display());
        self.load_str(&text)
    }

    /// Load from text
    pub fn load_str(&self, text: &str) -> ConfigResult<Configuration> {
        let mut config = Configuration::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let tokens = tokenize(raw);
            if tokens.is_empty() {
                continue;
            }
            self.apply(&mut config, &tokens)
                .map_err(|e| e.at_line(line))?;
        }

        log::info!(
            "configuration loaded: {} filters, {} rules, {} rulesets, {} monitors",
            config.filters.len(),
            config.rules.len(),
            config.rulesets.len(),
            config.monitors.len()
        );
        Ok(config)
    }

    fn apply(&self, config: &mut Configuration, tokens: &[&str]) -> ConfigResult<()> {
        let keyword = tokens[0].to_ascii_uppercase();
        let args = &tokens[1..];
        match keyword.as_str() {
            "DEFINE" => define(config, args),
            "FILTER" => self.filter(config, args),
            "MUX" => multiplexer(config, args),
            "RULE" => rule(config, args),
            "RULESET" => ruleset(config, args),
            "MONITOR" => self.monitor(config, args),
            _ if args.first().is_some_and(|t| t.eq_ignore_ascii_case("ASSOC")) => {
                associate(config, tokens)
            }
            _ => {
                log::warn!("skipping unknown directive '{}'", tokens[0]);
                Ok(())
            }
        }
    }

    fn filter(&self, config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
        let mut cursor = Cursor::new("FILTER", args);
        let name = cursor.next("filter name")?;
        cursor.expect("READS")?;
        let sensor_name = cursor.next("sensor name")?;
        let keyword = cursor.next("filter type")?;
        let params = cursor.rest();

        let sensor = self
            .sensors
            .get(sensor_name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSensor {
                line: 0,
                name: sensor_name.to_string(),
            })?;

        if config.filters.contains(name) {
            return Err(duplicate("filter", name));
        }
        let filter = self.filters.build(
            keyword,
            FilterSpec {
                name,
                sensor,
                params,
                symbols: &config.symbols,
            },
        )?;
        log::debug!("filter {} reads {} ({})", name, sensor_name, keyword);
        config.filters.insert(name, filter)
    }

    fn monitor(&self, config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
        let mut cursor = Cursor::new("MONITOR", args);
        let name = cursor.next("monitor name")?;
        let period_ms: u64 = cursor.number("period")?;
        cursor.finish()?;
        if period_ms == 0 {
            return Err(ConfigError::invalid("MONITOR", "period must be positive"));
        }

        let monitor = Monitor::new(name, period_ms)
            .with_sink(Arc::clone(&self.sink))
            .with_clock(Arc::clone(&self.clock));
        config.monitors.insert(name, monitor.shared())
    }
}

fn duplicate(kind: &'static str, name: &str) -> ConfigError {
    ConfigError::Duplicate {
        line: 0,
        kind,
        name: name.to_string(),
    }
}

fn lookup_filter(config: &Configuration, name: &str) -> ConfigResult<SharedFilter> {
    config
        .filters
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownFilter {
            line: 0,
            name: name.to_string(),
        })
}

fn define(config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
    let mut cursor = Cursor::new("DEFINE", args);
    let symbol = cursor.next("symbol")?;
    let value = cursor.number("symbol value")?;
    cursor.finish()?;
    config.symbols.define(symbol, value)
}

fn multiplexer(config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
    let mut cursor = Cursor::new("MUX", args);
    let name = cursor.next("multiplexer name")?;
    cursor.expect("COMBINE")?;

    let mut mux = Multiplexer::new(name);
    while cursor.peek().is_some() {
        let input = lookup_filter(config, cursor.next("input filter")?)?;
        let weight = cursor.finite("weight")?;
        mux.combine(input, weight)?;
    }
    if mux.is_empty() {
        return Err(ConfigError::Syntax {
            line: 0,
            construct: "MUX",
            message: "no inputs".into(),
        });
    }
    config.filters.insert(name, share_filter(mux))
}

fn rule(config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
    let mut cursor = Cursor::new("RULE", args);
    let name = cursor.next("rule name")?;
    let category = cursor.expect_one_of(&["THRESH", "DELINV", "SELECT", "ANYOF"])?;
    cursor.expect_one_of(&["WHEN", "FROM"])?;
    let filter = lookup_filter(config, cursor.next("filter name")?)?;

    let condition = match category.as_str() {
        "THRESH" => {
            let direction = direction(&mut cursor)?;
            let threshold = cursor.finite("threshold")?;
            Condition::Threshold {
                threshold,
                direction,
            }
        }
        "DELINV" => {
            let direction = direction(&mut cursor)?;
            let threshold = cursor.finite("threshold")?;
            cursor.expect("INVERT")?;
            let invert = cursor.finite("invert level")?;
            cursor.expect("DELTA")?;
            let delay_ms = cursor.number("delay")?;
            if !direction.valid_inversion(threshold, invert) {
                return Err(ConfigError::invalid(
                    "DELINV rule",
                    format!(
                        "invert level {} is on the wrong side of threshold {}",
                        invert, threshold
                    ),
                ));
            }
            Condition::DelayedInvertible {
                threshold,
                invert,
                delay_ms,
                direction,
            }
        }
        "SELECT" => {
            let op = cursor.expect_one_of(&["EQ", "==", "IS", "NEQ", "!=", "NOT"])?;
            let value = config.symbols.resolve(cursor.next("test value")?)?;
            Condition::Select {
                value,
                negate: matches!(op.as_str(), "NEQ" | "!=" | "NOT"),
            }
        }
        _ => {
            cursor.expect("IN")?;
            let mut members = Vec::new();
            while let Some(token) = cursor.peek() {
                if token.eq_ignore_ascii_case("DELTA") {
                    break;
                }
                cursor.next("value")?;
                for part in token.split(',').filter(|p| !p.is_empty()) {
                    members.push(config.symbols.resolve(part)?);
                }
            }
            let delay_ms = if cursor.accept("DELTA") {
                cursor.number("delay")?
            } else {
                0
            };
            Condition::AnyOf {
                values: AnyOfSet::new(&members)?,
                delay_ms,
            }
        }
    };
    cursor.finish()?;

    if config.rules.contains(name) {
        return Err(duplicate("rule", name));
    }
    config
        .rules
        .insert(name, share_rule(ConditionRule::new(name, filter, condition)))
}

fn direction(cursor: &mut Cursor<'_>) -> ConfigResult<Direction> {
    let token = cursor.next("comparison")?;
    Direction::from_keyword(token).ok_or_else(|| ConfigError::Syntax {
        line: 0,
        construct: "RULE",
        message: format!("unknown comparison '{}'", token),
    })
}

fn ruleset(config: &mut Configuration, args: &[&str]) -> ConfigResult<()> {
    let mut cursor = Cursor::new("RULESET", args);
    let name = cursor.next("ruleset name")?;
    let keyword = cursor.next("encapsulation")?;

    if keyword.eq_ignore_ascii_case("FUZZY") {
        return Err(ConfigError::Unsupported {
            line: 0,
            construct: "FUZZY ruleset",
            reason: "fuzzy combination is not implemented",
        });
    }
    let policy = Policy::from_keyword(keyword).ok_or_else(|| ConfigError::Syntax {
        line: 0,
        construct: "RULESET",
        message: format!("unknown encapsulation '{}'", keyword),
    })?;

    let rules = cursor
        .rest()
        .iter()
        .map(|&rule| {
            config.rules.get(rule).cloned().ok_or_else(|| ConfigError::UnknownRule {
                line: 0,
                name: rule.to_string(),
            })
        })
        .collect::<ConfigResult<Vec<_>>>()?;

    if config.rulesets.contains(name) {
        return Err(duplicate("ruleset", name));
    }
    let ruleset = Ruleset::new(name, policy, rules)?;
    config.rulesets.insert(name, ruleset.shared())
}

fn associate(config: &mut Configuration, tokens: &[&str]) -> ConfigResult<()> {
    let mut cursor = Cursor::new("ASSOC", tokens);
    let monitor_name = cursor.next("monitor name")?;
    cursor.expect("ASSOC")?;
    let ruleset_name = cursor.next("ruleset name")?;
    cursor.expect("FIRES")?;
    let event_id = cursor.next("event id")?;
    cursor.finish()?;

    let monitor = config
        .monitors
        .get(monitor_name)
        .ok_or_else(|| ConfigError::UnknownMonitor {
            line: 0,
            name: monitor_name.to_string(),
        })?;
    let ruleset = config
        .rulesets
        .get(ruleset_name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownRuleset {
            line: 0,
            name: ruleset_name.to_string(),
        })?;
    lock(monitor).associate_ruleset(ruleset, event_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::monitor::TriggerOutcome;
    use crate::sensors::{FeedHandle, FeedSensor};
    use crate::time::ManualClock;
    use crate::traits::{share_sensor, Reading};

    fn loader() -> (ConfigLoader, FeedHandle, FeedHandle, Arc<RecordingSink>, Arc<ManualClock>) {
        let (wind, wind_feed) = FeedSensor::new("anemometer");
        let (sky, sky_feed) = FeedSensor::new("cloud_sensor");
        let mut sensors = SensorRegistry::new();
        sensors.register("anemometer", share_sensor(wind)).unwrap();
        sensors.register("cloud_sensor", share_sensor(sky)).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::new(0));
        let loader = ConfigLoader::new(sensors)
            .with_sink(sink.clone())
            .with_clock(clock.clone());
        (loader, wind_feed, sky_feed, sink, clock)
    }

    const SITE: &str = "
        # weather station
        DEFINE CLEAR 1
        DEFINE CLOUDY 2

        FILTER wind READS anemometer AVER 1
        FILTER sky READS cloud_sensor MODAL 1 0 CLEAR CLOUDY
        MUX gust COMBINE wind 2.0

        RULE high_wind THRESH WHEN wind GT 15
        RULE cloudy SELECT FROM sky IS CLOUDY
        RULESET close_dome DISJ high_wind cloudy

        MONITOR weather 10000
        weather ASSOC close_dome FIRES CLOSE_DOME
    ";

    #[test]
    fn loads_complete_graph() {
        let (loader, wind, sky, sink, clock) = loader();
        let config = loader.load_str(SITE).unwrap();

        assert_eq!(config.filters.len(), 3);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.symbols.get("CLOUDY"), Some(2));

        wind.publish(Reading::continuous(1, 5.0));
        sky.publish(Reading::discrete(1, 2));
        clock.set(1);

        let monitor = config.monitor("weather").unwrap();
        let outcome = lock(monitor).trigger();
        assert_eq!(outcome, TriggerOutcome::Evaluated { fired: 1 });
        assert_eq!(sink.event_ids(), vec!["CLOSE_DOME"]);
    }

    #[test]
    fn unknown_filter_names_line() {
        let (loader, ..) = loader();
        let err = loader
            .load_str("MONITOR m 1000\nRULE r THRESH WHEN missing GT 1\n")
            .err();
        assert_eq!(
            err,
            Some(ConfigError::UnknownFilter {
                line: 2,
                name: "missing".into()
            })
        );
    }

    #[test]
    fn unknown_test_value_is_fatal() {
        let (loader, ..) = loader();
        let text = "FILTER sky READS cloud_sensor MODAL 1 0 1 2\nRULE r SELECT FROM sky EQ FOGGY\n";
        assert!(matches!(
            loader.load_str(text),
            Err(ConfigError::UnknownTestValue { line: 2, .. })
        ));
    }

    #[test]
    fn fuzzy_ruleset_rejected() {
        let (loader, ..) = loader();
        let text = "FILTER wind READS anemometer AVER 1\n\
                    RULE r THRESH WHEN wind GT 1\n\
                    RULESET fz FUZZY r\n";
        assert!(matches!(
            loader.load_str(text),
            Err(ConfigError::Unsupported { line: 3, .. })
        ));
    }

    #[test]
    fn unknown_directive_skipped() {
        let (loader, ..) = loader();
        let config = loader.load_str("LOGFORMAT json\nMONITOR m 1000\n").unwrap();
        assert_eq!(config.monitors.len(), 1);
    }

    #[test]
    fn delinv_inversion_side_checked() {
        let (loader, ..) = loader();
        let text = "FILTER wind READS anemometer AVER 1\n\
                    RULE r DELINV WHEN wind GT 15 INVERT 20 DELTA 1000\n";
        assert!(matches!(
            loader.load_str(text),
            Err(ConfigError::Invalid { line: 2, .. })
        ));
    }

    #[test]
    fn anyof_accepts_lists_and_delta() {
        let (loader, ..) = loader();
        let text = "FILTER sky READS cloud_sensor MODAL 1 0 1 2 3\n\
                    RULE r ANYOF FROM sky IN 1,2 3 DELTA 500\n";
        let config = loader.load_str(text).unwrap();
        assert!(config.rule("r").is_some());
    }

    #[test]
    fn duplicate_and_unknown_references() {
        let (loader, ..) = loader();
        assert!(matches!(
            loader.load_str("MONITOR m 1\nMONITOR m 2\n"),
            Err(ConfigError::Duplicate { line: 2, kind: "monitor", .. })
        ));
        assert!(matches!(
            loader.load_str("FILTER f READS barometer AVER 1\n"),
            Err(ConfigError::UnknownSensor { line: 1, .. })
        ));
        assert!(matches!(
            loader.load_str("m ASSOC r FIRES E\n"),
            Err(ConfigError::UnknownMonitor { line: 1, .. })
        ));
        assert!(matches!(
            loader.load_str("MONITOR m 1\nm ASSOC r FIRES E\n"),
            Err(ConfigError::UnknownRuleset { line: 2, .. })
        ));
    }

    #[test]
    fn malformed_lines_name_construct() {
        let (loader, ..) = loader();
        let err = loader.load_str("MONITOR weather\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: malformed MONITOR: missing period");

        let err = loader.load_str("MONITOR weather soon\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: invalid period 'soon'");
    }

    #[test]
    fn missing_file_is_io_error() {
        let (loader, ..) = loader();
        assert!(matches!(
            loader.load_file("/nonexistent/skywatch.conf"),
            Err(ConfigError::Io { .. })
        ));
    }
}
