//! Registries resolving names used in configuration files
//!
//! - [`SensorRegistry`]: sensor names → instances, supplied by the caller
//!   because sensors wrap hardware and feeds the engine knows nothing about.
//! - [`FilterRegistry`]: filter type keywords (`AVER`, `MODAL`, ...) →
//!   constructor functions. The built-in keywords are pre-registered; sites
//!   add their own strategies with [`FilterRegistry::register`].

use std::collections::HashMap;
use std::fmt;

use super::parser::{finite, number, Cursor, Symbols};
use super::tables::NamedTable;
use crate::errors::{ConfigError, ConfigResult};
use crate::filters::{Debounce, SensorFilter, StreakThreshold, ValueTable};
use crate::traits::{share_filter, SharedFilter, SharedSensor};

/// Sensors available to `FILTER ... READS <sensor>` lines
#[derive(Clone)]
pub struct SensorRegistry {
    sensors: NamedTable<SharedSensor>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self {
            sensors: NamedTable::new("sensor"),
        }
    }

    /// Register a sensor under `name`
    pub fn register(&mut self, name: impl Into<String>, sensor: SharedSensor) -> ConfigResult<()> {
        self.sensors.insert(name, sensor)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_sensor(mut self, name: impl Into<String>, sensor: SharedSensor) -> ConfigResult<Self> {
        self.register(name, sensor)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&SharedSensor> {
        self.sensors.get(name)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a filter constructor receives from one `FILTER` line
pub struct FilterSpec<'a> {
    /// Filter name
    pub name: &'a str,
    /// Resolved sensor
    pub sensor: SharedSensor,
    /// Tokens after the type keyword
    pub params: &'a [&'a str],
    /// Symbols defined so far
    pub symbols: &'a Symbols,
}

impl<'a> FilterSpec<'a> {
    /// Cursor over the parameters
    pub fn cursor(&self, construct: &'static str) -> Cursor<'a> {
        Cursor::new(construct, self.params)
    }
}

/// Constructor registered for a filter type keyword
pub type FilterConstructor =
    Box<dyn Fn(FilterSpec<'_>) -> ConfigResult<SharedFilter> + Send + Sync>;

/// Filter type keyword → constructor
pub struct FilterRegistry {
    constructors: HashMap<String, FilterConstructor>,
}

impl FilterRegistry {
    /// Registry without any keywords
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with the built-in keywords
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("AVER", build_average);
        registry.register("WAV", build_weighted);
        registry.register("EXPAV", build_exponential);
        registry.register("MODAL", build_modal);
        registry.register("STEADY", build_steady);
        registry.register("PERIOD", build_period);
        registry.register("TIME", build_temporal);
        registry.register("WMS", build_wms);
        registry.register("WMSBAD", build_wms_bad);
        registry.register("SYS", build_sys);
        registry
    }

    /// Add or replace the constructor for `keyword` (matched case-insensitively)
    pub fn register<F>(&mut self, keyword: &str, constructor: F)
    where
        F: Fn(FilterSpec<'_>) -> ConfigResult<SharedFilter> + Send + Sync + 'static,
    {
        self.constructors
            .insert(keyword.to_ascii_uppercase(), Box::new(constructor));
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.constructors.contains_key(&keyword.to_ascii_uppercase())
    }

    /// Build a filter for `keyword`
    pub fn build(&self, keyword: &str, spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
        let constructor = self
            .constructors
            .get(&keyword.to_ascii_uppercase())
            .ok_or_else(|| ConfigError::UnknownFilterType {
                line: 0,
                keyword: keyword.to_string(),
            })?;
        constructor(spec)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keywords: Vec<_> = self.constructors.keys().collect();
        keywords.sort();
        f.debug_struct("FilterRegistry")
            .field("keywords", &keywords)
            .finish()
    }
}

// ===== BUILT-IN CONSTRUCTORS =====

fn build_average(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("AVER filter");
    let samples = params.number("sample count")?;
    params.finish()?;
    Ok(share_filter(SensorFilter::averaging(spec.name, spec.sensor, samples)?))
}

fn build_weighted(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("WAV filter");
    let samples = params.number("sample count")?;
    let weights = params
        .rest()
        .iter()
        .map(|token| finite("weight", token))
        .collect::<ConfigResult<Vec<f64>>>()?;
    Ok(share_filter(SensorFilter::weighted_averaging(
        spec.name,
        spec.sensor,
        samples,
        &weights,
    )?))
}

fn build_exponential(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("EXPAV filter");
    let samples = params.number("sample count")?;
    let time_constant = params.finite("time constant")?;
    params.finish()?;
    Ok(share_filter(SensorFilter::exponential_averaging(
        spec.name,
        spec.sensor,
        samples,
        time_constant,
    )?))
}

/// `<size> <default> <v1> [<v2> ...]` shared by the discrete filters
fn discrete_params<T: std::str::FromStr>(
    spec: &FilterSpec<'_>,
    construct: &'static str,
    size_field: &'static str,
) -> ConfigResult<(T, i32, ValueTable)> {
    let mut params = spec.cursor(construct);
    let size = params.number(size_field)?;
    let default = spec.symbols.resolve(params.next("default value")?)?;
    let values = spec.symbols.resolve_all(params.rest().iter().copied())?;
    Ok((size, default, ValueTable::new(&values)?))
}

fn build_modal(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let (samples, default, table) = discrete_params(&spec, "MODAL filter", "sample count")?;
    Ok(share_filter(SensorFilter::modal(spec.name, spec.sensor, samples, table, default)?))
}

fn build_steady(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let (samples, default, table) = discrete_params(&spec, "STEADY filter", "sample count")?;
    Ok(share_filter(SensorFilter::steady_state(
        spec.name,
        spec.sensor,
        samples,
        table,
        default,
    )?))
}

fn build_period(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let (period_ms, default, table) = discrete_params(&spec, "PERIOD filter", "period")?;
    Ok(share_filter(SensorFilter::timed_steady_state(
        spec.name,
        spec.sensor,
        period_ms,
        table,
        default,
    )?))
}

fn build_temporal(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    spec.cursor("TIME filter").finish()?;
    Ok(share_filter(SensorFilter::temporal(spec.name, spec.sensor)?))
}

fn streak(cursor: &mut Cursor<'_>, threshold: &str) -> ConfigResult<StreakThreshold> {
    let unit = cursor.expect_one_of(&["COUNT", "TIME"])?;
    if unit == "COUNT" {
        Ok(StreakThreshold::Count(number("streak count", threshold)?))
    } else {
        Ok(StreakThreshold::Time(number("streak time", threshold)?))
    }
}

fn build_wms(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("WMS filter");
    let threshold = params.next("good streak")?;
    let to_good = streak(&mut params, threshold)?;
    params.finish()?;
    debounce_filter(spec, Debounce::good_streak(to_good))
}

fn build_wms_bad(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("WMSBAD filter");
    let threshold = params.next("bad streak")?;
    let to_bad = streak(&mut params, threshold)?;
    params.finish()?;
    debounce_filter(spec, Debounce::bad_streak(to_bad))
}

fn build_sys(spec: FilterSpec<'_>) -> ConfigResult<SharedFilter> {
    let mut params = spec.cursor("SYS filter");
    let good = params.next("good streak")?;
    let bad = params.next("bad streak")?;
    let unit = params.expect_one_of(&["COUNT", "TIME"])?;
    params.finish()?;

    let (to_good, to_bad) = if unit == "COUNT" {
        (
            StreakThreshold::Count(number("good streak", good)?),
            StreakThreshold::Count(number("bad streak", bad)?),
        )
    } else {
        (
            StreakThreshold::Time(number("good streak", good)?),
            StreakThreshold::Time(number("bad streak", bad)?),
        )
    };
    debounce_filter(spec, Debounce::both(to_good, to_bad))
}

fn debounce_filter(spec: FilterSpec<'_>, debounce: Debounce) -> ConfigResult<SharedFilter> {
    Ok(share_filter(SensorFilter::debounce(spec.name, spec.sensor, debounce)?))
}
