//! Weighted combination of several filters
//!
//! A multiplexer is itself a [`Filter`], so rules can test a blended value
//! (e.g. two anemometers on opposite sides of the enclosure) exactly as they
//! would test a single feed.

use crate::constants::buffers::MAX_MUX_INPUTS;
use crate::errors::{ConfigError, ConfigResult};
use crate::traits::{lock, Filter, SharedFilter};

/// `Σ weight_i × input_i.readout()`
pub struct Multiplexer {
    name: String,
    inputs: heapless::Vec<(SharedFilter, f64), MAX_MUX_INPUTS>,
}

impl Multiplexer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: heapless::Vec::new(),
        }
    }

    /// Add a weighted input
    pub fn combine(&mut self, filter: SharedFilter, weight: f64) -> ConfigResult<()> {
        if !weight.is_finite() {
            return Err(ConfigError::invalid("multiplexer", "weight must be finite"));
        }
        self.inputs.push((filter, weight)).map_err(|_| {
            ConfigError::invalid(
                "multiplexer",
                format!("more than {} inputs", MAX_MUX_INPUTS),
            )
        })
    }

    /// Builder form of [`combine`](Self::combine)
    pub fn with_input(mut self, filter: SharedFilter, weight: f64) -> ConfigResult<Self> {
        self.combine(filter, weight)?;
        Ok(self)
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether no inputs were added
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl Filter for Multiplexer {
    fn readout(&mut self) -> f64 {
        // Every input is read once per call so each keeps sampling its feed
        let sum: f64 = self
            .inputs
            .iter()
            .map(|(filter, weight)| weight * lock(filter).readout())
            .sum();
        if sum.is_finite() {
            sum
        } else {
            log::debug!("Multiplexer '{}': non-finite sum, reading 0", self.name);
            0.0
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
