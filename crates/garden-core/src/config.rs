//! Engine configuration.
//!
//! Every field has a default matching the design constants, so an empty JSON
//! object is a valid configuration. Values are checked by
//! [`GardenConfig::validate`] before a session starts.

use std::path::Path;

use garden_logic::constants::{
    AUTO_WATER_PERIOD_MS, OFFLINE_MIN_ELAPSED_MS, PLOT_COUNT, STARTING_COINS, TICK_PERIOD_MS,
    WEED_CHANCE_PER_TICK,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GardenConfig {
    /// Number of plots in a new or loaded garden.
    pub plot_count: usize,
    /// Coins a brand new garden starts with.
    pub starting_coins: u64,
    /// Per-tick weed onset probability.
    pub weed_chance: f64,
    pub tick_period_ms: u64,
    pub auto_water_period_ms: u64,
    /// Offline gaps shorter than this are not reconciled.
    pub offline_min_elapsed_ms: u64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            plot_count: PLOT_COUNT,
            starting_coins: STARTING_COINS,
            weed_chance: WEED_CHANCE_PER_TICK,
            tick_period_ms: TICK_PERIOD_MS,
            auto_water_period_ms: AUTO_WATER_PERIOD_MS,
            offline_min_elapsed_ms: OFFLINE_MIN_ELAPSED_MS,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl GardenConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plot_count == 0 {
            return Err(ConfigError::Invalid("plotCount must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.weed_chance) {
            return Err(ConfigError::Invalid(format!(
                "weedChance {} is not a probability",
                self.weed_chance
            )));
        }
        if self.tick_period_ms == 0 || self.auto_water_period_ms == 0 {
            return Err(ConfigError::Invalid("timer periods must be non-zero".into()));
        }
        Ok(())
    }
}
