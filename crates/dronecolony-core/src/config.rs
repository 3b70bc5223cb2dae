//! Simulation configuration.
//!
//! A run is fully described by a [`SimConfig`]: map size, arena settings,
//! the starting colonies and the neutral objects scattered over the map.
//! Together with the seed this makes every run reproducible.
//!
//! ```
//! use dronecolony_core::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "seed": 7, "infinite_arena": true }"#).unwrap();
//! assert!(config.validate().is_empty());
//! assert_eq!(config.last_level, 20);
//! ```

use dronecolony_logic::stats::{core_stats, CoreKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SimError;

/// Smallest map edge that still fits a landed colony and a wave spawn lane.
pub const MIN_MAP_SIZE: f64 = 640.0;
pub const MAX_COLONIES: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the single world RNG.
    pub seed: u64,
    /// Endless waves; there is no victory state.
    pub infinite_arena: bool,
    /// Scales every wave budget step by `0.75 + progression * 0.25`.
    pub arena_progression: f64,
    /// Final wave in finite mode.
    pub last_level: u32,
    pub map_width: f64,
    pub map_height: f64,
    pub colony_count: usize,
    pub core: CoreKind,
    pub starting_resources: f64,
    pub starting_workers: usize,
    /// Multiplies the capacity of generated essence sources.
    pub resource_multiplier: f64,
    pub resource_sources: usize,
    pub teleporter_pairs: usize,
    pub neutral_buildings: usize,
    /// Unfinished turret sites placed near the colonies.
    pub constructions: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            infinite_arena: false,
            arena_progression: 1.0,
            last_level: 20,
            map_width: 1600.0,
            map_height: 1600.0,
            colony_count: 1,
            core: CoreKind::Den,
            starting_resources: 40.0,
            starting_workers: 5,
            resource_multiplier: 1.0,
            resource_sources: 14,
            teleporter_pairs: 0,
            neutral_buildings: 1,
            constructions: 1,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("map {width}x{height} is smaller than the 640 minimum")]
    MapTooSmall { width: f64, height: f64 },
    #[error("colony count {0} is outside 1..=4")]
    InvalidColonyCount(usize),
    #[error("arena progression {0} is negative")]
    NegativeProgression(f64),
    #[error("last level {0} must be at least 1")]
    InvalidLastLevel(u32),
    #[error("resource multiplier {0} must be positive")]
    InvalidResourceMultiplier(f64),
    #[error("starting resources {0} is negative")]
    NegativeStartingResources(f64),
    #[error("{workers} starting workers exceed the drone limit of {limit}")]
    TooManyStartingWorkers { workers: usize, limit: usize },
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: SimConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Validate the config, returning all errors found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.map_width < MIN_MAP_SIZE || self.map_height < MIN_MAP_SIZE {
            errors.push(ConfigError::MapTooSmall {
                width: self.map_width,
                height: self.map_height,
            });
        }
        if self.colony_count == 0 || self.colony_count > MAX_COLONIES {
            errors.push(ConfigError::InvalidColonyCount(self.colony_count));
        }
        if self.arena_progression < 0.0 {
            errors.push(ConfigError::NegativeProgression(self.arena_progression));
        }
        if self.last_level == 0 {
            errors.push(ConfigError::InvalidLastLevel(self.last_level));
        }
        if self.resource_multiplier <= 0.0 {
            errors.push(ConfigError::InvalidResourceMultiplier(
                self.resource_multiplier,
            ));
        }
        if self.starting_resources < 0.0 {
            errors.push(ConfigError::NegativeStartingResources(
                self.starting_resources,
            ));
        }
        let limit = core_stats(self.core).drone_limit;
        if self.starting_workers > limit {
            errors.push(ConfigError::TooManyStartingWorkers {
                workers: self.starting_workers,
                limit,
            });
        }

        errors
    }

    /// Parse and validate in one step.
    pub fn load(json: &str) -> Result<Self, SimError> {
        let config = Self::from_json(json)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(SimError::InvalidConfig(errors))
        }
    }

    /// Wave budget multiplier derived from the arena progression.
    pub fn budget_step_multiplier(&self) -> f64 {
        0.75 + self.arena_progression * 0.25
    }
}
