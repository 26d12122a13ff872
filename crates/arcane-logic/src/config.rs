//! Generation configuration: depth limits and node type weights.
//!
//! Defaults reproduce the shipped game balance: depth between 2 and 10,
//! a 50% chance of a second path per node, and a 30% Battle / 10%
//! SafeHaven / 60% Basic split for interior nodes. The server stores one
//! of these as a singleton row; the harness loads one from JSON.

use serde::{Deserialize, Serialize};

/// Smallest depth the generator can build: a start, one interior level, an end.
pub const MIN_GENERATABLE_LEVEL: u32 = 2;

/// Deepest map any policy may allow callers to request.
pub const MAX_POLICY_LEVEL: u32 = 10;

/// Probability thresholds for interior node roles.
///
/// A draw `r` in `[0, 1)` yields Battle below `battle`, SafeHaven below
/// `battle + safe_haven`, and Basic otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeWeights {
    pub battle: f64,
    pub safe_haven: f64,
}

impl Default for NodeTypeWeights {
    fn default() -> Self {
        Self {
            battle: 0.30,
            safe_haven: 0.10,
        }
    }
}

/// Tunables for generating and serving exploration maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Lowest `max_level` a caller may request.
    pub min_level: u32,
    /// Highest `max_level` a caller may request.
    pub max_level: u32,
    /// Chance of attempting a second outgoing path per node.
    pub secondary_path_chance: f64,
    pub node_weights: NodeTypeWeights,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_level: 2,
            max_level: 10,
            secondary_path_chance: 0.5,
            node_weights: NodeTypeWeights::default(),
        }
    }
}

impl GenerationConfig {
    /// Whether a requested depth falls inside the access-layer policy range.
    ///
    /// The configured range is clamped to `[2, 10]`, so an unvalidated config
    /// can never open up deeper generation.
    pub fn allows_level(&self, max_level: u32) -> bool {
        let (min, max) = self.level_bounds();
        (min..=max).contains(&max_level)
    }

    /// Effective `(min, max)` depth range after clamping.
    pub fn level_bounds(&self) -> (u32, u32) {
        (
            self.min_level.max(MIN_GENERATABLE_LEVEL),
            self.max_level.min(MAX_POLICY_LEVEL),
        )
    }

    /// Validate the configuration, returning all errors found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.min_level < MIN_GENERATABLE_LEVEL {
            errors.push(ConfigError::MinLevelTooLow(self.min_level));
        }
        if self.max_level > MAX_POLICY_LEVEL {
            errors.push(ConfigError::MaxLevelTooHigh(self.max_level));
        }
        if self.max_level < self.min_level {
            errors.push(ConfigError::LevelRangeInverted {
                min: self.min_level,
                max: self.max_level,
            });
        }
        if !is_probability(self.secondary_path_chance) {
            errors.push(ConfigError::ChanceOutOfRange("secondary_path_chance"));
        }
        if !is_probability(self.node_weights.battle) {
            errors.push(ConfigError::ChanceOutOfRange("node_weights.battle"));
        }
        if !is_probability(self.node_weights.safe_haven) {
            errors.push(ConfigError::ChanceOutOfRange("node_weights.safe_haven"));
        }
        if self.node_weights.battle + self.node_weights.safe_haven > 1.0 {
            errors.push(ConfigError::WeightsExceedOne);
        }

        errors
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("min_level {0} is below the generator minimum of 2")]
    MinLevelTooLow(u32),
    #[error("max_level {0} is above the policy ceiling of 10")]
    MaxLevelTooHigh(u32),
    #[error("level range is inverted: min {min} > max {max}")]
    LevelRangeInverted { min: u32, max: u32 },
    #[error("{0} must be within [0, 1]")]
    ChanceOutOfRange(&'static str),
    #[error("battle and safe haven weights sum past 1.0")]
    WeightsExceedOne,
}
