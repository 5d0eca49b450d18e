//! Static configuration for an AntLab episode controller.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MAX_RULES, MIN_RULES};

/// Side length of the toroidal grid used by the discovery environment.
pub const DEFAULT_GRID_SIZE: u32 = 160;
/// Engine steps executed after every external action.
pub const DEFAULT_STEPS_PER_ACTION: u32 = 100;
/// Engine steps an episode may consume before it is abandoned.
pub const DEFAULT_STEP_BUDGET: u64 = 50_000;
/// Number of trailing positions inspected by the stasis detector.
pub const DEFAULT_STASIS_WINDOW: usize = 50;
/// Number of trailing moves inspected by the periodic detector.
pub const DEFAULT_PERIODIC_WINDOW: usize = 312;
/// Longest move cycle the periodic detector will consider.
pub const DEFAULT_MAX_PERIOD: usize = 128;

/// Errors that can occur when validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Criterion used to decide that the ant has settled into a highway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HighwayCriterion {
    /// Every one of the last `window` recorded positions is the same cell.
    Stasis { window: usize },
    /// The last `window` moves repeat with a period of at most `max_period`
    /// and one period carries the ant somewhere new.
    Periodic { window: usize, max_period: usize },
}

impl Default for HighwayCriterion {
    fn default() -> Self {
        Self::Stasis {
            window: DEFAULT_STASIS_WINDOW,
        }
    }
}

impl HighwayCriterion {
    /// Periodic criterion with the default window and period bound.
    #[must_use]
    pub const fn periodic() -> Self {
        Self::Periodic {
            window: DEFAULT_PERIODIC_WINDOW,
            max_period: DEFAULT_MAX_PERIOD,
        }
    }

    /// Number of trailing visits the ant must retain for this criterion.
    #[must_use]
    pub const fn history_len(&self) -> usize {
        match *self {
            Self::Stasis { window } => window,
            Self::Periodic { window, .. } => window,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Stasis { window } => {
                if window == 0 {
                    return Err(ConfigError::InvalidConfig(
                        "stasis window must be non-zero",
                    ));
                }
            }
            Self::Periodic { window, max_period } => {
                if window == 0 || max_period == 0 {
                    return Err(ConfigError::InvalidConfig(
                        "periodic window and max_period must be non-zero",
                    ));
                }
                if max_period.saturating_mul(2) > window {
                    return Err(ConfigError::InvalidConfig(
                        "periodic window must cover at least two full periods",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Static configuration for an AntLab environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AntLabConfig {
    /// Side length of the square toroidal grid.
    pub grid_size: u32,
    /// Upper bound on rule-table size (between 2 and 10 inclusive).
    pub max_rules: usize,
    /// Engine steps executed after every action.
    pub steps_per_action: u32,
    /// Engine steps after which an episode without a highway is abandoned.
    pub step_budget: u64,
    /// Reward granted when a highway is detected.
    pub highway_reward: f32,
    /// Penalty subtracted when the budget runs out without a highway.
    pub budget_penalty: f32,
    /// Detection criterion applied after every action.
    pub highway: HighwayCriterion,
    /// Optional RNG seed for reproducible rule mutation.
    pub rng_seed: Option<u64>,
}

impl Default for AntLabConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            max_rules: MAX_RULES,
            steps_per_action: DEFAULT_STEPS_PER_ACTION,
            step_budget: DEFAULT_STEP_BUDGET,
            highway_reward: 50.0,
            budget_penalty: 20.0,
            highway: HighwayCriterion::default(),
            rng_seed: None,
        }
    }
}

impl AntLabConfig {
    /// Checks every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::InvalidConfig("grid_size must be non-zero"));
        }
        if self.grid_size > u32::from(u16::MAX) {
            return Err(ConfigError::InvalidConfig(
                "grid_size must not exceed 65535",
            ));
        }
        if !(MIN_RULES..=MAX_RULES).contains(&self.max_rules) {
            return Err(ConfigError::InvalidConfig(
                "max_rules must lie between 2 and 10",
            ));
        }
        if self.steps_per_action == 0 {
            return Err(ConfigError::InvalidConfig(
                "steps_per_action must be non-zero",
            ));
        }
        if self.step_budget == 0 {
            return Err(ConfigError::InvalidConfig("step_budget must be non-zero"));
        }
        if !self.highway_reward.is_finite()
            || !self.budget_penalty.is_finite()
            || self.highway_reward < 0.0
            || self.budget_penalty < 0.0
        {
            return Err(ConfigError::InvalidConfig(
                "highway_reward and budget_penalty must be finite and non-negative",
            ));
        }
        self.highway.validate()
    }

    /// Returns the configured RNG, drawing a seed from entropy if absent.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
