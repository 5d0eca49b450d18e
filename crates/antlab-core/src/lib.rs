//! Core types for the AntLab rule-discovery environment.
//!
//! A Langton's-ant style automaton runs on a toroidal grid under a mutable
//! table of per-colour rules. An [`EpisodeController`] accepts one
//! [`Action`] at a time, grows or shrinks the [`RuleTable`], advances the
//! [`SimulationEngine`] by a fixed burst, and asks the [`HighwayDetector`]
//! whether the ant has settled into a highway.

mod ant;
mod config;
mod controller;
mod discovery;
mod engine;
mod grid;
mod highway;
mod rules;

pub use ant::{AntState, Direction, Trail, Visit};
pub use config::{
    AntLabConfig, ConfigError, DEFAULT_GRID_SIZE, DEFAULT_MAX_PERIOD, DEFAULT_PERIODIC_WINDOW,
    DEFAULT_STASIS_WINDOW, DEFAULT_STEP_BUDGET, DEFAULT_STEPS_PER_ACTION, HighwayCriterion,
};
pub use controller::{
    Action, ActionError, ControllerStats, EpisodeController, EpisodeOutcome, Observation,
    StepResult,
};
pub use discovery::{DiscoveryLog, HighwayDiscovery, NullDiscoveryLog};
pub use engine::{SimulationEngine, StepOutcome, step};
pub use grid::{Grid, Position};
pub use highway::{Highway, HighwayDetector, HighwaySignal, find_period, is_stationary};
pub use rules::{BASE_COLORS, Palette, Rgb, Rule, RuleSnapshot, RuleTable, RuleTableError, Turn};

/// Fewest rules a table may hold.
pub const MIN_RULES: usize = 2;
/// Most rules a table may hold.
pub const MAX_RULES: usize = 10;
