//! Episode state machine driven by one external action per call.

use std::fmt;

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    AntLabConfig, AntState, ConfigError, DiscoveryLog, Grid, Highway, HighwayDetector,
    HighwayDiscovery, NullDiscoveryLog, Palette, RuleTable, SimulationEngine,
};

/// Rule-table mutation requested by the controlling agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    /// Wire value `0`.
    AddRule,
    /// Wire value `1`.
    RemoveRule,
}

impl Action {
    pub const ALL: [Self; 2] = [Self::AddRule, Self::RemoveRule];

    /// Discrete wire value of the action.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::AddRule => 0,
            Self::RemoveRule => 1,
        }
    }
}

/// Raised when a discrete action value has no meaning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action {0}; expected 0 (add rule) or 1 (remove rule)")]
    Unknown(usize),
}

impl TryFrom<usize> for Action {
    type Error = ActionError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AddRule),
            1 => Ok(Self::RemoveRule),
            other => Err(ActionError::Unknown(other)),
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = ActionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(usize::from(value))
    }
}

/// Where an episode stands after an action has been processed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EpisodeOutcome {
    #[default]
    Running,
    /// A highway was detected; the environment has already been reset.
    HighwayFound,
    /// The step budget ran out without a highway; the environment has already been reset.
    BudgetExceeded,
}

impl EpisodeOutcome {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Grid flattened row-major with every cell clipped to `{0, 1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    size: u32,
    cells: Vec<u8>,
}

impl Observation {
    fn from_grid(grid: &Grid) -> Self {
        Self {
            size: grid.size(),
            cells: grid.clipped(),
        }
    }

    /// Side length of the observed grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Number of cells observed as `1`.
    #[must_use]
    pub fn active_cells(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell != 0).count()
    }
}

/// Everything returned to the agent for one action.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    /// Step budget reached during this call, judged before any reset.
    pub terminated: bool,
    /// Always `false`; episodes are never cut short externally.
    pub truncated: bool,
    pub outcome: EpisodeOutcome,
}

/// Running totals across every episode a controller has played.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub actions: u64,
    pub rules_added: u64,
    pub rules_removed: u64,
    pub highways: u64,
    pub budget_exhaustions: u64,
    pub total_reward: f64,
}

/// Owns the rule table and simulation, applies actions, and resets finished episodes.
pub struct EpisodeController {
    config: AntLabConfig,
    rules: RuleTable,
    engine: SimulationEngine,
    detector: HighwayDetector,
    rng: SmallRng,
    highway_found: bool,
    episode: u64,
    stats: ControllerStats,
    log: Box<dyn DiscoveryLog>,
}

impl fmt::Debug for EpisodeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpisodeController")
            .field("config", &self.config)
            .field("rules", &self.rules.to_string())
            .field("episode", &self.episode)
            .field("step_count", &self.engine.ant().step_count())
            .field("stats", &self.stats)
            .finish()
    }
}

impl EpisodeController {
    /// Controller that discards discoveries.
    pub fn new(config: AntLabConfig) -> Result<Self, ConfigError> {
        Self::with_discovery_log(config, Box::new(NullDiscoveryLog))
    }

    /// Controller that reports every discovered highway to `log`.
    pub fn with_discovery_log(
        config: AntLabConfig,
        log: Box<dyn DiscoveryLog>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = SimulationEngine::new(config.grid_size, config.highway.history_len())?;
        Ok(Self {
            rules: RuleTable::with_capacity(config.max_rules),
            detector: HighwayDetector::new(config.highway),
            rng: config.seeded_rng(),
            engine,
            config,
            highway_found: false,
            episode: 0,
            stats: ControllerStats::default(),
            log,
        })
    }

    /// Mutates the rule table, runs one burst of engine steps, and scores the result.
    ///
    /// A detected highway or an exhausted budget resets the environment before
    /// returning, so the observation always describes the episode that will
    /// receive the next action.
    pub fn apply_action(&mut self, action: Action) -> StepResult {
        let changed = match action {
            Action::AddRule => self.rules.add_rule(&mut self.rng),
            Action::RemoveRule => self.rules.remove_rule(self.engine.grid_mut()),
        };
        if changed {
            match action {
                Action::AddRule => self.stats.rules_added += 1,
                Action::RemoveRule => self.stats.rules_removed += 1,
            }
        }

        let burst = self.config.steps_per_action;
        let moved = self.engine.advance(&self.rules, burst);
        self.engine.ant_mut().charge_steps(u64::from(burst));

        let steps = self.engine.ant().step_count();
        let terminated = steps >= self.config.step_budget;
        let mut reward = 0.0_f32;
        let signal = self.detector.inspect(self.engine.ant().trail());
        let outcome = if let Some(signal) = signal {
            reward += self.config.highway_reward;
            self.highway_found = true;
            self.record_discovery(signal.highway());
            EpisodeOutcome::HighwayFound
        } else if terminated && !self.highway_found {
            reward -= self.config.budget_penalty;
            EpisodeOutcome::BudgetExceeded
        } else {
            EpisodeOutcome::Running
        };

        debug!(
            ?action,
            changed,
            moved,
            steps,
            rules = %self.rules,
            reward,
            ?outcome,
            "applied action",
        );

        if outcome.is_terminal() {
            self.conclude(outcome, steps);
        }

        self.stats.actions += 1;
        self.stats.total_reward += f64::from(reward);
        StepResult {
            observation: self.observation(),
            reward,
            terminated,
            truncated: false,
            outcome,
        }
    }

    /// Starts a new episode: blank grid, centred ant, seed rule table.
    pub fn reset(&mut self) -> Observation {
        self.engine.reset();
        self.rules = RuleTable::with_capacity(self.config.max_rules);
        self.highway_found = false;
        self.episode += 1;
        self.observation()
    }

    /// Reseeds rule mutation before starting a new episode.
    pub fn reset_with_seed(&mut self, seed: u64) -> Observation {
        self.rng = SmallRng::seed_from_u64(seed);
        self.reset()
    }

    fn conclude(&mut self, outcome: EpisodeOutcome, steps: u64) {
        match outcome {
            EpisodeOutcome::HighwayFound => self.stats.highways += 1,
            EpisodeOutcome::BudgetExceeded => self.stats.budget_exhaustions += 1,
            EpisodeOutcome::Running => return,
        }
        info!(
            episode = self.episode,
            ?outcome,
            steps,
            rules = %self.rules,
            "episode finished; resetting",
        );
        self.reset();
    }

    fn record_discovery(&mut self, highway: Option<Highway>) {
        let discovery = HighwayDiscovery {
            episode: self.episode,
            steps: self.engine.ant().step_count(),
            rules: self.rules.snapshot(),
            highway,
        };
        info!(
            episode = discovery.episode,
            steps = discovery.steps,
            rules = %self.rules,
            period = highway.map(|h| h.period),
            "highway discovered",
        );
        self.log.record(&discovery);
    }

    /// Current grid as seen by the agent.
    #[must_use]
    pub fn observation(&self) -> Observation {
        Observation::from_grid(self.engine.grid())
    }

    #[must_use]
    pub const fn config(&self) -> &AntLabConfig {
        &self.config
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        self.engine.grid()
    }

    #[must_use]
    pub const fn ant(&self) -> &AntState {
        self.engine.ant()
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleTable {
        &self.rules
    }

    #[must_use]
    pub const fn palette(&self) -> &Palette {
        self.rules.palette()
    }

    /// Whether the current episode has already produced a highway.
    #[must_use]
    pub const fn highway_found(&self) -> bool {
        self.highway_found
    }

    /// Number of resets since construction.
    #[must_use]
    pub const fn episode(&self) -> u64 {
        self.episode
    }

    #[must_use]
    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn small_config() -> AntLabConfig {
        AntLabConfig {
            grid_size: 32,
            steps_per_action: 10,
            step_budget: 100,
            rng_seed: Some(7),
            ..AntLabConfig::default()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<HighwayDiscovery>>>);

    impl DiscoveryLog for Recorder {
        fn record(&mut self, discovery: &HighwayDiscovery) {
            self.0.lock().expect("recorder lock").push(discovery.clone());
        }
    }

    #[test]
    fn action_wire_values() {
        assert_eq!(Action::try_from(0_usize), Ok(Action::AddRule));
        assert_eq!(Action::try_from(1_u8), Ok(Action::RemoveRule));
        assert_eq!(Action::try_from(2_usize), Err(ActionError::Unknown(2)));
        for action in Action::ALL {
            assert_eq!(Action::try_from(action.index()), Ok(action));
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AntLabConfig {
            max_rules: 1,
            ..AntLabConfig::default()
        };
        assert!(EpisodeController::new(config).is_err());
    }

    #[test]
    fn actions_mutate_rules_and_charge_steps() {
        let mut controller = EpisodeController::new(small_config()).expect("controller");
        let result = controller.apply_action(Action::AddRule);
        assert_eq!(controller.rules().len(), 3);
        assert_eq!(controller.ant().step_count(), 10);
        assert_eq!(result.reward, 0.0);
        assert!(!result.terminated);
        assert!(!result.truncated);
        assert_eq!(result.outcome, EpisodeOutcome::Running);
        assert_eq!(result.observation.as_slice().len(), 32 * 32);

        controller.apply_action(Action::RemoveRule);
        assert_eq!(controller.rules().len(), 2);
        assert_eq!(controller.ant().step_count(), 20);
        assert_eq!(controller.stats().rules_added, 1);
        assert_eq!(controller.stats().rules_removed, 1);
    }

    #[test]
    fn observation_is_clipped() {
        let mut controller = EpisodeController::new(small_config()).expect("controller");
        for _ in 0..3 {
            controller.apply_action(Action::AddRule);
        }
        let obs = controller.observation();
        assert!(obs.as_slice().iter().all(|&cell| cell <= 1));
        let nonzero = controller.grid().cells().iter().filter(|&&c| c != 0).count();
        assert_eq!(obs.active_cells(), nonzero);
    }

    #[test]
    fn budget_exhaustion_penalises_and_resets() {
        let mut controller = EpisodeController::new(small_config()).expect("controller");
        for call in 1..10 {
            let result = controller.apply_action(Action::AddRule);
            assert_eq!(result.reward, 0.0, "call {call}");
            assert!(!result.terminated, "call {call}");
        }
        let result = controller.apply_action(Action::AddRule);
        assert!(result.terminated);
        assert!(!result.truncated);
        assert_eq!(result.reward, -20.0);
        assert_eq!(result.outcome, EpisodeOutcome::BudgetExceeded);
        assert_eq!(result.observation.active_cells(), 0);

        assert_eq!(controller.ant().step_count(), 0);
        assert_eq!(controller.rules(), &RuleTable::seed());
        assert_eq!(controller.ant().position(), controller.grid().center());
        assert_eq!(controller.episode(), 1);
        assert_eq!(controller.stats().budget_exhaustions, 1);
        assert_eq!(controller.stats().total_reward, -20.0);
    }

    #[test]
    fn detected_highway_is_logged_rewarded_and_reset() {
        let recorder = Recorder::default();
        // On a 1x1 torus every move wraps back onto the same cell.
        let config = AntLabConfig {
            grid_size: 1,
            ..small_config()
        };
        let mut controller =
            EpisodeController::with_discovery_log(config, Box::new(recorder.clone()))
                .expect("controller");

        let result = controller.apply_action(Action::RemoveRule);
        assert_eq!(result.outcome, EpisodeOutcome::HighwayFound);
        assert_eq!(result.reward, 50.0);
        assert!(!result.terminated);

        let discoveries = recorder.0.lock().expect("recorder lock");
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].episode, 0);
        assert_eq!(discoveries[0].steps, 10);
        assert_eq!(discoveries[0].rules, RuleTable::seed().snapshot());
        assert_eq!(discoveries[0].highway, None);

        assert_eq!(controller.ant().step_count(), 0);
        assert!(!controller.highway_found());
        assert_eq!(controller.episode(), 1);
        assert_eq!(controller.stats().highways, 1);
    }

    #[test]
    fn highway_on_final_burst_is_not_penalised() {
        let config = AntLabConfig {
            grid_size: 1,
            step_budget: 10,
            ..small_config()
        };
        let mut controller = EpisodeController::new(config).expect("controller");
        let result = controller.apply_action(Action::AddRule);
        assert_eq!(result.outcome, EpisodeOutcome::HighwayFound);
        assert!(result.terminated);
        assert_eq!(result.reward, 50.0);
        assert_eq!(controller.stats().budget_exhaustions, 0);
    }

    #[test]
    fn reset_with_seed_reproduces_mutations() {
        let mut a = EpisodeController::new(small_config()).expect("a");
        let mut b = EpisodeController::new(small_config()).expect("b");
        a.reset_with_seed(42);
        b.reset_with_seed(42);
        for _ in 0..5 {
            let ra = a.apply_action(Action::AddRule);
            let rb = b.apply_action(Action::AddRule);
            assert_eq!(ra, rb);
        }
        assert_eq!(a.rules(), b.rules());
        assert_eq!(a.palette(), b.palette());
        assert_eq!(a.grid(), b.grid());
    }
}
