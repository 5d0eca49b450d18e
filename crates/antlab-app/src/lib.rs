//! Runners behind the `antlab` binary: config loading, the discovery search
//! loop, and fixed-rule simulations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use antlab_brain::{Policy, play_step};
use antlab_core::{
    AntLabConfig, ConfigError, ControllerStats, DEFAULT_MAX_PERIOD, DEFAULT_PERIODIC_WINDOW,
    DEFAULT_STASIS_WINDOW, Direction, EpisodeController, Highway, HighwayCriterion,
    HighwayDetector, Position, RuleTable, SimulationEngine, find_period,
};
use antlab_storage::{DEFAULT_LOG_PATH, count_discoveries};
use tracing::{debug, info};

/// Reads an [`AntLabConfig`] from a JSON file, or returns the defaults.
pub fn load_config(path: Option<&Path>) -> Result<AntLabConfig> {
    let Some(path) = path else {
        return Ok(AntLabConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: AntLabConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("config file {} is invalid", path.display()))?;
    Ok(config)
}

/// Stopping rules for [`run_search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub log_path: PathBuf,
    /// Stop once the log holds at least this many discoveries.
    pub target_highways: usize,
    /// Hard cap on actions across the whole search.
    pub max_actions: u64,
    /// Actions between log checks.
    pub batch_actions: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            target_highways: 10,
            max_actions: 1_000_000,
            batch_actions: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub actions: u64,
    pub discoveries: usize,
    pub reached_target: bool,
    pub stats: ControllerStats,
}

/// Drives `controller` with `policy` in batches until the discovery log
/// reaches the target or the action cap is spent.
///
/// `controller` should already be writing to `options.log_path`.
pub fn run_search(
    controller: &mut EpisodeController,
    policy: &mut dyn Policy,
    options: &SearchOptions,
) -> Result<SearchReport> {
    let count = |path: &Path| {
        count_discoveries(path)
            .with_context(|| format!("failed to read discovery log {}", path.display()))
    };

    let batch = options.batch_actions.max(1);
    let mut discoveries = count(&options.log_path)?;
    let mut actions = 0_u64;
    let mut observation = controller.observation();

    info!(
        policy = policy.kind(),
        log = %options.log_path.display(),
        discoveries,
        target = options.target_highways,
        "starting search",
    );

    while discoveries < options.target_highways && actions < options.max_actions {
        let quota = batch.min(options.max_actions - actions);
        for _ in 0..quota {
            observation = play_step(controller, policy, &observation).observation;
        }
        actions += quota;
        discoveries = count(&options.log_path)?;
        info!(
            actions,
            discoveries,
            episode = controller.episode(),
            highways = controller.stats().highways,
            budget_exhaustions = controller.stats().budget_exhaustions,
            "search batch complete",
        );
    }

    let report = SearchReport {
        actions,
        discoveries,
        reached_target: discoveries >= options.target_highways,
        stats: controller.stats().clone(),
    };
    info!(
        actions = report.actions,
        discoveries = report.discoveries,
        reached_target = report.reached_target,
        "search finished",
    );
    Ok(report)
}

/// Final state of a fixed-rule run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub steps: u64,
    pub moved: u64,
    pub position: Position,
    pub direction: Direction,
    pub visited: usize,
    /// Verdict of the stasis check over the default window.
    pub stasis: bool,
    /// Cycle found by the periodic check over the default window.
    pub highway: Option<Highway>,
}

/// Runs `rules` unmodified for `steps` ticks on a fresh grid.
pub fn run_simulation(
    config: &AntLabConfig,
    rules: &RuleTable,
    steps: u64,
) -> Result<(SimulationEngine, SimulationReport), ConfigError> {
    let trail_len = config
        .highway
        .history_len()
        .max(DEFAULT_PERIODIC_WINDOW)
        .max(DEFAULT_STASIS_WINDOW);
    let mut engine = SimulationEngine::new(config.grid_size, trail_len)?;

    let mut remaining = steps;
    let mut moved = 0_u64;
    while remaining > 0 {
        let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
        moved += u64::from(engine.advance(rules, chunk));
        engine.ant_mut().charge_steps(u64::from(chunk));
        remaining -= u64::from(chunk);
    }

    let ant = engine.ant();
    let stasis = HighwayDetector::new(HighwayCriterion::Stasis {
        window: DEFAULT_STASIS_WINDOW,
    })
    .detect(ant.trail());
    let highway = find_period(ant.trail(), DEFAULT_PERIODIC_WINDOW, DEFAULT_MAX_PERIOD);
    let report = SimulationReport {
        steps: ant.step_count(),
        moved,
        position: ant.position(),
        direction: ant.direction(),
        visited: ant.visited().len(),
        stasis,
        highway,
    };
    debug!(?report, rules = %rules, "simulation finished");
    Ok((engine, report))
}
