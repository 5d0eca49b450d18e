use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use antlab_app::{SearchOptions, load_config, run_search, run_simulation};
use antlab_brain::{PolicyRegistry, RandomPolicy, RandomPolicyConfig, ScriptedPolicy};
use antlab_core::{AntLabConfig, EpisodeController, Grid, HighwayCriterion, Palette, RuleTable};
use antlab_render::{render_png, rule_legend};
use antlab_storage::{DEFAULT_LOG_PATH, RuleLog, count_discoveries};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "antlab",
    version,
    about = "Search Langton's-ant rule tables for highways"
)]
struct Cli {
    /// JSON file holding an AntLab configuration; CLI flags override it.
    #[arg(long, global = true, env = "ANTLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for rule mutation and the policy.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Grid edge length in cells.
    #[arg(long, global = true)]
    grid_size: Option<u32>,

    /// Flag highways by repeated movement instead of a stationary ant.
    #[arg(long, global = true)]
    periodic: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    Random,
    Scripted,
}

impl PolicyKind {
    const fn registry_kind(self) -> &'static str {
        match self {
            Self::Random => RandomPolicy::KIND,
            Self::Scripted => ScriptedPolicy::KIND,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mutate rule tables until enough highway-producing rule sets are logged.
    Search {
        /// Discovery log to append to and count.
        #[arg(long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,
        /// Stop once the log holds this many discoveries.
        #[arg(long, default_value_t = 10)]
        target: usize,
        /// Give up after this many actions.
        #[arg(long, default_value_t = 1_000_000)]
        max_actions: u64,
        /// Actions between discovery-log checks.
        #[arg(long, default_value_t = 1_000)]
        batch: u64,
        #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
        policy: PolicyKind,
        /// Action script for the scripted policy, e.g. "add,add,remove".
        #[arg(long)]
        script: Option<String>,
        /// Chance that the random policy adds a rule.
        #[arg(long)]
        add_probability: Option<f64>,
        /// Write the final grid as a PNG.
        #[arg(long)]
        png: Option<PathBuf>,
        #[arg(long, default_value_t = 4)]
        cell_size: u32,
    },
    /// Run a fixed rule table and report where the ant ends up.
    Simulate {
        /// Turn pattern, one letter per colour (e.g. RL, LLRR).
        #[arg(long, default_value = "RL")]
        rules: String,
        #[arg(long, default_value_t = 11_000)]
        steps: u64,
        /// Write the final grid as a PNG.
        #[arg(long)]
        png: Option<PathBuf>,
        #[arg(long, default_value_t = 4)]
        cell_size: u32,
    },
    /// Print the number of discoveries recorded in a log.
    Count {
        #[arg(long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Search {
            log,
            target,
            max_actions,
            batch,
            policy,
            script,
            add_probability,
            png,
            cell_size,
        } => {
            let options = SearchOptions {
                log_path: log,
                target_highways: target,
                max_actions,
                batch_actions: batch,
            };
            let registry = build_registry(script.as_deref(), add_probability)?;
            let key = registry
                .find(policy.registry_kind())
                .with_context(|| format!("policy '{}' needs --script", policy.registry_kind()))?;
            let seed = config.rng_seed.unwrap_or(0);
            let mut policy = registry
                .spawn(key, seed)
                .context("policy factory disappeared from registry")?;

            let sink = RuleLog::open(&options.log_path).with_context(|| {
                format!("failed to open discovery log {}", options.log_path.display())
            })?;
            let mut controller = EpisodeController::with_discovery_log(config, Box::new(sink))
                .context("failed to build episode controller")?;

            let report = run_search(&mut controller, policy.as_mut(), &options)?;
            println!(
                "{} discoveries logged to {} after {} actions ({} highways, {} budget exhaustions)",
                report.discoveries,
                options.log_path.display(),
                report.actions,
                report.stats.highways,
                report.stats.budget_exhaustions,
            );
            if let Some(path) = png {
                write_png(&path, controller.grid(), controller.palette(), cell_size)?;
            }
            if !report.reached_target {
                bail!(
                    "stopped after {} actions with {}/{} discoveries",
                    report.actions,
                    report.discoveries,
                    options.target_highways
                );
            }
        }
        Command::Simulate {
            rules,
            steps,
            png,
            cell_size,
        } => {
            let table = RuleTable::from_turns(&rules)
                .with_context(|| format!("invalid rule pattern '{rules}'"))?;
            let (engine, report) =
                run_simulation(&config, &table, steps).context("failed to build simulation")?;
            for line in rule_legend(&table) {
                println!("{line}");
            }
            println!(
                "steps {} (moved {}), ant at ({}, {}) facing {:?}, {} cells visited",
                report.steps,
                report.moved,
                report.position.x,
                report.position.y,
                report.direction,
                report.visited,
            );
            println!("stationary: {}", report.stasis);
            match report.highway {
                Some(highway) => println!(
                    "highway: period {} displacement ({}, {})",
                    highway.period, highway.displacement.0, highway.displacement.1
                ),
                None => println!("highway: none"),
            }
            if let Some(path) = png {
                write_png(&path, engine.grid(), table.palette(), cell_size)?;
            }
        }
        Command::Count { log } => {
            let count = count_discoveries(&log)
                .with_context(|| format!("failed to read discovery log {}", log.display()))?;
            println!("{count}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<AntLabConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(size) = cli.grid_size {
        config.grid_size = size;
    }
    if cli.periodic {
        config.highway = HighwayCriterion::periodic();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_registry(script: Option<&str>, add_probability: Option<f64>) -> Result<PolicyRegistry> {
    let mut registry = PolicyRegistry::new();
    registry.register(RandomPolicy::KIND, move |seed| {
        Box::new(RandomPolicy::from_config(RandomPolicyConfig {
            seed,
            add_probability: add_probability.unwrap_or(0.5),
        }))
    });
    if let Some(script) = script {
        let scripted: ScriptedPolicy = script
            .parse()
            .with_context(|| format!("invalid action script '{script}'"))?;
        registry.register(ScriptedPolicy::KIND, move |_| Box::new(scripted.clone()));
    }
    Ok(registry)
}

fn write_png(path: &Path, grid: &Grid, palette: &Palette, cell_size: u32) -> Result<()> {
    let bytes = render_png(grid, palette, cell_size).context("failed to render grid")?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote grid snapshot");
    Ok(())
}
