//! Headless runner for the dice factory.
//!
//! Loads a JSON save (or builds a fresh factory from a scenario), runs a
//! number of ticks while feeding scripted commands, prints a summary and
//! writes the save back.

mod error;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use dicefactory_core::command::{CommandQueue, CommandScript};
use dicefactory_core::config::SimConfig;
use dicefactory_core::engine::Engine;
use dicefactory_core::scenario::Scenario;
use dicefactory_core::sim::SimulationStrategy;
use dicefactory_core::truck::TruckPhase;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "dicefactory",
    about = "Run the dice factory simulation headless",
    version
)]
struct Args {
    /// Game parameters (.ron, .toml or .json). Ignored when resuming a save.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save file to resume from and write back to.
    #[arg(short, long, default_value = "save.json")]
    save: PathBuf,

    /// Number of ticks to run.
    #[arg(short, long, default_value_t = 3600)]
    ticks: u64,

    /// Override the RNG seed of a fresh factory.
    #[arg(long)]
    seed: Option<u64>,

    /// Starting layout for a fresh factory. Defaults to the starter layout.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Commands to feed in, keyed by tick.
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Send docked trucks as soon as they hold a die.
    #[arg(long)]
    auto_send: bool,

    /// Ignore an existing save and start over.
    #[arg(long)]
    fresh: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dicefactory_core=info,dicefactory=info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut engine = load_engine(args)?;
    let mut script = match &args.commands {
        Some(path) => CommandScript::load(path)?,
        None => CommandScript::default(),
    };
    let mut queue = CommandQueue::new();

    let start = engine.tick();
    for _ in 0..args.ticks {
        script.release(engine.tick(), &mut queue);
        for result in engine.apply_commands(&mut queue) {
            if let Err(e) = result {
                warn!(tick = engine.tick(), "command rejected: {e}");
            }
        }
        if args.auto_send {
            send_loaded_trucks(&mut engine);
        }
        engine.step();
    }
    if !script.is_empty() {
        warn!(remaining = script.len(), "commands scheduled past the last tick");
    }

    print_summary(&engine, start);

    let json = engine.to_json()?;
    std::fs::write(&args.save, json).map_err(|source| CliError::Io {
        file: args.save.clone(),
        source,
    })?;
    info!(path = %args.save.display(), tick = engine.tick(), "saved");
    Ok(())
}

/// Resume from the save file if there is one, otherwise build a new
/// factory.
fn load_engine(args: &Args) -> Result<Engine, CliError> {
    if !args.fresh && args.save.exists() {
        if args.config.is_some() || args.scenario.is_some() || args.seed.is_some() {
            warn!("resuming a save; --config, --scenario and --seed are ignored");
        }
        let engine = read_save(&args.save)?;
        info!(path = %args.save.display(), tick = engine.tick(), "resumed");
        return Ok(engine);
    }

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::starter(),
    };
    let engine = Engine::from_scenario(config, SimulationStrategy::Tick, &scenario)?;
    info!(objects = engine.object_count(), "new factory");
    Ok(engine)
}

fn read_save(path: &Path) -> Result<Engine, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    Engine::from_json(&json).map_err(|source| CliError::Load {
        file: path.to_path_buf(),
        source,
    })
}

fn send_loaded_trucks(engine: &mut Engine) {
    let loaded: Vec<_> = engine
        .world()
        .trucks
        .iter()
        .filter(|t| t.phase() == TruckPhase::Docked && !t.storage.is_empty())
        .map(|t| t.id)
        .collect();
    for id in loaded {
        if let Err(e) = engine.send_truck(id) {
            warn!("auto-send failed: {e}");
        }
    }
}

fn print_summary(engine: &Engine, start: u64) {
    let snapshot = engine.snapshot();
    println!(
        "tick {} (+{})  objects {}  dice {}  trucks {}",
        snapshot.tick,
        snapshot.tick - start,
        snapshot.objects.len(),
        snapshot.dice.len(),
        snapshot.trucks.len(),
    );
    println!(
        "warehouse {}/{}",
        snapshot.warehouse_count, snapshot.warehouse_capacity
    );
    for (currency, balance) in &snapshot.balances {
        println!("{currency:?}: {balance}");
    }
    for entry in &snapshot.hotbar {
        let price = if entry.cost == u64::MAX {
            "n/a".to_string()
        } else {
            format!("{} {:?}", entry.cost, entry.currency)
        };
        println!("  {:<14} {price}", entry.kind.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
    }

    #[test]
    fn sample_config_loads() {
        let config = SimConfig::load(&data("sim.toml")).unwrap();
        assert_eq!(config.grid_width, 24);
        assert_eq!(config.truck.type_limit, 2);
        assert_eq!(config.tile_size, SimConfig::default().tile_size);
    }

    #[test]
    fn sample_commands_load_in_tick_order() {
        let mut script = CommandScript::load(&data("commands.ron")).unwrap();
        assert_eq!(script.len(), 5);
        let mut queue = CommandQueue::new();
        assert_eq!(script.release(1800, &mut queue), 3);
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::parse_from(["dicefactory", "--ticks", "10", "--auto-send"]);
        assert_eq!(args.ticks, 10);
        assert!(args.auto_send);
        assert_eq!(args.save, PathBuf::from("save.json"));
        assert!(!args.fresh);
    }
}
