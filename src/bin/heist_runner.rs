//! Headless Heist Runner
//!
//! Loads a building and a plan, runs the heist to completion and prints the
//! outcome as JSON or text.

use std::path::PathBuf;

use clap::Parser;
use heist_grid::core::{HeistError, Result, SimulationConfig};
use heist_grid::heist::{HeistOutcome, HeistPlan, HeistState};
use serde::Serialize;

/// Headless Heist Runner - play a scripted heist without a UI
#[derive(Parser, Debug)]
#[command(name = "heist_runner")]
#[command(about = "Run a scripted heist and report the outcome")]
struct Args {
    /// Building definition (JSON)
    building: PathBuf,

    /// Plan with setup and scheduled commands (JSON)
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Simulation config overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum ticks before giving up
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,

    /// Seed for skill checks (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Debug logging and a full event dump
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct RunResult {
    finished: bool,
    ticks: u64,
    seed: u64,
    outcome: Option<HeistOutcome>,
    signals: Vec<(String, f32)>,
    events: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "heist_grid=debug" } else { "heist_grid=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    let seed = config.rng_seed;

    let building = std::fs::read_to_string(&args.building)?;
    let mut state = HeistState::from_json_str(&building, config)?;

    let plan = match &args.plan {
        Some(path) => HeistPlan::load(path)?,
        None => HeistPlan::default(),
    };
    for command in &plan.setup {
        apply_logged(&mut state, command.clone());
    }

    while !state.is_finished() && state.tick() < args.max_ticks {
        // Commands due at tick N are applied before tick N runs
        let next = state.tick() + 1;
        for command in plan.due(next) {
            apply_logged(&mut state, command.clone());
        }
        state.run_tick();
    }

    if args.verbose {
        for event in state.events().iter() {
            eprintln!("  [{} {:.1}s] {}", event.tick, event.time, event.description);
        }
    }

    let result = RunResult {
        finished: state.is_finished(),
        ticks: state.tick(),
        seed,
        outcome: state.outcome().cloned(),
        signals: state.signals().emitted(),
        events: state.events().len(),
    };

    match args.format.as_str() {
        "text" => print_text(&result),
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn apply_logged(state: &mut HeistState, command: heist_grid::heist::Command) {
    let description = format!("{:?}", command);
    if let Err(err) = state.apply(command) {
        match err {
            HeistError::Purchase(_) | HeistError::InvalidCommand(_) => {
                tracing::warn!("command rejected: {} ({})", description, err)
            }
            other => tracing::error!("command failed: {} ({})", description, other),
        }
    }
}

fn print_text(result: &RunResult) {
    println!("Heist Result");
    println!("============");
    match &result.outcome {
        Some(outcome) => {
            println!("Outcome: {}", if outcome.success { "success" } else { "failure" });
            println!("Elapsed: {:.1}s ({} ticks)", outcome.elapsed, result.ticks);
            println!("Extracted: {:?}", outcome.extracted);
            println!("Captured: {:?}", outcome.captured);
            println!("Score loot: {}", outcome.score_value);
            println!("Bonus loot: {}", outcome.bonus_value);
            println!("Final threat: {}", outcome.final_zone);
        }
        None => println!("Unfinished after {} ticks", result.ticks),
    }
    println!();
    for (signal, at) in &result.signals {
        println!("Signal {} at {:.1}s", signal, at);
    }
    println!("Events: {}", result.events);
    println!("Seed: {}", result.seed);
}
