//! Headless Battle Runner
//!
//! Runs a scenario to completion and prints a JSON or text result. With
//! `--runs N` it plays N seeds in parallel and reports aggregate outcomes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use combat_sim::battle::{
    top_killers, BattleOutcome, BattleScheduler, BattleStatistics, CombatEvent, EventSink,
};
use combat_sim::core::error::Result;
use combat_sim::core::types::Side;
use combat_sim::data::{load_scenario, Scenario};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Headless Battle Runner - scripted battles from a scenario file
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a combat scenario to completion and report the result")]
struct Args {
    /// Scenario TOML file
    #[arg(long, default_value = "data/scenarios/demo.toml")]
    scenario: PathBuf,

    /// Random seed (overrides the scenario's seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum steps before timeout (overrides the scenario's limit)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Number of battles to run with consecutive seeds
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Write the combat event stream as JSON lines (single run only)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Enable per-step debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Writes one JSON object per event
struct JsonLinesSink<W: Write> {
    writer: W,
    failed: bool,
}

impl<W: Write> JsonLinesSink<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &CombatEvent) {
        if self.failed {
            return;
        }
        let written = event
            .to_json_line()
            .map_err(std::io::Error::from)
            .and_then(|line| writeln!(self.writer, "{}", line));
        if let Err(e) = written {
            tracing::warn!("Failed to write event stream, disabling: {}", e);
            self.failed = true;
        }
    }
}

impl<W: Write> Drop for JsonLinesSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush event stream: {}", e);
        }
    }
}

#[derive(Serialize)]
struct Killer {
    name: String,
    kills: u32,
    hits: u32,
    shots: u32,
}

/// JSON output for a single battle
#[derive(Serialize)]
struct BattleResult {
    scenario: String,
    outcome: String,
    winner: Option<Side>,
    steps: u64,
    seed: u64,
    events: usize,
    statistics: BattleStatistics,
    top_killers_a: Vec<Killer>,
    top_killers_b: Vec<Killer>,
}

/// JSON output for a batch of battles
#[derive(Serialize, Default)]
struct BatchResult {
    scenario: String,
    runs: u32,
    first_seed: u64,
    side_a_wins: u32,
    side_b_wins: u32,
    draws: u32,
    timeouts: u32,
    average_steps: f64,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut scenario = load_scenario(&args.scenario)?;
    if let Some(seed) = args.seed {
        scenario.config.seed = seed;
    }
    if let Some(max_steps) = args.max_steps {
        scenario.config.max_steps = max_steps;
    }

    if args.runs > 1 {
        if args.events.is_some() {
            tracing::warn!("--events is ignored for batch runs");
        }
        let batch = run_batch(&scenario, args.runs)?;
        return print_output(&args.format, &batch, || print_batch_text(&batch));
    }

    let result = run_single(scenario, args.events.as_ref())?;
    print_output(&args.format, &result, || print_single_text(&result))
}

fn run_single(scenario: Scenario, events_path: Option<&PathBuf>) -> Result<BattleResult> {
    let name = scenario.name.clone();
    let seed = scenario.config.seed;
    let mut battle = BattleScheduler::new(scenario)?;
    if let Some(path) = events_path {
        let file = File::create(path)?;
        battle = battle.with_sink(JsonLinesSink::new(BufWriter::new(file)));
    }

    let outcome = battle.run_to_completion();
    // Drop the sink so buffered events reach disk before we report
    battle.set_sink(Box::new(combat_sim::battle::NullSink));

    let units = battle.state().units();
    let killers = |side: Side| -> Vec<Killer> {
        top_killers(units, side, 3)
            .into_iter()
            .map(|u| Killer {
                name: u.name.clone(),
                kills: u.kills,
                hits: u.hits_landed,
                shots: u.shots_fired,
            })
            .collect()
    };

    Ok(BattleResult {
        scenario: name,
        outcome: outcome.to_string(),
        winner: outcome.winner(),
        steps: battle.current_step(),
        seed,
        events: battle.history().len(),
        statistics: battle.statistics(),
        top_killers_a: killers(Side::A),
        top_killers_b: killers(Side::B),
    })
}

fn run_batch(scenario: &Scenario, runs: u32) -> Result<BatchResult> {
    let first_seed = scenario.config.seed;
    let results: Vec<(BattleOutcome, u64)> = (0..runs)
        .into_par_iter()
        .map(|i| -> Result<(BattleOutcome, u64)> {
            let mut s = scenario.clone();
            s.config.seed = first_seed.wrapping_add(i as u64);
            let mut battle = BattleScheduler::new(s)?;
            let outcome = battle.run_to_completion();
            Ok((outcome, battle.current_step()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut batch = BatchResult {
        scenario: scenario.name.clone(),
        runs,
        first_seed,
        ..BatchResult::default()
    };
    let mut total_steps = 0u64;
    for (outcome, steps) in &results {
        total_steps += steps;
        match outcome {
            BattleOutcome::Victory(Side::A) => batch.side_a_wins += 1,
            BattleOutcome::Victory(Side::B) => batch.side_b_wins += 1,
            BattleOutcome::Draw => batch.draws += 1,
            BattleOutcome::Timeout | BattleOutcome::Terminated => batch.timeouts += 1,
        }
    }
    if !results.is_empty() {
        batch.average_steps = total_steps as f64 / results.len() as f64;
    }
    Ok(batch)
}

fn print_output<T: Serialize>(format: &str, value: &T, text: impl FnOnce()) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(value)?),
        "text" => text(),
        _ => {
            eprintln!("Unknown format '{}', defaulting to json", format);
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

fn print_single_text(result: &BattleResult) {
    println!("Battle Result");
    println!("=============");
    println!("Scenario: {}", result.scenario);
    println!("Outcome: {}", result.outcome);
    println!("Steps: {}", result.steps);
    println!("Seed: {}", result.seed);
    println!();
    for (side, killers) in [
        (Side::A, &result.top_killers_a),
        (Side::B, &result.top_killers_b),
    ] {
        let stats = result.statistics.side(side);
        println!("Side {}:", side);
        println!("  Survived: {}/{}", stats.alive, stats.total);
        println!("  Total kills: {}", stats.total_kills);
        println!("  Total shots: {}", stats.shots);
        println!("  Total hits: {}", stats.hits);
        println!("  Accuracy: {:.2}%", stats.accuracy);
        if !killers.is_empty() {
            println!("  Top killers:");
            for k in killers.iter() {
                println!("    - {}: {} kills, {}/{} hits", k.name, k.kills, k.hits, k.shots);
            }
        }
        println!();
    }
}

fn print_batch_text(batch: &BatchResult) {
    println!("Batch Result");
    println!("============");
    println!("Scenario: {}", batch.scenario);
    println!("Runs: {} (seeds {}..)", batch.runs, batch.first_seed);
    println!("Side A wins: {}", batch.side_a_wins);
    println!("Side B wins: {}", batch.side_b_wins);
    println!("Draws: {}", batch.draws);
    println!("Timeouts: {}", batch.timeouts);
    println!("Average steps: {:.1}", batch.average_steps);
}
