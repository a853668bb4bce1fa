//! Combat Sim - Interactive Console
//!
//! Loads a scenario (first argument, default `data/scenarios/demo.toml`)
//! and lets the operator step, run, reset and inspect the battle.

use combat_sim::battle::{top_killers, BattleScheduler, StepReport};
use combat_sim::core::error::Result;
use combat_sim::core::types::Side;
use combat_sim::data::load_scenario;

use std::io::{self, Write};

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("combat_sim=info")
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/scenarios/demo.toml".to_string());
    let scenario = load_scenario(&path)?;
    let mut battle = BattleScheduler::new(scenario)?;

    println!("\n=== COMBAT SIM ===");
    println!();
    println!("Commands:");
    println!("  step / t        - Advance the battle by one step");
    println!("  run <n>         - Run n steps (stops early if the battle ends)");
    println!("  finish / f      - Run until the battle ends");
    println!("  status / s      - Show detailed status");
    println!("  reset / r       - Restart from the initial configuration");
    println!("  stop            - Terminate the battle");
    println!("  quit / q        - Exit");
    println!();

    loop {
        display_status(&battle);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        match parts.next().unwrap_or_default() {
            "quit" | "q" => break,
            "step" | "t" => {
                let report = battle.step();
                print_events(&report);
            }
            "run" => {
                let n: u64 = match parts.next().map(str::parse::<u64>) {
                    Some(Ok(n)) => n,
                    _ => {
                        println!("Usage: run <n>");
                        continue;
                    }
                };
                for _ in 0..n {
                    let report = battle.step();
                    if !report.running {
                        break;
                    }
                }
            }
            "finish" | "f" => {
                let outcome = battle.run_to_completion();
                println!("Battle ended: {}", outcome);
            }
            "status" | "s" => display_detailed_status(&battle),
            "reset" | "r" => {
                battle.reset();
                println!("Battle reset.");
            }
            "stop" => battle.terminate(),
            other => println!("Unknown command '{}'", other),
        }
    }

    Ok(())
}

fn print_events(report: &StepReport) {
    for event in &report.events {
        println!(
            "  [{}] {} {} -> {} ({:.2} km, p={:.2})",
            event.step,
            event.type_name(),
            event.attacker.name,
            event.target.name,
            event.distance,
            event.hit_chance
        );
    }
}

fn display_status(battle: &BattleScheduler) {
    let stats = battle.statistics();
    println!(
        "\nStep {} | {:?} | A: {}/{} alive | B: {}/{} alive",
        stats.step,
        stats.status,
        stats.side_a.alive,
        stats.side_a.total,
        stats.side_b.alive,
        stats.side_b.total
    );
}

fn display_detailed_status(battle: &BattleScheduler) {
    let stats = battle.statistics();
    let units = battle.state().units();
    for side in Side::ALL {
        let s = stats.side(side);
        println!("\nSide {}:", side);
        println!("  Alive: {}/{}", s.alive, s.total);
        println!("  Damaged: {}", s.damaged);
        println!("  Kills: {}", s.total_kills);
        println!("  Shots: {}, Hits: {}", s.shots, s.hits);
        if s.shots > 0 {
            println!("  Overall Accuracy: {:.1}%", s.accuracy);
        }
        println!("  Combat potential: {:.2}", s.combat_potential);
        for (unit_type, t) in &s.by_type {
            println!(
                "    {:<10} {}/{} alive, {} kills",
                unit_type.to_string(),
                t.alive,
                t.total,
                t.kills
            );
        }
        let top = top_killers(units, side, 3);
        if !top.is_empty() {
            println!("  Top killers:");
            for u in top {
                println!(
                    "    - {}: {} kills, {}/{} hits",
                    u.name, u.kills, u.hits_landed, u.shots_fired
                );
            }
        }
    }
}
