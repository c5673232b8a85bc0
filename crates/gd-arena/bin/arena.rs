//! Grimdelve arena
//!
//! Runs scripted combat bouts and prints who was left standing.

use std::path::PathBuf;

use clap::Parser;

use gd_arena::{builtin_duel, render_summary, run_bout, ArenaSummary, Scenario, ScenarioError};

/// Grimdelve arena
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(author, version, about = "Grimdelve arena - scripted combat bouts", long_about = None)]
struct Args {
    /// Scenario file (JSON); the built-in duel when omitted
    #[arg(short = 's', long = "scenario")]
    scenario: Option<PathBuf>,

    /// Base seed; bout k runs with seed + k
    #[arg(long = "seed", default_value_t = 1)]
    seed: u64,

    /// Number of bouts to run
    #[arg(short = 'n', long = "bouts", default_value_t = 1)]
    bouts: u64,

    /// Round cap per bout
    #[arg(long = "max-turns", default_value_t = 200)]
    max_turns: u64,

    /// Print the full combat log of every bout
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Write the aggregated summary to this file as JSON
    #[arg(long = "json")]
    json: Option<PathBuf>,
}

fn main() -> Result<(), ScenarioError> {
    let args = Args::parse();

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => builtin_duel(),
    };
    println!("scenario: {}", scenario.name);

    let mut summary = ArenaSummary::default();
    for k in 0..args.bouts {
        let report = run_bout(&scenario, args.seed + k, args.max_turns)?;
        if args.verbose {
            println!("--- bout {} (seed {}) ---", k + 1, report.seed);
            for line in &report.log {
                println!("{line}");
            }
        }
        match &report.winner {
            Some(name) => println!(
                "bout {}: {} stands after {} rounds",
                k + 1,
                name,
                report.turns
            ),
            None => println!("bout {}: unresolved after {} rounds", k + 1, report.turns),
        }
        summary.absorb(&report);
    }

    print!("{}", render_summary(&summary));

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| ScenarioError::Parse(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ScenarioError::Io(e.to_string()))?;
        println!("summary written to {}", path.display());
    }

    Ok(())
}
