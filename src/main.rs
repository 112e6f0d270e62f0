use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use race_tracker::{default_participants, RaceTracker, DEFAULT_RUNNER_NAMES};

/// Console front end for the race tracker core: backs one runner, runs a
/// single race, and reports the outcome.
#[derive(Parser, Debug)]
#[command(name = "race-tracker")]
struct Args {
    /// Runner to back (N°1, N°2 or N°3).
    #[arg(long, default_value = "N°2")]
    runner: String,

    /// Seed for the delay draws; omit for a fresh random race.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final session snapshot as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    if !DEFAULT_RUNNER_NAMES.contains(&args.runner.as_str()) {
        bail!(
            "unknown runner {:?}; pick one of {:?}",
            args.runner,
            DEFAULT_RUNNER_NAMES
        );
    }

    let handle = RaceTracker::spawn(default_participants(args.seed));
    let mut snapshots = handle.subscribe();

    info!(backed = %args.runner, seed = ?args.seed, "starting race");
    handle.select_runner(args.runner.as_str());
    handle.start();

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for lane in handle.lanes() {
                    info!(
                        runner = %lane.name(),
                        progress = lane.progress(),
                        percent = (lane.progress_factor() * 100.0) as u32,
                        "progress"
                    );
                }
            }
            changed = snapshots.changed() => {
                changed?;
                if snapshots.borrow().race_finished {
                    break;
                }
            }
        }
    }

    let snapshot = handle.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if snapshot.has_won {
        info!(
            winner = ?snapshot.winner,
            score = snapshot.score,
            lives = snapshot.remaining_lives,
            "your runner won"
        );
    } else {
        info!(
            winner = ?snapshot.winner,
            score = snapshot.score,
            lives = snapshot.remaining_lives,
            "your runner lost"
        );
    }

    Ok(())
}
