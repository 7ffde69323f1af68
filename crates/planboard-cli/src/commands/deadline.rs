//! Deadline scan commands for CLI.

use std::future::Future;
use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use planboard_core::{Config, DeadlineScanner, PlanDb, ScanOutcome};
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::{now_or, print_json};

#[derive(Subcommand)]
pub enum DeadlineAction {
    /// Run one scan and print the alerts that fired
    Scan {
        /// Evaluate as of this time instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// Scan periodically until interrupted
    Watch {
        /// Minutes between scans; defaults to scan.interval_minutes
        #[arg(long)]
        interval: Option<u32>,
        /// Stop after this many scans
        #[arg(long)]
        iterations: Option<u32>,
    },
}

pub fn run(action: DeadlineAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let scanner = DeadlineScanner::from_config(&config);

    match action {
        DeadlineAction::Scan { now } => {
            let now = now_or(now.as_deref())?;
            let db = PlanDb::open()?;
            let outcome = scanner.run(&db, now)?;
            print_json(&outcome.events)?;
        }
        DeadlineAction::Watch {
            interval,
            iterations,
        } => {
            let minutes = interval.unwrap_or(config.scan.interval_minutes).max(1);
            let path = PlanDb::default_path()?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let period = Duration::from_secs(u64::from(minutes) * 60);
                let runs = watch(scanner, path, period, iterations, tokio::signal::ctrl_c()).await?;
                tracing::info!(runs, "deadline watcher stopped");
                Ok::<_, Box<dyn std::error::Error>>(())
            })?;
        }
    }
    Ok(())
}

/// Scan every `period` until `shutdown` resolves or `iterations` scans ran.
///
/// `shutdown` is polled across iterations, so a signal that arrives while a
/// scan is in flight still stops the loop at the next turn. Returns the
/// number of scans run.
async fn watch<S>(
    scanner: DeadlineScanner,
    path: PathBuf,
    period: Duration,
    iterations: Option<u32>,
    shutdown: S,
) -> Result<u32, Box<dyn std::error::Error>>
where
    S: Future,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);
    tracing::info!(interval_secs = period.as_secs(), "deadline watcher started");

    let mut runs = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("deadline watcher stopping");
                break;
            }
            _ = ticker.tick() => {
                let scanner = scanner.clone();
                let path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || -> planboard_core::Result<ScanOutcome> {
                    let db = PlanDb::open_at(&path)?;
                    scanner.run(&db, Utc::now())
                })
                .await?;
                match outcome {
                    Ok(outcome) => {
                        for event in &outcome.events {
                            println!("{}", serde_json::to_string(event)?);
                        }
                    }
                    // A locked or missing database should not stop the watcher.
                    Err(e) => tracing::error!("deadline scan failed: {e}"),
                }
                runs += 1;
                if iterations.is_some_and(|max| runs >= max) {
                    break;
                }
            }
        }
    }
    Ok(runs)
}
