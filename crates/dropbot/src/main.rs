//! Drop tracker command line.
//!
//! Every subcommand loads the tracker from the config file, performs one
//! operation as the `--as` identity and prints the reply a chat member would
//! see. `announce` keeps running and prints the standings on an interval.

use clap::{Parser, Subcommand};
use drop_ledger::report::{
    award_message, boss_text, leaderboard_lines, remove_message, team_stats_text, Standings,
};
use drop_ledger::{default_config_toml, LedgerError, Tracker, TrackerConfig, TrackerError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

/// Command line arguments for the drop tracker
#[derive(Parser, Debug)]
#[command(name = "dropbot")]
#[command(about = "Tracks boss drops and team points for a clan competition")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "dropbot.toml")]
    config: PathBuf,

    /// Identity the command runs as
    #[arg(long = "as", global = true, value_name = "IDENTITY")]
    identity: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report a drop for your own team
    Drop { boss: String, drop: String },
    /// Add a drop to any team (admin)
    AdminDrop {
        team: String,
        boss: String,
        drop: String,
    },
    /// Remove a drop from the team you lead
    Remove { boss: String, drop: String },
    /// Remove a drop from any team (admin)
    AdminRemove {
        team: String,
        boss: String,
        drop: String,
    },
    /// Rebuild every team total from the drop counts (admin)
    Recalculate,
    /// Show your team's drops and points
    Stats,
    /// Show every team's drops and points
    StatsAll,
    /// Show all teams ranked by points
    Leaderboard,
    /// List every boss and its drops (admin)
    Bosses,
    /// List the drops of one boss
    Boss { name: String },
    /// Clear all drops and points (admin)
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Print the current standings on an interval
    Announce {
        /// Print once and exit
        #[arg(long)]
        once: bool,
        /// Minutes between announcements, overriding the config
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Setup(#[from] TrackerError),
    #[error(transparent)]
    Command(#[from] LedgerError),
    #[error("this command needs --as <IDENTITY>")]
    MissingIdentity,
    #[error("{0}")]
    Usage(String),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Command(e)) if e.state_changed() => {
            // Applied but not saved
            warn!("{}", e);
            eprintln!("Warning: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::InitConfig { force } = cli.command {
        return init_config(&cli.config, force);
    }

    let config = load_config(&cli.config)?;
    let tracker = Tracker::from_config(&config)?;
    let identity = cli.identity.as_deref();

    match cli.command {
        Command::Drop { boss, drop } => {
            let result = tracker.report_drop(require(identity)?, &boss, &drop)?;
            println!("{}", award_message(&result));
        }
        Command::AdminDrop { team, boss, drop } => {
            let result = tracker.admin_award(require(identity)?, &team, &boss, &drop)?;
            println!("{}", award_message(&result));
        }
        Command::Remove { boss, drop } => {
            let result = tracker.leader_remove(require(identity)?, &boss, &drop)?;
            println!("{}", remove_message(&result));
        }
        Command::AdminRemove { team, boss, drop } => {
            let result = tracker.admin_remove(require(identity)?, &team, &boss, &drop)?;
            println!("{}", remove_message(&result));
        }
        Command::Recalculate => {
            tracker.recalculate(require(identity)?)?;
            println!("Points recalculated for all teams.");
        }
        Command::Stats => {
            let stats = tracker.my_team_stats(require(identity)?)?;
            print!("{}", team_stats_text(&stats));
        }
        Command::StatsAll => {
            for stats in tracker.all_team_stats() {
                print!("{}", team_stats_text(&stats));
                println!();
            }
        }
        Command::Leaderboard => {
            println!("Leaderboard");
            for line in leaderboard_lines(&tracker.leaderboard()) {
                println!("{}", line);
            }
        }
        Command::Bosses => {
            for boss in tracker.all_bosses(require(identity)?)? {
                println!("{}", boss_text(boss));
            }
        }
        Command::Boss { name } => {
            print!("{}", boss_text(tracker.boss(&name)?));
        }
        Command::Reset { yes } => {
            let identity = require(identity)?;
            if !yes {
                return Err(CliError::Usage(
                    "this clears every team's drops and points; rerun with --yes to confirm"
                        .to_string(),
                ));
            }
            let pending = tracker.request_reset(identity)?;
            tracker.confirm_reset(pending.token, identity)?;
            println!("All team data has been reset.");
        }
        Command::Announce {
            once,
            interval_minutes,
        } => {
            let mut announce = config.announce.clone();
            if let Some(minutes) = interval_minutes {
                announce.interval_minutes = minutes;
            }
            if once {
                print_standings(&tracker);
            } else {
                announce_loop(&tracker, announce.interval()).await;
            }
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn require(identity: Option<&str>) -> Result<&str, CliError> {
    identity.ok_or(CliError::MissingIdentity)
}

/// Loads the config and resolves data paths against its directory.
fn load_config(path: &Path) -> Result<TrackerConfig, CliError> {
    let mut config = TrackerConfig::from_file_or_default(path)
        .map_err(|e| CliError::Setup(TrackerError::Config(e)))?;
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
    }
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.files = config.files.relative_to(base);
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    fs::write(path, default_config_toml()).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_standings(tracker: &Tracker) {
    for line in Standings::from_leaderboard(&tracker.leaderboard()).lines() {
        println!("{}", line);
    }
}

async fn announce_loop(tracker: &Tracker, period: std::time::Duration) {
    info!(minutes = period.as_secs() / 60, "Announcing standings");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Other processes write the data files between ticks
                if let Err(e) = tracker.refresh() {
                    warn!("Failed to reload standings, announcing last known: {}", e);
                }
                print_standings(tracker);
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Stopping announcements");
                break;
            }
        }
    }
}
