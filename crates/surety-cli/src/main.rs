//! # surety CLI entry point
//!
//! Parses command-line arguments, loads the ledger configuration, and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use surety_cli::config::{run_config, ConfigArgs};
use surety_cli::replay::{run_replay, ReplayArgs};

/// Flight-surety ledger CLI.
///
/// Runs the parametric flight-delay insurance ledger in-process: inspect
/// the effective configuration or replay a scripted session.
#[derive(Parser, Debug)]
#[command(name = "surety", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to a ledger configuration file. Without it, `SURETY_*`
    /// environment variables override the defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective ledger configuration.
    Config(ConfigArgs),

    /// Replay a scripted ledger session and report outcomes and signals.
    Replay(ReplayArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = surety_cli::load_config(cli.config.as_deref()).and_then(|config| {
        tracing::debug!(?config, "configuration loaded");
        match cli.command {
            Commands::Config(args) => run_config(&args, &config),
            Commands::Replay(args) => run_replay(&args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
