//! # unistake CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use unistake_cli::check_config::{run_check_config, CheckConfigArgs};
use unistake_cli::convert::{run_convert, ConvertArgs};
use unistake_cli::simulate::{run_simulate, SimulateArgs};

/// Unified stake ledger toolkit.
///
/// Replays ledger scenarios against an in-memory ledger, converts legacy
/// amounts, and checks ledger configuration files.
#[derive(Parser, Debug)]
#[command(name = "unistake", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a ledger configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a YAML scenario and print the report as JSON.
    Simulate(SimulateArgs),

    /// Convert a legacy amount into the common unit.
    Convert(ConvertArgs),

    /// Parse and validate a ledger configuration file.
    CheckConfig(CheckConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr; stdout carries command output.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!("unistake CLI starting");

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Simulate(args) => run_simulate(&args, config),
        Commands::Convert(args) => run_convert(&args, config),
        Commands::CheckConfig(args) => run_check_config(&args, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
