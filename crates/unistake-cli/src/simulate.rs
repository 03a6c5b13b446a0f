//! # Simulate Subcommand
//!
//! Replays a scenario file (see [`crate::scenario`]) and prints the
//! report as JSON. Exits with status 2 when any step's outcome differs
//! from its expectation or the event chain fails to verify.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::check_config::load_config;
use crate::scenario::{run_scenario, Scenario, ScenarioReport};

/// Arguments for the simulate subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML).
    pub scenario: PathBuf,

    /// Print only the summary line instead of the full report.
    #[arg(long)]
    pub summary: bool,
}

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read scenario {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

/// Load and replay a scenario. The scenario's own `config` wins over `config`.
pub fn simulate(args: &SimulateArgs, config: Option<&Path>) -> Result<ScenarioReport> {
    let scenario = load_scenario(&args.scenario)?;
    let ledger_config = match (&scenario.config, config) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => load_config(path)?,
        (None, None) => bail!("scenario has no `config` section; pass --config"),
    };
    run_scenario(&scenario, ledger_config)
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs, config: Option<&Path>) -> Result<u8> {
    let report = simulate(args, config)?;
    if args.summary {
        println!(
            "steps: {}  mismatches: {}  events: {}  chain: {}",
            report.steps.len(),
            report.mismatches,
            report.events.len(),
            if report.chain_verified { "ok" } else { "BROKEN" },
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if report.mismatches > 0 || !report.chain_verified {
        tracing::warn!(mismatches = report.mismatches, "scenario did not match");
        return Ok(2);
    }
    Ok(0)
}
