//! # Check-Config Subcommand
//!
//! Parses and validates a ledger configuration file, then prints the
//! normalized configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use unistake_ledger::LedgerConfig;

/// Arguments for the check-config subcommand.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file. Defaults to the global `--config`.
    pub path: Option<PathBuf>,

    /// Print nothing on success.
    #[arg(long, short)]
    pub quiet: bool,
}

/// Load a ledger configuration from `path`.
pub fn load_config(path: &Path) -> Result<LedgerConfig> {
    LedgerConfig::load(path)
        .with_context(|| format!("failed to load ledger config {}", path.display()))
}

/// Execute the check-config subcommand.
pub fn run_check_config(args: &CheckConfigArgs, config: Option<&Path>) -> Result<u8> {
    let Some(path) = args.path.as_deref().or(config) else {
        bail!("no configuration file given; pass a path or --config");
    };
    let loaded = load_config(path)?;
    tracing::info!(path = %path.display(), "configuration valid");
    if !args.quiet {
        println!("{}", serde_yaml::to_string(&loaded)?);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
ledger_address: "0x00000000000000000000000000000000000001ed"
governance: "0x0000000000000000000000000000000000000090"
minimum_commitment: "40000"
authorization_ceiling: 3
legacy_a: { ratio: "1450000000000000000", divisor: "1000000000000000" }
legacy_b: { ratio: 1, divisor: 1 }
"#;

    fn write(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("ledger.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn valid_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), VALID);
        let args = CheckConfigArgs {
            path: Some(path),
            quiet: true,
        };
        assert_eq!(run_check_config(&args, None).unwrap(), 0);
    }

    #[test]
    fn falls_back_to_global_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), VALID);
        let args = CheckConfigArgs {
            path: None,
            quiet: true,
        };
        assert_eq!(run_check_config(&args, Some(&path)).unwrap(), 0);
    }

    #[test]
    fn missing_path_is_an_error() {
        let args = CheckConfigArgs {
            path: None,
            quiet: true,
        };
        assert!(run_check_config(&args, None).is_err());
    }

    #[test]
    fn zero_governance_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let content = VALID.replace(
            "0x0000000000000000000000000000000000000090",
            "0x0000000000000000000000000000000000000000",
        );
        let path = write(dir.path(), &content);
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("governance"));
    }

    #[test]
    fn zero_divisor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let content = VALID.replace("divisor: 1 }", "divisor: 0 }");
        let path = write(dir.path(), &content);
        assert!(load_config(&path).is_err());
    }
}
