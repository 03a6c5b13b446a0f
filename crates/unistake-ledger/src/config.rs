//! # Ledger Configuration
//!
//! Parameters fixed at construction plus the initial values of the
//! governance-adjustable ones. Loaded from YAML:
//!
//! ```yaml
//! ledger_address: "0x00000000000000000000000000000000000001ed"
//! governance: "0x0000000000000000000000000000000000000090"
//! minimum_commitment: "40000"
//! authorization_ceiling: 5
//! minimum_holding_period: 24
//! legacy_a: { ratio: "1450000000000000000", divisor: "1000000000000000" }
//! legacy_b: { ratio: "1000000000000000000", divisor: "1000000000000000000" }
//! ```
//!
//! Amounts and ratio terms may be strings or integers. Unknown keys are
//! rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use unistake_core::{Address, Amount, ConversionRatio};

/// Holding period applied when the configuration omits one.
pub const DEFAULT_MINIMUM_HOLDING_PERIOD: u64 = 24;

/// Errors from loading or validating a [`LedgerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was read.
        path: PathBuf,
    },

    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The YAML is malformed or does not match the schema.
    #[error("failed to parse config: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// The values parse but are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Construction parameters for a [`StakeLedger`](crate::StakeLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// This ledger's own address, as legacy system A knows it.
    pub ledger_address: Address,
    /// Initial governance address.
    pub governance: Address,
    /// Minimum fresh native commitment. Zero disables the minimum and the
    /// holding period.
    #[serde(default)]
    pub minimum_commitment: Amount,
    /// Maximum number of applications one operator may authorize. Zero
    /// blocks every authorization.
    #[serde(default)]
    pub authorization_ceiling: u32,
    /// Ticks after a fresh commitment before the stake may drop below the
    /// minimum.
    #[serde(default = "default_holding_period")]
    pub minimum_holding_period: u64,
    /// Conversion from legacy system A's unit.
    pub legacy_a: ConversionRatio,
    /// Conversion from legacy system B's unit.
    pub legacy_b: ConversionRatio,
}

fn default_holding_period() -> u64 {
    DEFAULT_MINIMUM_HOLDING_PERIOD
}

impl LedgerConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Reject values the ledger cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger_address.is_zero() {
            return Err(ConfigError::Invalid(
                "ledger_address must not be the zero address".to_string(),
            ));
        }
        if self.governance.is_zero() {
            return Err(ConfigError::Invalid(
                "governance must not be the zero address".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
ledger_address: "0x00000000000000000000000000000000000001ed"
governance: "0x0000000000000000000000000000000000000090"
minimum_commitment: "40000"
authorization_ceiling: 5
legacy_a: { ratio: "1450000000000000000", divisor: "1000000000000000" }
legacy_b: { ratio: 1, divisor: 1 }
"#;

    #[test]
    fn parses_sample_with_default_holding_period() {
        let config = LedgerConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.minimum_commitment, Amount::new(40_000));
        assert_eq!(config.authorization_ceiling, 5);
        assert_eq!(config.minimum_holding_period, DEFAULT_MINIMUM_HOLDING_PERIOD);
        assert_eq!(config.legacy_a.divisor(), 1_000_000_000_000_000);
        assert_eq!(config.legacy_b.ratio(), 1);
    }

    #[test]
    fn unknown_key_rejected() {
        let yaml = format!("{SAMPLE}slashing: true\n");
        assert!(matches!(
            LedgerConfig::from_yaml_str(&yaml),
            Err(ConfigError::YamlParse(_))
        ));
    }

    #[test]
    fn zero_divisor_rejected() {
        let yaml = SAMPLE.replace("{ ratio: 1, divisor: 1 }", "{ ratio: 1, divisor: 0 }");
        assert!(LedgerConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn zero_governance_rejected() {
        let yaml = SAMPLE.replace(
            "0x0000000000000000000000000000000000000090",
            "0x0000000000000000000000000000000000000000",
        );
        assert!(matches!(
            LedgerConfig::from_yaml_str(&yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = LedgerConfig::load(file.path()).unwrap();
        assert_eq!(config.authorization_ceiling, 5);
    }

    #[test]
    fn missing_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = LedgerConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
