//! # unistake-cli: Unified Stake Ledger Command-Line Interface
//!
//! ## Subcommands
//!
//! - `simulate`: replay a YAML scenario against an in-memory ledger
//! - `convert`: legacy-to-common unit conversion
//! - `check-config`: ledger configuration validation
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from handlers.
//! - Handlers delegate to `unistake-ledger`; no ledger rules live here.
//! - Command output goes to stdout as JSON; logs go to stderr.

pub mod check_config;
pub mod convert;
pub mod scenario;
pub mod simulate;
