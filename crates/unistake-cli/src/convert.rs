//! # Convert Subcommand
//!
//! Converts a raw legacy amount into the common unit, either with an
//! explicit ratio or with the ratio a ledger configuration assigns to one
//! legacy source.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use unistake_core::{Amount, ConversionRatio};
use unistake_ledger::LegacyKind;

use crate::check_config::load_config;

/// Legacy source selector for `--source`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    /// Legacy system A.
    A,
    /// Legacy system B.
    B,
}

impl From<SourceArg> for LegacyKind {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::A => LegacyKind::A,
            SourceArg::B => LegacyKind::B,
        }
    }
}

/// Arguments for the convert subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Raw legacy amount.
    pub amount: Amount,

    /// Use the ratio configured for this legacy source (needs `--config`).
    #[arg(long, value_enum, conflicts_with_all = ["ratio", "divisor"])]
    pub source: Option<SourceArg>,

    /// Common units per divisor step.
    #[arg(long, requires = "divisor")]
    pub ratio: Option<u128>,

    /// Legacy units per divisor step.
    #[arg(long, requires = "ratio")]
    pub divisor: Option<u128>,
}

/// Printed result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertOutput {
    /// Input amount.
    pub amount: Amount,
    /// Ratio applied.
    pub ratio: ConversionRatio,
    /// Common-unit value of the aligned portion.
    pub converted: Amount,
    /// Raw amount left unconverted.
    pub remainder: Amount,
}

fn resolve_ratio(args: &ConvertArgs, config: Option<&Path>) -> Result<ConversionRatio> {
    match (args.source, args.ratio, args.divisor) {
        (Some(source), _, _) => {
            let Some(path) = config else {
                bail!("--source needs a ledger configuration; pass --config");
            };
            let config = load_config(path)?;
            Ok(match LegacyKind::from(source) {
                LegacyKind::A => config.legacy_a,
                LegacyKind::B => config.legacy_b,
            })
        }
        (None, Some(ratio), Some(divisor)) => {
            ConversionRatio::new(ratio, divisor).context("invalid conversion ratio")
        }
        _ => bail!("pass either --source or both --ratio and --divisor"),
    }
}

/// Compute the conversion described by `args`.
pub fn convert(args: &ConvertArgs, config: Option<&Path>) -> Result<ConvertOutput> {
    let ratio = resolve_ratio(args, config)?;
    let conversion = ratio
        .convert(args.amount)
        .with_context(|| format!("cannot convert {} at {ratio}", args.amount))?;
    Ok(ConvertOutput {
        amount: args.amount,
        ratio,
        converted: conversion.converted,
        remainder: conversion.remainder,
    })
}

/// Execute the convert subcommand.
pub fn run_convert(args: &ConvertArgs, config: Option<&Path>) -> Result<u8> {
    let output = convert(args, config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(0)
}
