//! # Config Subcommand
//!
//! Prints the configuration a ledger would be built with, after file
//! loading, environment overlays, and validation.

use anyhow::Result;
use clap::{Args, ValueEnum};
use surety_core::LedgerConfig;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Arguments for the `surety config` subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output format.
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs, config: &LedgerConfig) -> Result<u8> {
    println!("{}", render(config, args.format)?);
    Ok(0)
}

fn render(config: &LedgerConfig, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
    })
}
