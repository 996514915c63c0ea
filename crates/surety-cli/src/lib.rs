//! # surety-cli — Flight-Surety Ledger Command-Line Interface
//!
//! Runs the ledger in-process. There is no network surface: a session is a
//! script of operations, and everything the ledger emits is printed as JSON.
//!
//! ## Subcommands
//!
//! - `surety config` — Print the effective configuration.
//! - `surety replay` — Execute a scripted session and report every outcome
//!   and signal.
//!
//! ```bash
//! surety config --format json
//! surety --config ledger.yaml replay session.yaml --out report.json
//! ```

pub mod config;
pub mod replay;

use std::path::Path;

use anyhow::{Context, Result};
use surety_core::LedgerConfig;

/// Load the ledger configuration.
///
/// Reads `path` when given, otherwise overlays `SURETY_*` environment
/// variables on the defaults.
pub fn load_config(path: Option<&Path>) -> Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::from_path(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => LedgerConfig::from_env().context("failed to load config from environment"),
    }
}
