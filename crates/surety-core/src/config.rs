//! Ledger configuration.
//!
//! Every economic and protocol constant of the ledger lives here. Defaults
//! reproduce the reference deployment: 10-unit airline funding, 1-unit
//! insurance cap, 1.5x payout, 1-unit oracle stake, quorum of 3, three
//! distinct indices per oracle drawn from `0..10`, and admission by majority
//! vote once four airlines are admitted.
//!
//! Load from YAML (or JSON) with [`LedgerConfig::from_path`], or overlay
//! `SURETY_*` environment variables on the defaults with
//! [`LedgerConfig::from_env`]. Every loader runs [`LedgerConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::domain::StatusCode;
use crate::error::ConfigError;

/// What happens to an oracle response submitted after its request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateResponsePolicy {
    /// Accept and record the response; the finalized status never changes.
    Record,
    /// Reject with `AlreadyResolved`.
    Reject,
}

impl std::str::FromStr for LateResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record" => Ok(Self::Record),
            "reject" => Ok(Self::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Ledger-wide constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Minimum contribution for an admitted airline to become funded.
    pub min_airline_funding: Amount,
    /// Maximum premium per policy.
    pub insurance_cap: Amount,
    /// Payout multiplier numerator.
    pub payout_numerator: u64,
    /// Payout multiplier denominator.
    pub payout_denominator: u64,
    /// Minimum stake to register an oracle.
    pub oracle_registration_fee: Amount,
    /// Matching responses needed to resolve a request.
    pub oracle_quorum: usize,
    /// Distinct indices assigned to each oracle.
    pub indices_per_oracle: usize,
    /// Indices are drawn from `0..index_space`.
    pub index_space: u16,
    /// Below this many admitted airlines, nominations admit immediately.
    pub bootstrap_airline_count: usize,
    /// Statuses that entitle insurees to a payout.
    pub covered_statuses: Vec<StatusCode>,
    /// Whether a passenger may buy again after withdrawing a policy.
    pub repurchase_after_withdrawal: bool,
    /// Treatment of responses arriving after resolution.
    pub late_response_policy: LateResponsePolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_airline_funding: Amount::units(10),
            insurance_cap: Amount::units(1),
            payout_numerator: 3,
            payout_denominator: 2,
            oracle_registration_fee: Amount::units(1),
            oracle_quorum: 3,
            indices_per_oracle: 3,
            index_space: 10,
            bootstrap_airline_count: 4,
            covered_statuses: StatusCode::delays().to_vec(),
            repurchase_after_withdrawal: false,
            late_response_policy: LateResponsePolicy::Record,
        }
    }
}

impl LedgerConfig {
    /// Parse from a YAML (or JSON) document and validate.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML (or JSON) file.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Defaults overlaid with `SURETY_*` environment variables.
    ///
    /// Variables:
    /// - `SURETY_MIN_AIRLINE_FUNDING`, `SURETY_INSURANCE_CAP`,
    ///   `SURETY_ORACLE_REGISTRATION_FEE` (smallest units)
    /// - `SURETY_PAYOUT_NUMERATOR`, `SURETY_PAYOUT_DENOMINATOR`
    /// - `SURETY_ORACLE_QUORUM`, `SURETY_INDICES_PER_ORACLE`, `SURETY_INDEX_SPACE`
    /// - `SURETY_BOOTSTRAP_AIRLINE_COUNT`
    /// - `SURETY_REPURCHASE_AFTER_WITHDRAWAL` (`true`/`false`)
    /// - `SURETY_LATE_RESPONSE_POLICY` (`record`/`reject`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with values from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        overlay(&lookup, "SURETY_MIN_AIRLINE_FUNDING", &mut config.min_airline_funding)?;
        overlay(&lookup, "SURETY_INSURANCE_CAP", &mut config.insurance_cap)?;
        overlay(&lookup, "SURETY_PAYOUT_NUMERATOR", &mut config.payout_numerator)?;
        overlay(&lookup, "SURETY_PAYOUT_DENOMINATOR", &mut config.payout_denominator)?;
        overlay(
            &lookup,
            "SURETY_ORACLE_REGISTRATION_FEE",
            &mut config.oracle_registration_fee,
        )?;
        overlay(&lookup, "SURETY_ORACLE_QUORUM", &mut config.oracle_quorum)?;
        overlay(&lookup, "SURETY_INDICES_PER_ORACLE", &mut config.indices_per_oracle)?;
        overlay(&lookup, "SURETY_INDEX_SPACE", &mut config.index_space)?;
        overlay(
            &lookup,
            "SURETY_BOOTSTRAP_AIRLINE_COUNT",
            &mut config.bootstrap_airline_count,
        )?;
        overlay(
            &lookup,
            "SURETY_REPURCHASE_AFTER_WITHDRAWAL",
            &mut config.repurchase_after_withdrawal,
        )?;
        overlay(
            &lookup,
            "SURETY_LATE_RESPONSE_POLICY",
            &mut config.late_response_policy,
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle_quorum == 0 {
            return Err(ConfigError::Invalid("oracle_quorum must be at least 1".into()));
        }
        if self.payout_denominator == 0 {
            return Err(ConfigError::Invalid("payout_denominator must be non-zero".into()));
        }
        if self.payout_numerator < self.payout_denominator {
            return Err(ConfigError::Invalid(
                "payout multiplier must be at least 1x".into(),
            ));
        }
        if self.index_space == 0 || self.index_space > 256 {
            return Err(ConfigError::Invalid(
                "index_space must be between 1 and 256".into(),
            ));
        }
        if self.indices_per_oracle == 0 || self.indices_per_oracle > usize::from(self.index_space) {
            return Err(ConfigError::Invalid(format!(
                "indices_per_oracle must be between 1 and index_space ({})",
                self.index_space
            )));
        }
        if self.insurance_cap.is_zero() {
            return Err(ConfigError::Invalid("insurance_cap must be non-zero".into()));
        }
        if self.covered_statuses.iter().any(|s| !s.is_delay()) {
            return Err(ConfigError::Invalid(
                "covered_statuses may only contain delay codes".into(),
            ));
        }
        Ok(())
    }

    /// Whether a resolved status entitles insurees to a payout.
    pub fn is_covered(&self, status: StatusCode) -> bool {
        self.covered_statuses.contains(&status)
    }
}

fn overlay<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(var) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}
