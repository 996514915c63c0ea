//! # External Payout Rail
//!
//! The only place value leaves the escrow. The escrow zeroes what it owes
//! before calling [`PayoutRail::transfer`] and restores it if the rail
//! refuses, so a rail can never observe (or re-enter) a half-paid policy.

use std::collections::{BTreeMap, BTreeSet};

use surety_core::{Amount, LedgerAccount};
use thiserror::Error;

/// A transfer the rail refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct RailError {
    /// Why the transfer was refused.
    pub reason: String,
}

impl RailError {
    /// A refusal with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Moves funds from the escrow to an account's external balance.
pub trait PayoutRail: std::fmt::Debug + Send {
    /// Credit `amount` to `recipient`.
    fn transfer(&mut self, recipient: &LedgerAccount, amount: Amount) -> Result<(), RailError>;
}

/// In-process rail that keeps external balances in a map.
///
/// Accounts can be frozen to make transfers to them fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRail {
    balances: BTreeMap<LedgerAccount, Amount>,
    frozen: BTreeSet<LedgerAccount>,
}

impl InMemoryRail {
    /// An empty rail.
    pub fn new() -> Self {
        Self::default()
    }

    /// External balance received by `account`.
    pub fn balance_of(&self, account: &LedgerAccount) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Refuse every future transfer to `account`.
    pub fn freeze(&mut self, account: LedgerAccount) {
        self.frozen.insert(account);
    }

    /// Accept transfers to `account` again.
    pub fn unfreeze(&mut self, account: &LedgerAccount) {
        self.frozen.remove(account);
    }

    /// Sum of every balance paid out.
    pub fn total_paid(&self) -> Option<Amount> {
        Amount::checked_sum(self.balances.values().copied())
    }
}

impl PayoutRail for InMemoryRail {
    fn transfer(&mut self, recipient: &LedgerAccount, amount: Amount) -> Result<(), RailError> {
        if self.frozen.contains(recipient) {
            return Err(RailError::new(format!("account {recipient} is frozen")));
        }
        let balance = self.balances.entry(recipient.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| RailError::new("recipient balance overflow"))?;
        Ok(())
    }
}
