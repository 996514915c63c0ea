//! # Operational Gate
//!
//! Process-wide on/off switch owned by a single administrative account.
//! Every mutating ledger entry point calls [`OperationalGate::require_operational`]
//! first; queries never consult the gate.
//!
//! The owner also maintains the set of authorized callers, the accounts
//! allowed to use the privileged direct status write.

use std::collections::BTreeSet;

use surety_core::{LedgerAccount, LedgerError};

/// The operational switch and its owner.
#[derive(Debug, Clone)]
pub struct OperationalGate {
    owner: LedgerAccount,
    operational: bool,
    authorized_callers: BTreeSet<LedgerAccount>,
}

impl OperationalGate {
    /// A gate owned by `owner`, initially operational.
    pub fn new(owner: LedgerAccount) -> Self {
        Self {
            owner,
            operational: true,
            authorized_callers: BTreeSet::new(),
        }
    }

    /// The administrative owner.
    pub fn owner(&self) -> &LedgerAccount {
        &self.owner
    }

    /// Whether mutating operations are currently accepted.
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Open or close the gate.
    ///
    /// Returns whether the mode actually changed. Setting the current mode
    /// again is accepted as a no-op.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] unless `caller` is the owner. The owner
    /// may always flip the gate, including while it is closed.
    pub fn set_operational(
        &mut self,
        mode: bool,
        caller: &LedgerAccount,
    ) -> Result<bool, LedgerError> {
        self.require_owner(caller, "set operating status")?;
        let changed = self.operational != mode;
        self.operational = mode;
        Ok(changed)
    }

    /// Fail fast with [`LedgerError::NotOperational`] while the gate is closed.
    pub fn require_operational(&self, operation: &str) -> Result<(), LedgerError> {
        if self.operational {
            Ok(())
        } else {
            Err(LedgerError::NotOperational {
                operation: operation.to_string(),
            })
        }
    }

    /// Fail with [`LedgerError::Unauthorized`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: &LedgerAccount, operation: &str) -> Result<(), LedgerError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(LedgerError::unauthorized(
                caller,
                operation,
                "only the ledger owner may do this",
            ))
        }
    }

    /// Grant `account` the privileged direct status write. Owner only.
    pub fn authorize_caller(
        &mut self,
        account: LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<bool, LedgerError> {
        self.require_owner(caller, "authorize caller")?;
        Ok(self.authorized_callers.insert(account))
    }

    /// Revoke a previous authorization. Owner only.
    pub fn deauthorize_caller(
        &mut self,
        account: &LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<bool, LedgerError> {
        self.require_owner(caller, "deauthorize caller")?;
        Ok(self.authorized_callers.remove(account))
    }

    /// Whether `account` may write flight status directly.
    ///
    /// The owner is always authorized.
    pub fn is_authorized(&self, account: &LedgerAccount) -> bool {
        *account == self.owner || self.authorized_callers.contains(account)
    }
}
