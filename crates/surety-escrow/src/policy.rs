//! # Insurance Policies
//!
//! One policy per (passenger, flight) pair at a time.
//!
//! ```text
//! ACTIVE ──credit──▶ CREDITED ──withdraw/pay──▶ PAID
//!   │  └──withdraw before resolution──▶ REFUNDED
//!   └──flight resolves uncovered──▶ EXPIRED
//! ```
//!
//! `ACTIVE` and `CREDITED` are outstanding. `PAID`, `REFUNDED`, and
//! `EXPIRED` are terminal.

use serde::{Deserialize, Serialize};
use surety_core::{Amount, FlightKey, LedgerAccount, Timestamp};

/// Identity of a policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyKey {
    /// The insured passenger.
    pub passenger: LedgerAccount,
    /// The insured flight.
    pub flight: FlightKey,
}

impl PolicyKey {
    /// Assemble a policy key.
    pub fn new(passenger: LedgerAccount, flight: FlightKey) -> Self {
        Self { passenger, flight }
    }
}

impl std::fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.passenger, self.flight)
    }
}

/// Lifecycle status of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    /// Premium held, flight unresolved or resolved without a credit yet.
    Active,
    /// Payout credited, awaiting withdrawal.
    Credited,
    /// Credit transferred to the passenger.
    Paid,
    /// Premium returned before the flight resolved.
    Refunded,
    /// Flight resolved without a covered delay; premium stays in the pool.
    Expired,
}

impl PolicyStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Refunded | Self::Expired)
    }

    /// Whether the policy still binds the escrow.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Active | Self::Credited)
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Credited => "CREDITED",
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passenger's insurance policy on one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    /// Policy identity.
    pub key: PolicyKey,
    /// Premium paid at purchase.
    pub premium: Amount,
    /// Payout owed once credited; zero otherwise.
    pub credit_owed: Amount,
    /// Lifecycle status.
    pub status: PolicyStatus,
    /// When the premium was paid.
    pub purchased_at: Timestamp,
    /// When the policy reached a terminal status.
    pub settled_at: Option<Timestamp>,
}

impl InsurancePolicy {
    /// A freshly purchased policy.
    pub fn purchase(key: PolicyKey, premium: Amount) -> Self {
        Self {
            key,
            premium,
            credit_owed: Amount::ZERO,
            status: PolicyStatus::Active,
            purchased_at: Timestamp::now(),
            settled_at: None,
        }
    }

    /// Whether the passenger already took money out of this policy.
    pub fn is_withdrawn(&self) -> bool {
        matches!(self.status, PolicyStatus::Paid | PolicyStatus::Refunded)
    }

    /// What the escrow owes on this policy right now: the premium while
    /// active, the credit once credited, nothing after settlement.
    pub fn liability(&self) -> Amount {
        match self.status {
            PolicyStatus::Active => self.premium,
            PolicyStatus::Credited => self.credit_owed,
            PolicyStatus::Paid | PolicyStatus::Refunded | PolicyStatus::Expired => Amount::ZERO,
        }
    }
}
