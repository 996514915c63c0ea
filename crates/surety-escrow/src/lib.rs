//! # surety-escrow — Insurance Escrow
//!
//! Holds passenger premiums and airline funding in one pool, tracks each
//! passenger's policy from purchase to settlement, and pays out through an
//! external [`PayoutRail`].
//!
//! ## Modules
//!
//! - **Policy** (`policy.rs`): [`InsurancePolicy`] and its status machine.
//! - **Escrow** (`escrow.rs`): [`InsuranceEscrow`], credit plans, payouts,
//!   and the transaction history.
//! - **Payout** (`payout.rs`): the [`PayoutRail`] seam and an in-memory rail.
//!
//! ## Payout ordering
//!
//! Every transfer follows checks, then effects, then the external call:
//! the owed amount is zeroed and the pool debited before
//! [`PayoutRail::transfer`] runs, and both are restored if it fails.

pub mod escrow;
pub mod payout;
pub mod policy;

pub use escrow::{CreditPlan, EscrowTransaction, InsuranceEscrow, Payout, PayoutKind, TransactionType};
pub use payout::{InMemoryRail, PayoutRail, RailError};
pub use policy::{InsurancePolicy, PolicyKey, PolicyStatus};
