//! # surety-ledger — Flight-Surety Ledger Coordinator
//!
//! The single entry point for every ledger operation. Owns the gate, the
//! airline and flight registries, the insurance escrow, and the oracle
//! registry, and sequences the effects that cross them.
//!
//! ## Serialization
//!
//! Operations take `&mut self` and run to completion one at a time. Each
//! either commits every effect or returns an error having changed nothing.
//! Embedders that share a ledger across threads wrap it in a mutex.
//!
//! ## Signals
//!
//! Committed operations append [`LedgerEvent`]s to an outbox drained with
//! [`FlightSuretyLedger::drain_events`].

pub mod event;
pub mod ledger;

pub use event::LedgerEvent;
pub use ledger::FlightSuretyLedger;
