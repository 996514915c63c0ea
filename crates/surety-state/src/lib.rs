//! # surety-state — Ledger Stores and State Machines
//!
//! Each component owns its state outright; the coordinator in
//! `surety-ledger` holds one of each and passes references between them
//! for cross-component checks. There is no shared mutable state.
//!
//! ## Components
//!
//! - **Gate** (`gate.rs`): the owner-controlled operational switch and the
//!   authorized-caller set for direct status writes.
//!
//! - **Airline** (`airline.rs`): admission by bootstrap or majority vote,
//!   and airline funding.
//!
//! - **Flight** (`flight.rs`): registered flights and their first-write-wins
//!   status.
//!
//! - **Oracle** (`oracle.rs`): oracle registration, index buckets, and the
//!   `OPEN → RESOLVING → RESOLVED` request machine.
//!
//! - **Entropy** (`entropy.rs`): the injectable [`IndexSource`] used to
//!   derive oracle and request indices.
//!
//! Operations validate everything before mutating, so a returned error
//! always means nothing changed.

pub mod airline;
pub mod entropy;
pub mod flight;
pub mod gate;
pub mod oracle;

// ─── Airline re-exports ─────────────────────────────────────────────

pub use airline::{AdmissionOutcome, AdmissionState, Airline, AirlineRegistry};

// ─── Flight re-exports ──────────────────────────────────────────────

pub use flight::{Flight, FlightRegistry, StatusApplication, StatusSource};

// ─── Gate re-exports ────────────────────────────────────────────────

pub use gate::OperationalGate;

// ─── Oracle re-exports ──────────────────────────────────────────────

pub use entropy::{DigestIndexSource, FixedIndexSource, IndexSource};
pub use oracle::{
    OracleRegistry, OracleRequest, OracleWorker, RequestKey, RequestOpening, RequestState,
    SubmissionOutcome,
};
