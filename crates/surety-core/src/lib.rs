//! # surety-core — Foundational Types for the Flight-Surety Ledger
//!
//! Every other crate in the workspace depends on `surety-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`LedgerAccount`],
//!    [`FlightCode`], [`Amount`], [`Timestamp`] validate at construction. No
//!    bare strings or integers cross crate boundaries.
//!
//! 2. **Single [`StatusCode`] enum.** One definition of the six flight
//!    statuses, exhaustive `match` everywhere.
//!
//! 3. **[`CanonicalBytes`] is the sole path to digests.** Oracle index
//!    derivation hashes canonical JSON, never ad-hoc byte concatenation.
//!
//! 4. **[`LedgerError`] taxonomy.** Every rejection is a structured variant;
//!    nothing is logged or retried at this layer.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `surety-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod config;
pub mod digest;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::Amount;
pub use canonical::CanonicalBytes;
pub use config::{LateResponsePolicy, LedgerConfig};
pub use digest::{sha256_digest, ContentDigest};
pub use domain::{StatusCode, STATUS_CODE_COUNT};
pub use error::{CanonicalizationError, ConfigError, LedgerError, ValidationError};
pub use identity::{FlightCode, FlightKey, LedgerAccount, FLIGHT_CODE_LEN};
pub use temporal::Timestamp;
