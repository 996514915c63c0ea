//! # Error Hierarchy
//!
//! Structured error types for the flight-surety ledger, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! [`LedgerError`] is the taxonomy every mutating ledger operation reports
//! synchronously to its caller. Nothing is retried internally. Each variant
//! carries enough context (caller, entity, operation) for the outer layers to
//! explain the rejection without inspecting ledger state.
//!
//! "Insufficient quorum" is deliberately absent: a request that has not yet
//! gathered enough matching responses is a normal state, reported through the
//! submission outcome rather than as a failure.

use thiserror::Error;

/// Errors returned by ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The operational gate is closed; all mutating entry points are disabled.
    #[error("ledger is not operational: {operation} rejected")]
    NotOperational {
        /// The rejected operation.
        operation: String,
    },

    /// The caller lacks the role, admission, or funding the operation requires.
    #[error("caller {caller} is not authorized to {operation}: {reason}")]
    Unauthorized {
        /// The calling account.
        caller: String,
        /// The attempted operation.
        operation: String,
        /// Why the caller was rejected.
        reason: String,
    },

    /// Funding below the minimum, purchase above the cap, or a zero amount.
    #[error("invalid amount {amount} for {operation}: {reason}")]
    InvalidAmount {
        /// The attempted operation.
        operation: String,
        /// The offending amount, in smallest units.
        amount: String,
        /// The violated bound.
        reason: String,
    },

    /// An outstanding policy already exists for this (passenger, flight) pair.
    #[error("passenger {passenger} already holds an outstanding policy on flight {flight}")]
    DuplicatePurchase {
        /// The purchasing passenger.
        passenger: String,
        /// The insured flight.
        flight: String,
    },

    /// Reference to a flight, airline, request, oracle, or policy that does not exist.
    #[error("unknown {kind}: {id}")]
    UnknownEntity {
        /// Entity kind (e.g. "flight", "oracle request").
        kind: String,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// The referenced flight or oracle request is already finalized.
    #[error("{kind} {id} is already resolved")]
    AlreadyResolved {
        /// Entity kind.
        kind: String,
        /// Identifier of the finalized entity.
        id: String,
    },

    /// The entity is already registered (or already admitted).
    #[error("{kind} {id} is already registered")]
    AlreadyRegistered {
        /// Entity kind.
        kind: String,
        /// Identifier of the existing entity.
        id: String,
    },

    /// No refundable premium or credited payout is available.
    #[error("nothing owed to {account}: {reason}")]
    NothingOwed {
        /// The account that asked to be paid.
        account: String,
        /// Why nothing is payable.
        reason: String,
    },

    /// A purchase or credit would leave escrow liabilities above the funds held.
    #[error("escrow cannot cover {required}: only {available} available")]
    InsufficientEscrow {
        /// Liabilities after the attempted purchase or credit.
        required: String,
        /// Total funds held in escrow.
        available: String,
    },

    /// The external payout rail refused the transfer; the payout was rolled back.
    #[error("transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        /// Intended recipient.
        recipient: String,
        /// Amount that was not transferred.
        amount: String,
        /// Reason reported by the rail.
        reason: String,
    },

    /// An amount computation overflowed.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(String),

    /// Malformed identifier or domain primitive.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Oracle index seed material could not be canonicalized.
    #[error("index derivation failed: {0}")]
    IndexDerivation(String),
}

impl From<CanonicalizationError> for LedgerError {
    fn from(err: CanonicalizationError) -> Self {
        Self::IndexDerivation(err.to_string())
    }
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use string or integer for amounts: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// Carry the rejected input and the expected format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Ledger account identifier is empty, too long, or has illegal characters.
    #[error("invalid ledger account: \"{0}\" (expected 1-64 characters of [A-Za-z0-9_.:-])")]
    InvalidAccount(String),

    /// Flight code is empty, too long, or not alphanumeric.
    #[error("invalid flight code: \"{0}\" (expected 1-10 ASCII alphanumeric characters)")]
    InvalidFlightCode(String),

    /// Status code value is not one of the six known codes.
    #[error("invalid flight status code: {0} (expected 0, 10, 20, 30, 40, or 50)")]
    InvalidStatusCode(String),

    /// Amount string is not a non-negative integer.
    #[error("invalid amount: \"{0}\" (expected a non-negative integer in smallest units)")]
    InvalidAmount(String),

    /// Timestamp is outside the representable range or not RFC 3339.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The value that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors loading or validating a [`LedgerConfig`](crate::LedgerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML (or JSON, a YAML subset) could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An environment override held an unparseable value.
    #[error("invalid value for {var}: \"{value}\"")]
    InvalidEnv {
        /// Environment variable name.
        var: String,
        /// The rejected value.
        value: String,
    },

    /// The configuration parsed but violates a consistency rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl LedgerError {
    /// Shorthand for an [`LedgerError::Unauthorized`] rejection.
    pub fn unauthorized(
        caller: impl std::fmt::Display,
        operation: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unauthorized {
            caller: caller.to_string(),
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`LedgerError::UnknownEntity`] rejection.
    pub fn unknown(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::UnknownEntity {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for an [`LedgerError::AlreadyRegistered`] rejection.
    pub fn already_registered(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::AlreadyRegistered {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for an [`LedgerError::AlreadyResolved`] rejection.
    pub fn already_resolved(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::AlreadyResolved {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}
