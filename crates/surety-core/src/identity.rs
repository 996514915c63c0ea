//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers that flow through the ledger.
//! Each identifier is a distinct type: a [`FlightCode`] cannot be passed where
//! a [`LedgerAccount`] is expected.
//!
//! ## Validation
//!
//! Both string-backed identifiers validate their format at construction.
//! [`FlightCode`] is stored as the fixed-length, zero-padded byte encoding the
//! outer layers exchange on the wire; its textual form is recovered from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::temporal::Timestamp;

// ---------------------------------------------------------------------------
// LedgerAccount
// ---------------------------------------------------------------------------

/// Maximum length of a ledger account identifier.
pub const ACCOUNT_MAX_LEN: usize = 64;

/// An authenticated caller identity.
///
/// The core never inspects an account beyond equality and ordering; it is the
/// opaque "who" of every operation. Airlines, passengers, oracles, and the
/// administrative owner are all plain ledger accounts.
///
/// # Validation
///
/// - 1 to 64 characters
/// - ASCII alphanumerics plus `_`, `.`, `:`, `-` (covers `0x`-prefixed hex addresses)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAccount(String);

impl LedgerAccount {
    /// Create an account identifier, validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAccount`] for empty, overlong, or
    /// non-conforming input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-');
        if s.is_empty() || s.len() > ACCOUNT_MAX_LEN || !s.chars().all(valid_char) {
            return Err(ValidationError::InvalidAccount(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LedgerAccount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LedgerAccount> for String {
    fn from(account: LedgerAccount) -> Self {
        account.0
    }
}

impl std::str::FromStr for LedgerAccount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for LedgerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FlightCode
// ---------------------------------------------------------------------------

/// Width of the fixed-length flight code encoding.
pub const FLIGHT_CODE_LEN: usize = 10;

/// A short alphanumeric flight designator such as `ND139`.
///
/// Stored as a zero-padded `[u8; 10]`, the fixed-length byte encoding used at
/// the ledger boundary. Serializes as its textual form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightCode([u8; FLIGHT_CODE_LEN]);

impl FlightCode {
    /// Parse a flight code from text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFlightCode`] unless the input is
    /// 1 to 10 ASCII alphanumeric characters.
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        if value.is_empty()
            || value.len() > FLIGHT_CODE_LEN
            || !value.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidFlightCode(value.to_string()));
        }
        let mut bytes = [0u8; FLIGHT_CODE_LEN];
        bytes[..value.len()].copy_from_slice(value.as_bytes());
        Ok(Self(bytes))
    }

    /// Decode a flight code from its fixed-length encoding.
    ///
    /// Trailing zero bytes are padding. A zero byte followed by a non-zero
    /// byte is rejected, as is an all-zero encoding.
    pub fn from_fixed_bytes(bytes: [u8; FLIGHT_CODE_LEN]) -> Result<Self, ValidationError> {
        let len = bytes.iter().position(|b| *b == 0).unwrap_or(FLIGHT_CODE_LEN);
        let text = String::from_utf8_lossy(&bytes[..len]).into_owned();
        if bytes[len..].iter().any(|b| *b != 0) {
            return Err(ValidationError::InvalidFlightCode(format!("{bytes:?}")));
        }
        Self::new(&text)
    }

    /// The fixed-length, zero-padded encoding.
    pub fn to_fixed_bytes(&self) -> [u8; FLIGHT_CODE_LEN] {
        self.0
    }

    /// The textual flight designator.
    pub fn as_str(&self) -> &str {
        let len = self
            .0
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(FLIGHT_CODE_LEN);
        // Constructed only from ASCII alphanumerics.
        std::str::from_utf8(&self.0[..len]).unwrap_or_default()
    }
}

impl std::fmt::Debug for FlightCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FlightCode").field(&self.as_str()).finish()
    }
}

impl std::fmt::Display for FlightCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlightCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for FlightCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlightCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// FlightKey
// ---------------------------------------------------------------------------

/// The identity of a scheduled flight: owning airline, code, departure time.
///
/// Two registrations with the same code but different departure timestamps
/// are different flights.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    /// The airline that registered the flight.
    pub airline: LedgerAccount,
    /// The flight designator.
    pub code: FlightCode,
    /// Scheduled departure.
    pub timestamp: Timestamp,
}

impl FlightKey {
    /// Assemble a flight key.
    pub fn new(airline: LedgerAccount, code: FlightCode, timestamp: Timestamp) -> Self {
        Self {
            airline,
            code,
            timestamp,
        }
    }
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.airline,
            self.code,
            self.timestamp.epoch_secs()
        )
    }
}
