//! # Flight Status Codes — Single Source of Truth
//!
//! Defines [`StatusCode`], the six flight status codes oracles report and the
//! flight registry stores. This is the one definition used across the ledger;
//! every `match` on it is exhaustive.
//!
//! On the wire a status is its numeric code (`0`, `10`, ... `50`), the value
//! external oracle workers submit.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Flight status as resolved by the oracle swarm.
///
/// | Code | Variant | Delay? |
/// |------|---------|--------|
/// |  0 | Unknown | no |
/// | 10 | OnTime | no |
/// | 20 | LateAirline | yes |
/// | 30 | LateWeather | yes |
/// | 40 | LateTechnical | yes |
/// | 50 | LateOther | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum StatusCode {
    /// Not yet resolved.
    Unknown = 0,
    /// Departed on schedule.
    OnTime = 10,
    /// Late for a reason attributable to the airline.
    LateAirline = 20,
    /// Late because of weather.
    LateWeather = 30,
    /// Late because of a technical fault.
    LateTechnical = 40,
    /// Late for any other reason.
    LateOther = 50,
}

/// Number of status codes.
pub const STATUS_CODE_COUNT: usize = 6;

impl StatusCode {
    /// All status codes in ascending numeric order.
    pub fn all() -> &'static [StatusCode] {
        &[
            Self::Unknown,
            Self::OnTime,
            Self::LateAirline,
            Self::LateWeather,
            Self::LateTechnical,
            Self::LateOther,
        ]
    }

    /// The four delay codes.
    pub fn delays() -> &'static [StatusCode] {
        &[
            Self::LateAirline,
            Self::LateWeather,
            Self::LateTechnical,
            Self::LateOther,
        ]
    }

    /// Numeric wire code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a numeric wire code.
    pub fn from_code(code: u8) -> Result<Self, ValidationError> {
        match code {
            0 => Ok(Self::Unknown),
            10 => Ok(Self::OnTime),
            20 => Ok(Self::LateAirline),
            30 => Ok(Self::LateWeather),
            40 => Ok(Self::LateTechnical),
            50 => Ok(Self::LateOther),
            other => Err(ValidationError::InvalidStatusCode(other.to_string())),
        }
    }

    /// Whether this code denotes a delay.
    pub fn is_delay(&self) -> bool {
        matches!(
            self,
            Self::LateAirline | Self::LateWeather | Self::LateTechnical | Self::LateOther
        )
    }

    /// Whether this is a resolved status (anything but `Unknown`).
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::OnTime => "on_time",
            Self::LateAirline => "late_airline",
            Self::LateWeather => "late_weather",
            Self::LateTechnical => "late_technical",
            Self::LateOther => "late_other",
        }
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = ValidationError;

    /// Parse either the snake_case name or the numeric wire code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code);
        }
        Self::all()
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ValidationError::InvalidStatusCode(s.to_string()))
    }
}
