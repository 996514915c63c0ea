//! # Flight Registry
//!
//! Flights registered by funded airlines, keyed by (airline, code,
//! scheduled departure). A flight starts `Unknown` and is resolved exactly
//! once, either by oracle consensus or by a privileged direct write. Later
//! status applications are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use surety_core::{FlightKey, LedgerAccount, LedgerError, StatusCode};

use crate::airline::AirlineRegistry;

/// How a flight's final status was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// A quorum of oracles agreed.
    OracleQuorum,
    /// An authorized caller wrote the status directly.
    DirectWrite,
}

/// A registered flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Identity of the flight.
    pub key: FlightKey,
    /// Current status; `Unknown` until resolved.
    pub status: StatusCode,
    /// Set together with the first resolved status.
    pub resolved_by: Option<StatusSource>,
}

impl Flight {
    /// Whether a final status has been applied.
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }
}

/// Result of [`FlightRegistry::apply_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusApplication {
    /// The flight moved from `Unknown` to the given status.
    Applied(StatusCode),
    /// The flight keeps its current status.
    Ignored {
        /// Status the flight already had.
        current: StatusCode,
    },
}

/// Owned store of registered flights.
#[derive(Debug, Clone, Default)]
pub struct FlightRegistry {
    flights: BTreeMap<FlightKey, Flight>,
}

impl FlightRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `caller` may register `key`, without changing anything.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the flight's airline
    ///   or the airline is not admitted and funded.
    /// - [`LedgerError::AlreadyRegistered`] for an identical key.
    pub fn check_registration(
        &self,
        key: &FlightKey,
        caller: &LedgerAccount,
        airlines: &AirlineRegistry,
    ) -> Result<(), LedgerError> {
        if *caller != key.airline {
            return Err(LedgerError::unauthorized(
                caller,
                "register flight",
                "only the operating airline may register its flights",
            ));
        }
        airlines.require_active_member(caller, "register flight")?;
        if self.flights.contains_key(key) {
            return Err(LedgerError::already_registered("flight", key));
        }
        Ok(())
    }

    /// Register a flight with status `Unknown`.
    pub fn register(
        &mut self,
        key: FlightKey,
        caller: &LedgerAccount,
        airlines: &AirlineRegistry,
    ) -> Result<&Flight, LedgerError> {
        self.check_registration(&key, caller, airlines)?;
        let flight = Flight {
            key: key.clone(),
            status: StatusCode::Unknown,
            resolved_by: None,
        };
        Ok(self.flights.entry(key).or_insert(flight))
    }

    /// Look up a flight.
    pub fn get(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// Look up a flight or fail with [`LedgerError::UnknownEntity`].
    pub fn require(&self, key: &FlightKey) -> Result<&Flight, LedgerError> {
        self.get(key).ok_or_else(|| LedgerError::unknown("flight", key))
    }

    /// Current status of a flight.
    pub fn status(&self, key: &FlightKey) -> Option<StatusCode> {
        self.get(key).map(|f| f.status)
    }

    /// Whether `key` is registered.
    pub fn is_registered(&self, key: &FlightKey) -> bool {
        self.flights.contains_key(key)
    }

    /// Flights registered by `airline`, in key order.
    pub fn flights_of<'a>(&'a self, airline: &'a LedgerAccount) -> impl Iterator<Item = &'a Flight> {
        self.flights.values().filter(move |f| f.key.airline == *airline)
    }

    /// Number of registered flights.
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether no flights are registered.
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Apply a status to a flight.
    ///
    /// Only the first transition away from `Unknown` takes effect. Applying
    /// `Unknown`, or any status to an already resolved flight, is ignored.
    ///
    /// Authorization is the caller's concern: this is reached only from the
    /// oracle finalization path or the privileged direct write.
    pub fn apply_status(
        &mut self,
        key: &FlightKey,
        status: StatusCode,
        source: StatusSource,
    ) -> Result<StatusApplication, LedgerError> {
        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| LedgerError::unknown("flight", key))?;
        if flight.is_resolved() || !status.is_resolved() {
            return Ok(StatusApplication::Ignored {
                current: flight.status,
            });
        }
        flight.status = status;
        flight.resolved_by = Some(source);
        Ok(StatusApplication::Applied(status))
    }
}
