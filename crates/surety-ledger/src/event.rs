//! # Ledger Signals
//!
//! Every committed state change appends one or more [`LedgerEvent`]s to the
//! ledger's outbox, in commit order. External relays drain the outbox:
//! oracle workers watch for [`LedgerEvent::OracleRequest`], user interfaces
//! refresh on [`LedgerEvent::FlightStatusInfo`].
//!
//! Rejected operations emit nothing.

use serde::{Deserialize, Serialize};
use surety_core::{Amount, FlightCode, FlightKey, LedgerAccount, StatusCode, Timestamp};
use surety_escrow::PayoutKind;
use surety_state::StatusSource;

/// A signal emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The operational gate was opened or closed.
    OperationalStatusChanged {
        /// New mode.
        operational: bool,
    },
    /// An account may now write flight status directly.
    CallerAuthorized {
        /// The authorized account.
        account: LedgerAccount,
    },
    /// A direct-write authorization was revoked.
    CallerDeauthorized {
        /// The revoked account.
        account: LedgerAccount,
    },
    /// A new airline was nominated.
    AirlineNominated {
        /// The candidate.
        candidate: LedgerAccount,
        /// The nominating airline.
        nominator: LedgerAccount,
    },
    /// An airline voted for a pending candidate.
    AirlineVoted {
        /// The candidate.
        candidate: LedgerAccount,
        /// The voting airline.
        voter: LedgerAccount,
        /// Votes recorded so far.
        votes: usize,
    },
    /// A candidate joined the consortium.
    AirlineAdmitted {
        /// The admitted airline.
        airline: LedgerAccount,
    },
    /// An airline contributed its funding.
    AirlineFunded {
        /// The airline.
        airline: LedgerAccount,
        /// Contribution.
        amount: Amount,
    },
    /// A flight was registered.
    FlightRegistered {
        /// The flight.
        flight: FlightKey,
    },
    /// A passenger bought a policy.
    PolicyPurchased {
        /// The passenger.
        passenger: LedgerAccount,
        /// The insured flight.
        flight: FlightKey,
        /// Premium paid.
        premium: Amount,
    },
    /// Insurees of a delayed flight were credited.
    InsureesCredited {
        /// The flight.
        flight: FlightKey,
        /// Policies credited.
        policies: usize,
        /// Total credited.
        total: Amount,
    },
    /// Active policies expired after an uncovered resolution.
    PoliciesExpired {
        /// The flight.
        flight: FlightKey,
        /// Policies expired.
        policies: usize,
    },
    /// Funds left the escrow.
    PayoutSent {
        /// Recipient.
        recipient: LedgerAccount,
        /// Amount transferred.
        amount: Amount,
        /// Credit or refund.
        kind: PayoutKind,
    },
    /// An oracle registered.
    OracleRegistered {
        /// The oracle.
        oracle: LedgerAccount,
        /// Assigned indices.
        indices: Vec<u8>,
    },
    /// Oracles holding `index` should report the flight's status.
    OracleRequest {
        /// Index bucket.
        index: u8,
        /// Operating airline.
        airline: LedgerAccount,
        /// Flight code.
        flight: FlightCode,
        /// Scheduled departure.
        timestamp: Timestamp,
    },
    /// An oracle's response was accepted.
    OracleReport {
        /// Operating airline.
        airline: LedgerAccount,
        /// Flight code.
        flight: FlightCode,
        /// Scheduled departure.
        timestamp: Timestamp,
        /// Reported status.
        status: StatusCode,
        /// Reporting oracle.
        oracle: LedgerAccount,
    },
    /// A flight's status was finalized.
    FlightStatusInfo {
        /// Operating airline.
        airline: LedgerAccount,
        /// Flight code.
        flight: FlightCode,
        /// Scheduled departure.
        timestamp: Timestamp,
        /// Final status.
        status: StatusCode,
        /// Oracle quorum or direct write.
        source: StatusSource,
    },
}

impl LedgerEvent {
    /// Snake-case event name, as used in the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OperationalStatusChanged { .. } => "operational_status_changed",
            Self::CallerAuthorized { .. } => "caller_authorized",
            Self::CallerDeauthorized { .. } => "caller_deauthorized",
            Self::AirlineNominated { .. } => "airline_nominated",
            Self::AirlineVoted { .. } => "airline_voted",
            Self::AirlineAdmitted { .. } => "airline_admitted",
            Self::AirlineFunded { .. } => "airline_funded",
            Self::FlightRegistered { .. } => "flight_registered",
            Self::PolicyPurchased { .. } => "policy_purchased",
            Self::InsureesCredited { .. } => "insurees_credited",
            Self::PoliciesExpired { .. } => "policies_expired",
            Self::PayoutSent { .. } => "payout_sent",
            Self::OracleRegistered { .. } => "oracle_registered",
            Self::OracleRequest { .. } => "oracle_request",
            Self::OracleReport { .. } => "oracle_report",
            Self::FlightStatusInfo { .. } => "flight_status_info",
        }
    }

    pub(crate) fn oracle_request(index: u8, flight: &FlightKey) -> Self {
        Self::OracleRequest {
            index,
            airline: flight.airline.clone(),
            flight: flight.code,
            timestamp: flight.timestamp,
        }
    }
}
