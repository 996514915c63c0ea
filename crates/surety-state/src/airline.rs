//! # Airline Admission Governance
//!
//! Tracks which airlines are admitted to the consortium, which have funded
//! themselves, and who voted for each pending candidate.
//!
//! ## Lifecycle
//!
//! ```text
//! (unknown) ──nominate──▶ PENDING ──majority vote──▶ ADMITTED
//!     │                                                 ▲
//!     └──────── nominate while bootstrapping ───────────┘
//! ```
//!
//! Funding is orthogonal to admission: an `ADMITTED` airline becomes funded
//! once it contributes at least the configured minimum. Only admitted and
//! funded airlines may nominate, vote, or register flights.
//!
//! ## Admission rule
//!
//! While fewer than `bootstrap_threshold` airlines are admitted, a
//! nomination admits the candidate immediately. After that, a candidate is
//! admitted once the number of distinct voters is strictly greater than half
//! of the airlines admitted at the time of the vote. The nominator's own
//! nomination counts as the first vote.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use surety_core::{Amount, LedgerAccount, LedgerError};

// ─── Admission State ─────────────────────────────────────────────────

/// Where an airline stands in the admission process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionState {
    /// Nominated, collecting votes.
    Pending,
    /// Member of the consortium (terminal).
    Admitted,
}

impl AdmissionState {
    /// Whether this state is terminal. Airlines are never removed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Admitted => "ADMITTED",
        }
    }
}

impl std::fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Airline ─────────────────────────────────────────────────────────

/// An airline known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    /// The airline's account.
    pub account: LedgerAccount,
    /// Admission state.
    pub state: AdmissionState,
    /// Total contributed funding. Non-zero exactly when funded.
    pub funding: Amount,
    /// Distinct airlines that voted to admit this one.
    pub votes: BTreeSet<LedgerAccount>,
    /// The airline that nominated this one; `None` for the founder.
    pub nominated_by: Option<LedgerAccount>,
}

impl Airline {
    /// Whether the airline is admitted.
    pub fn is_admitted(&self) -> bool {
        self.state == AdmissionState::Admitted
    }

    /// Whether the airline has contributed its funding.
    pub fn is_funded(&self) -> bool {
        !self.funding.is_zero()
    }

    /// Admitted and funded: allowed to nominate, vote, and register flights.
    pub fn is_active_member(&self) -> bool {
        self.is_admitted() && self.is_funded()
    }
}

/// Result of a nomination or vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// The candidate is now admitted.
    Admitted,
    /// The candidate is still collecting votes.
    Pending {
        /// Distinct votes recorded so far.
        votes: usize,
        /// Votes needed at the current membership size.
        required: usize,
    },
}

// ─── Registry ────────────────────────────────────────────────────────

/// Owned store of every airline and its votes.
#[derive(Debug, Clone)]
pub struct AirlineRegistry {
    airlines: BTreeMap<LedgerAccount, Airline>,
    bootstrap_threshold: usize,
}

impl AirlineRegistry {
    /// A registry whose founding airline is admitted (but not funded).
    pub fn with_founder(founder: LedgerAccount, bootstrap_threshold: usize) -> Self {
        let mut airlines = BTreeMap::new();
        airlines.insert(
            founder.clone(),
            Airline {
                account: founder,
                state: AdmissionState::Admitted,
                funding: Amount::ZERO,
                votes: BTreeSet::new(),
                nominated_by: None,
            },
        );
        Self {
            airlines,
            bootstrap_threshold,
        }
    }

    /// Look up an airline.
    pub fn get(&self, account: &LedgerAccount) -> Option<&Airline> {
        self.airlines.get(account)
    }

    /// Iterate over every known airline in account order.
    pub fn iter(&self) -> impl Iterator<Item = &Airline> {
        self.airlines.values()
    }

    /// Whether `account` is an admitted airline.
    pub fn is_admitted(&self, account: &LedgerAccount) -> bool {
        self.get(account).is_some_and(Airline::is_admitted)
    }

    /// Whether `account` is an admitted airline that has funded itself.
    pub fn is_funded(&self, account: &LedgerAccount) -> bool {
        self.get(account).is_some_and(Airline::is_active_member)
    }

    /// Number of admitted airlines.
    pub fn admitted_count(&self) -> usize {
        self.airlines.values().filter(|a| a.is_admitted()).count()
    }

    /// Votes recorded for `candidate`. Zero for unknown accounts.
    pub fn votes_for(&self, candidate: &LedgerAccount) -> usize {
        self.get(candidate).map_or(0, |a| a.votes.len())
    }

    /// Votes needed to admit a candidate at the current membership size:
    /// strictly more than half of the admitted airlines.
    pub fn required_votes(&self) -> usize {
        self.admitted_count() / 2 + 1
    }

    /// Whether the registry is still in the bootstrap phase.
    pub fn is_bootstrapping(&self) -> bool {
        self.admitted_count() < self.bootstrap_threshold
    }

    /// Fail with [`LedgerError::Unauthorized`] unless `caller` is admitted
    /// and funded.
    pub fn require_active_member(
        &self,
        caller: &LedgerAccount,
        operation: &str,
    ) -> Result<&Airline, LedgerError> {
        match self.get(caller) {
            Some(airline) if airline.is_active_member() => Ok(airline),
            Some(airline) if airline.is_admitted() => Err(LedgerError::unauthorized(
                caller,
                operation,
                "airline has not contributed its funding",
            )),
            _ => Err(LedgerError::unauthorized(
                caller,
                operation,
                "caller is not an admitted airline",
            )),
        }
    }

    /// Entry point for the public airline registration call.
    ///
    /// Nominates an unknown candidate; for a candidate that is already
    /// pending, records `caller`'s vote instead.
    pub fn register(
        &mut self,
        candidate: LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<AdmissionOutcome, LedgerError> {
        match self.get(&candidate).map(|a| a.state) {
            Some(AdmissionState::Pending) => self.vote(&candidate, caller),
            _ => self.nominate(candidate, caller),
        }
    }

    /// Nominate a new airline.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not admitted and funded.
    /// - [`LedgerError::AlreadyRegistered`] if `candidate` is already known.
    pub fn nominate(
        &mut self,
        candidate: LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<AdmissionOutcome, LedgerError> {
        self.require_active_member(caller, "nominate airline")?;
        if self.airlines.contains_key(&candidate) {
            return Err(LedgerError::already_registered("airline", &candidate));
        }

        let bootstrapping = self.is_bootstrapping();
        let required = self.required_votes();
        let votes = BTreeSet::from([caller.clone()]);
        let state = if bootstrapping || votes.len() >= required {
            AdmissionState::Admitted
        } else {
            AdmissionState::Pending
        };
        let outcome = match state {
            AdmissionState::Admitted => AdmissionOutcome::Admitted,
            AdmissionState::Pending => AdmissionOutcome::Pending {
                votes: votes.len(),
                required,
            },
        };
        self.airlines.insert(
            candidate.clone(),
            Airline {
                account: candidate,
                state,
                funding: Amount::ZERO,
                votes,
                nominated_by: Some(caller.clone()),
            },
        );
        Ok(outcome)
    }

    /// Vote to admit a pending candidate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not admitted and funded.
    /// - [`LedgerError::UnknownEntity`] if `candidate` was never nominated.
    /// - [`LedgerError::AlreadyRegistered`] if `candidate` is already
    ///   admitted or `caller` already voted for it.
    pub fn vote(
        &mut self,
        candidate: &LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<AdmissionOutcome, LedgerError> {
        self.require_active_member(caller, "vote for airline")?;
        let required = self.required_votes();
        let airline = self
            .airlines
            .get_mut(candidate)
            .ok_or_else(|| LedgerError::unknown("airline", candidate))?;
        if airline.is_admitted() {
            return Err(LedgerError::already_registered("airline", candidate));
        }
        if airline.votes.contains(caller) {
            return Err(LedgerError::already_registered(
                "airline vote",
                format!("{caller} -> {candidate}"),
            ));
        }

        airline.votes.insert(caller.clone());
        if airline.votes.len() >= required {
            airline.state = AdmissionState::Admitted;
            Ok(AdmissionOutcome::Admitted)
        } else {
            Ok(AdmissionOutcome::Pending {
                votes: airline.votes.len(),
                required,
            })
        }
    }

    /// Check that `caller` may fund itself with `amount`, without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not admitted.
    /// - [`LedgerError::AlreadyRegistered`] if `caller` is already funded.
    /// - [`LedgerError::InvalidAmount`] if `amount` is below `minimum`.
    pub fn check_funding(
        &self,
        caller: &LedgerAccount,
        amount: Amount,
        minimum: Amount,
    ) -> Result<(), LedgerError> {
        let airline = match self.get(caller) {
            Some(airline) if airline.is_admitted() => airline,
            _ => {
                return Err(LedgerError::unauthorized(
                    caller,
                    "fund airline",
                    "caller is not an admitted airline",
                ))
            }
        };
        if airline.is_funded() {
            return Err(LedgerError::already_registered("airline funding", caller));
        }
        if amount.is_zero() || amount < minimum {
            return Err(LedgerError::InvalidAmount {
                operation: "fund airline".into(),
                amount: amount.to_string(),
                reason: format!("below the minimum funding of {minimum}"),
            });
        }
        Ok(())
    }

    /// Mark `caller` funded with `amount`.
    ///
    /// The caller is responsible for depositing `amount` into the shared
    /// escrow balance in the same step.
    pub fn fund(
        &mut self,
        caller: &LedgerAccount,
        amount: Amount,
        minimum: Amount,
    ) -> Result<(), LedgerError> {
        self.check_funding(caller, amount, minimum)?;
        if let Some(airline) = self.airlines.get_mut(caller) {
            airline.funding = amount;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> LedgerAccount {
        LedgerAccount::new(s).unwrap()
    }

    fn min() -> Amount {
        Amount::units(10)
    }

    /// Founder plus `n - 1` more airlines, all admitted and funded.
    fn registry_with(n: usize) -> AirlineRegistry {
        let mut reg = AirlineRegistry::with_founder(acct("air-0"), 4);
        reg.fund(&acct("air-0"), min(), min()).unwrap();
        for i in 1..n {
            let name = acct(&format!("air-{i}"));
            let outcome = reg.nominate(name.clone(), &acct("air-0")).unwrap();
            if outcome != AdmissionOutcome::Admitted {
                for j in 1..i {
                    if reg.is_admitted(&name) {
                        break;
                    }
                    reg.vote(&name, &acct(&format!("air-{j}"))).unwrap();
                }
            }
            reg.fund(&name, min(), min()).unwrap();
        }
        reg
    }

    #[test]
    fn test_founder_admitted_but_unfunded() {
        let reg = AirlineRegistry::with_founder(acct("air-0"), 4);
        assert!(reg.is_admitted(&acct("air-0")));
        assert!(!reg.is_funded(&acct("air-0")));
        assert_eq!(reg.admitted_count(), 1);
    }

    #[test]
    fn test_unfunded_founder_cannot_nominate() {
        let mut reg = AirlineRegistry::with_founder(acct("air-0"), 4);
        let err = reg.nominate(acct("air-1"), &acct("air-0")).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(reg.get(&acct("air-1")).is_none());
    }

    #[test]
    fn test_bootstrap_admits_immediately() {
        let reg = registry_with(4);
        assert_eq!(reg.admitted_count(), 4);
        for i in 0..4 {
            assert!(reg.is_funded(&acct(&format!("air-{i}"))));
        }
    }

    #[test]
    fn test_fifth_airline_needs_majority() {
        let mut reg = registry_with(4);
        let candidate = acct("air-4");
        let outcome = reg.nominate(candidate.clone(), &acct("air-0")).unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Pending {
                votes: 1,
                required: 3
            }
        );
        assert!(!reg.is_admitted(&candidate));

        let outcome = reg.vote(&candidate, &acct("air-1")).unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Pending {
                votes: 2,
                required: 3
            }
        );
        assert_eq!(reg.vote(&candidate, &acct("air-2")).unwrap(), AdmissionOutcome::Admitted);
        assert!(reg.is_admitted(&candidate));
        assert!(!reg.is_funded(&candidate));
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let mut reg = registry_with(4);
        let candidate = acct("air-4");
        reg.nominate(candidate.clone(), &acct("air-0")).unwrap();
        let err = reg.vote(&candidate, &acct("air-0")).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered { .. }));
        assert_eq!(reg.votes_for(&candidate), 1);
    }

    #[test]
    fn test_vote_on_admitted_or_unknown_candidate() {
        let mut reg = registry_with(4);
        assert!(matches!(
            reg.vote(&acct("air-1"), &acct("air-0")),
            Err(LedgerError::AlreadyRegistered { .. })
        ));
        assert!(matches!(
            reg.vote(&acct("ghost"), &acct("air-0")),
            Err(LedgerError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_unfunded_member_cannot_vote() {
        let mut reg = registry_with(4);
        reg.nominate(acct("air-4"), &acct("air-0")).unwrap();
        reg.vote(&acct("air-4"), &acct("air-1")).unwrap();
        reg.vote(&acct("air-4"), &acct("air-2")).unwrap();
        reg.nominate(acct("air-5"), &acct("air-0")).unwrap();
        let err = reg.vote(&acct("air-5"), &acct("air-4")).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn test_register_dispatches_to_vote_for_pending() {
        let mut reg = registry_with(4);
        reg.register(acct("air-4"), &acct("air-0")).unwrap();
        reg.register(acct("air-4"), &acct("air-1")).unwrap();
        assert_eq!(reg.votes_for(&acct("air-4")), 2);
        assert_eq!(
            reg.register(acct("air-4"), &acct("air-3")).unwrap(),
            AdmissionOutcome::Admitted
        );
        assert!(matches!(
            reg.register(acct("air-4"), &acct("air-2")),
            Err(LedgerError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_funding_rules() {
        let mut reg = AirlineRegistry::with_founder(acct("air-0"), 4);
        let below = Amount::units(9);
        assert!(matches!(
            reg.fund(&acct("air-0"), below, min()),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(!reg.is_funded(&acct("air-0")));
        assert!(matches!(
            reg.fund(&acct("stranger"), min(), min()),
            Err(LedgerError::Unauthorized { .. })
        ));
        reg.fund(&acct("air-0"), min(), min()).unwrap();
        assert!(reg.is_funded(&acct("air-0")));
        assert!(matches!(
            reg.fund(&acct("air-0"), min(), min()),
            Err(LedgerError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_pending_candidate_cannot_fund() {
        let mut reg = registry_with(4);
        reg.nominate(acct("air-4"), &acct("air-0")).unwrap();
        assert!(matches!(
            reg.fund(&acct("air-4"), min(), min()),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_admission_state_display() {
        assert_eq!(AdmissionState::Pending.to_string(), "PENDING");
        assert!(AdmissionState::Admitted.is_terminal());
    }
}
