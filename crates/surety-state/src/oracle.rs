//! # Oracle Registration and Quorum Resolution
//!
//! Oracle workers stake to register and receive a small set of index buckets.
//! A status request for a flight is opened at one bucket; only oracles
//! holding that bucket may answer it.
//!
//! ## Request lifecycle
//!
//! ```text
//! OPEN ──first response──▶ RESOLVING ──quorum on one code──▶ RESOLVED
//!   └──────────── quorum of 1 ─────────────────────────────────▲
//! ```
//!
//! Each oracle counts once per request, whatever code it reports. The
//! quorum test only looks at the size of each code's supporter set, so the
//! outcome is independent of arrival order. Responses after resolution are
//! either recorded without effect or rejected, per [`LateResponsePolicy`].
//!
//! Submission is split into a pure [`OracleRegistry::check_submission`] and
//! [`OracleRegistry::commit_submission`] so the coordinator can validate the
//! downstream effects of a quorum-reaching response before anything changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use surety_core::{Amount, FlightKey, LateResponsePolicy, LedgerAccount, LedgerError, StatusCode};

use crate::entropy::IndexSource;

// ─── Oracle Worker ───────────────────────────────────────────────────

/// A registered oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleWorker {
    /// The oracle's account.
    pub account: LedgerAccount,
    /// Assigned index buckets, ascending and distinct.
    pub indices: Vec<u8>,
    /// Stake paid at registration.
    pub stake: Amount,
    /// Registration counter value used to derive the indices.
    pub registration: u64,
}

impl OracleWorker {
    /// Whether the oracle may answer requests at `index`.
    pub fn has_index(&self, index: u8) -> bool {
        self.indices.contains(&index)
    }
}

// ─── Request ─────────────────────────────────────────────────────────

/// Identity of a status request: index bucket plus flight.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Index bucket.
    pub index: u8,
    /// Flight whose status is requested.
    pub flight: FlightKey,
}

impl RequestKey {
    /// Assemble a request key.
    pub fn new(index: u8, flight: FlightKey) -> Self {
        Self { index, flight }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}:{}", self.index, self.flight)
    }
}

/// Lifecycle state of an [`OracleRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    /// Opened, no responses yet.
    Open,
    /// Collecting responses, no quorum yet.
    Resolving,
    /// A status reached quorum (terminal).
    Resolved,
}

impl RequestState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolving => "RESOLVING",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single oracle response did, or would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Counted; the request is still below quorum.
    Pending {
        /// Reported status.
        status: StatusCode,
        /// Oracles now supporting `status`.
        support: usize,
        /// Supporters needed.
        quorum: usize,
    },
    /// Counted and reached quorum; the request is now resolved.
    Resolved {
        /// The finalized status.
        status: StatusCode,
    },
    /// The oracle already answered this request; nothing changed.
    Duplicate {
        /// The status the oracle reported first.
        previous: StatusCode,
    },
    /// Recorded after resolution; the finalized status is unchanged.
    Late {
        /// The finalized status.
        resolved: StatusCode,
    },
}

/// A flight status request and the responses gathered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Request identity.
    pub key: RequestKey,
    /// Account that asked for the status.
    pub requester: LedgerAccount,
    /// Request counter value at opening.
    pub sequence: u64,
    state: RequestState,
    responses: BTreeMap<StatusCode, BTreeSet<LedgerAccount>>,
    late_responses: BTreeMap<LedgerAccount, StatusCode>,
    resolved_status: Option<StatusCode>,
}

impl OracleRequest {
    /// A fresh `OPEN` request.
    pub fn open(key: RequestKey, requester: LedgerAccount, sequence: u64) -> Self {
        Self {
            key,
            requester,
            sequence,
            state: RequestState::Open,
            responses: BTreeMap::new(),
            late_responses: BTreeMap::new(),
            resolved_status: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Whether a status reached quorum.
    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    /// The finalized status, once resolved.
    pub fn resolved_status(&self) -> Option<StatusCode> {
        self.resolved_status
    }

    /// Number of oracles counted for `status`.
    pub fn support(&self, status: StatusCode) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    /// Counted responses by status.
    pub fn responses(&self) -> &BTreeMap<StatusCode, BTreeSet<LedgerAccount>> {
        &self.responses
    }

    /// Responses recorded after resolution.
    pub fn late_responses(&self) -> &BTreeMap<LedgerAccount, StatusCode> {
        &self.late_responses
    }

    /// The status `oracle` reported, counted or late.
    pub fn response_of(&self, oracle: &LedgerAccount) -> Option<StatusCode> {
        self.responses
            .iter()
            .find(|(_, who)| who.contains(oracle))
            .map(|(status, _)| *status)
            .or_else(|| self.late_responses.get(oracle).copied())
    }

    /// Decide what a response would do, without recording it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AlreadyResolved`] for a response after resolution when
    /// `policy` is [`LateResponsePolicy::Reject`].
    pub fn evaluate(
        &self,
        oracle: &LedgerAccount,
        status: StatusCode,
        quorum: usize,
        policy: LateResponsePolicy,
    ) -> Result<SubmissionOutcome, LedgerError> {
        if let Some(resolved) = self.resolved_status {
            return match policy {
                LateResponsePolicy::Reject => {
                    Err(LedgerError::already_resolved("oracle request", &self.key))
                }
                LateResponsePolicy::Record => Ok(match self.response_of(oracle) {
                    Some(previous) => SubmissionOutcome::Duplicate { previous },
                    None => SubmissionOutcome::Late { resolved },
                }),
            };
        }
        if let Some(previous) = self.response_of(oracle) {
            return Ok(SubmissionOutcome::Duplicate { previous });
        }
        let support = self.support(status) + 1;
        if support >= quorum {
            Ok(SubmissionOutcome::Resolved { status })
        } else {
            Ok(SubmissionOutcome::Pending {
                status,
                support,
                quorum,
            })
        }
    }

    /// Record a response whose outcome came from [`Self::evaluate`].
    pub fn apply(&mut self, oracle: &LedgerAccount, status: StatusCode, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Pending { .. } => {
                self.responses.entry(status).or_default().insert(oracle.clone());
                self.state = RequestState::Resolving;
            }
            SubmissionOutcome::Resolved { status: resolved } => {
                self.responses.entry(status).or_default().insert(oracle.clone());
                self.state = RequestState::Resolved;
                self.resolved_status = Some(resolved);
            }
            SubmissionOutcome::Late { .. } => {
                self.late_responses.insert(oracle.clone(), status);
            }
            SubmissionOutcome::Duplicate { .. } => {}
        }
    }
}

/// Result of [`OracleRegistry::open_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOpening {
    /// A new request was opened.
    Opened,
    /// An unresolved request with this key already existed.
    AlreadyOpen,
    /// A request with this key already resolved.
    AlreadyResolved,
}

// ─── Registry ────────────────────────────────────────────────────────

/// Owned store of oracle workers and their requests.
#[derive(Debug)]
pub struct OracleRegistry {
    workers: BTreeMap<LedgerAccount, OracleWorker>,
    requests: BTreeMap<RequestKey, OracleRequest>,
    registrations: u64,
    request_counter: u64,
    source: Box<dyn IndexSource>,
}

impl OracleRegistry {
    /// An empty registry drawing indices from `source`.
    pub fn new(source: Box<dyn IndexSource>) -> Self {
        Self {
            workers: BTreeMap::new(),
            requests: BTreeMap::new(),
            registrations: 0,
            request_counter: 0,
            source,
        }
    }

    /// Register an oracle, assigning `count` indices from `0..space`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `stake` is below `fee`.
    /// - [`LedgerError::AlreadyRegistered`] if `caller` is already an oracle.
    pub fn register(
        &mut self,
        caller: &LedgerAccount,
        stake: Amount,
        fee: Amount,
        count: usize,
        space: u16,
    ) -> Result<&OracleWorker, LedgerError> {
        if stake < fee {
            return Err(LedgerError::InvalidAmount {
                operation: "register oracle".into(),
                amount: stake.to_string(),
                reason: format!("below the registration fee of {fee}"),
            });
        }
        if self.workers.contains_key(caller) {
            return Err(LedgerError::already_registered("oracle", caller));
        }
        let indices = self
            .source
            .oracle_indices(caller, self.registrations, count, space)?;
        if indices.len() != count {
            return Err(LedgerError::IndexDerivation(format!(
                "expected {count} distinct indices for {caller}, got {}",
                indices.len()
            )));
        }
        let worker = OracleWorker {
            account: caller.clone(),
            indices,
            stake,
            registration: self.registrations,
        };
        self.registrations += 1;
        Ok(self.workers.entry(caller.clone()).or_insert(worker))
    }

    /// Look up an oracle.
    pub fn worker(&self, account: &LedgerAccount) -> Option<&OracleWorker> {
        self.workers.get(account)
    }

    /// Indices assigned to `caller`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownEntity`] if `caller` is not a registered oracle.
    pub fn indices_of(&self, caller: &LedgerAccount) -> Result<&[u8], LedgerError> {
        self.worker(caller)
            .map(|w| w.indices.as_slice())
            .ok_or_else(|| LedgerError::unknown("oracle", caller))
    }

    /// Number of registered oracles.
    pub fn oracle_count(&self) -> usize {
        self.workers.len()
    }

    /// Sum of all oracle stakes.
    pub fn total_staked(&self) -> Option<Amount> {
        Amount::checked_sum(self.workers.values().map(|w| w.stake))
    }

    /// Open a status request for `flight` at a derived index bucket.
    ///
    /// The request counter advances on every call. An existing unresolved
    /// request with the same key is left untouched. A request that resolved
    /// to [`StatusCode::Unknown`] carried no information and is replaced by a
    /// fresh one.
    pub fn open_request(
        &mut self,
        flight: FlightKey,
        requester: &LedgerAccount,
        space: u16,
    ) -> Result<(RequestKey, RequestOpening), LedgerError> {
        let sequence = self.request_counter;
        let index = self.source.request_index(&flight, sequence, space)?;
        self.request_counter += 1;

        let key = RequestKey::new(index, flight);
        let opening = match self.requests.get(&key) {
            Some(req) if !req.is_resolved() => RequestOpening::AlreadyOpen,
            Some(req) if req.resolved_status() != Some(StatusCode::Unknown) => {
                RequestOpening::AlreadyResolved
            }
            _ => {
                self.requests.insert(
                    key.clone(),
                    OracleRequest::open(key.clone(), requester.clone(), sequence),
                );
                RequestOpening::Opened
            }
        };
        Ok((key, opening))
    }

    /// Look up a request.
    pub fn request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.requests.get(key)
    }

    /// Requests that have not reached quorum, in key order.
    pub fn pending_requests(&self) -> impl Iterator<Item = &OracleRequest> {
        self.requests.values().filter(|r| !r.is_resolved())
    }

    /// Validate a response and decide its outcome without recording it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] unless `caller` is a registered oracle
    ///   assigned to `key.index`.
    /// - [`LedgerError::UnknownEntity`] if no request exists for `key`.
    /// - [`LedgerError::AlreadyResolved`] for a late response under
    ///   [`LateResponsePolicy::Reject`].
    pub fn check_submission(
        &self,
        key: &RequestKey,
        status: StatusCode,
        caller: &LedgerAccount,
        quorum: usize,
        policy: LateResponsePolicy,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let worker = self.worker(caller).ok_or_else(|| {
            LedgerError::unauthorized(caller, "submit oracle response", "caller is not a registered oracle")
        })?;
        if !worker.has_index(key.index) {
            return Err(LedgerError::unauthorized(
                caller,
                "submit oracle response",
                format!("oracle is not assigned index {}", key.index),
            ));
        }
        let request = self
            .request(key)
            .ok_or_else(|| LedgerError::unknown("oracle request", key))?;
        request.evaluate(caller, status, quorum, policy)
    }

    /// Record a response previously validated by [`Self::check_submission`].
    pub fn commit_submission(
        &mut self,
        key: &RequestKey,
        status: StatusCode,
        caller: &LedgerAccount,
        outcome: SubmissionOutcome,
    ) -> Result<(), LedgerError> {
        let request = self
            .requests
            .get_mut(key)
            .ok_or_else(|| LedgerError::unknown("oracle request", key))?;
        request.apply(caller, status, outcome);
        Ok(())
    }

    #[cfg(test)]
    fn submit(
        &mut self,
        key: &RequestKey,
        status: StatusCode,
        caller: &LedgerAccount,
        quorum: usize,
        policy: LateResponsePolicy,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let outcome = self.check_submission(key, status, caller, quorum, policy)?;
        self.commit_submission(key, status, caller, outcome)?;
        Ok(outcome)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{DigestIndexSource, FixedIndexSource};
    use surety_core::{FlightCode, Timestamp};

    fn acct(s: &str) -> LedgerAccount {
        LedgerAccount::new(s).unwrap()
    }

    fn flight() -> FlightKey {
        FlightKey::new(
            acct("air-0"),
            FlightCode::new("ND1309").unwrap(),
            Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
        )
    }

    fn fee() -> Amount {
        Amount::units(1)
    }

    /// Five oracles all holding index 4; requests land on index 4.
    fn registry() -> OracleRegistry {
        let mut reg = OracleRegistry::new(Box::new(FixedIndexSource::new(vec![1, 4, 7], 4)));
        for i in 0..5 {
            reg.register(&acct(&format!("oracle-{i}")), fee(), fee(), 3, 10)
                .unwrap();
        }
        reg
    }

    #[test]
    fn test_register_assigns_indices() {
        let mut reg = OracleRegistry::new(Box::new(DigestIndexSource::default()));
        let worker = reg.register(&acct("oracle-1"), fee(), fee(), 3, 10).unwrap();
        assert_eq!(worker.indices.len(), 3);
        assert_eq!(worker.registration, 0);
        let indices = reg.indices_of(&acct("oracle-1")).unwrap().to_vec();
        assert_eq!(indices, reg.worker(&acct("oracle-1")).unwrap().indices);
        assert_eq!(reg.oracle_count(), 1);
        assert_eq!(reg.total_staked(), Some(fee()));
    }

    #[test]
    fn test_register_rejects_low_stake_and_duplicates() {
        let mut reg = OracleRegistry::new(Box::new(DigestIndexSource::default()));
        let err = reg
            .register(&acct("oracle-1"), Amount::new(1), fee(), 3, 10)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(reg.oracle_count(), 0);

        reg.register(&acct("oracle-1"), fee(), fee(), 3, 10).unwrap();
        let err = reg.register(&acct("oracle-1"), fee(), fee(), 3, 10).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_indices_of_unknown_oracle() {
        let reg = registry();
        assert!(matches!(
            reg.indices_of(&acct("nobody")),
            Err(LedgerError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_quorum_resolves_once() {
        let mut reg = registry();
        let (key, opening) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        assert_eq!(opening, RequestOpening::Opened);
        assert_eq!(key.index, 4);
        assert_eq!(reg.request(&key).unwrap().state(), RequestState::Open);

        let first = reg
            .submit(&key, StatusCode::LateWeather, &acct("oracle-0"), 3, LateResponsePolicy::Record)
            .unwrap();
        assert_eq!(
            first,
            SubmissionOutcome::Pending {
                status: StatusCode::LateWeather,
                support: 1,
                quorum: 3
            }
        );
        assert_eq!(reg.request(&key).unwrap().state(), RequestState::Resolving);

        reg.submit(&key, StatusCode::OnTime, &acct("oracle-1"), 3, LateResponsePolicy::Record)
            .unwrap();
        reg.submit(&key, StatusCode::LateWeather, &acct("oracle-2"), 3, LateResponsePolicy::Record)
            .unwrap();
        let third = reg
            .submit(&key, StatusCode::LateWeather, &acct("oracle-3"), 3, LateResponsePolicy::Record)
            .unwrap();
        assert_eq!(
            third,
            SubmissionOutcome::Resolved {
                status: StatusCode::LateWeather
            }
        );

        let late = reg
            .submit(&key, StatusCode::OnTime, &acct("oracle-4"), 3, LateResponsePolicy::Record)
            .unwrap();
        assert_eq!(
            late,
            SubmissionOutcome::Late {
                resolved: StatusCode::LateWeather
            }
        );
        let request = reg.request(&key).unwrap();
        assert_eq!(request.resolved_status(), Some(StatusCode::LateWeather));
        assert_eq!(request.support(StatusCode::OnTime), 1);
        assert_eq!(request.late_responses().len(), 1);
        assert_eq!(reg.pending_requests().count(), 0);
    }

    #[test]
    fn test_oracle_counts_once() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        reg.submit(&key, StatusCode::LateAirline, &acct("oracle-0"), 3, LateResponsePolicy::Record)
            .unwrap();
        let again = reg
            .submit(&key, StatusCode::LateOther, &acct("oracle-0"), 3, LateResponsePolicy::Record)
            .unwrap();
        assert_eq!(
            again,
            SubmissionOutcome::Duplicate {
                previous: StatusCode::LateAirline
            }
        );
        let request = reg.request(&key).unwrap();
        assert_eq!(request.support(StatusCode::LateAirline), 1);
        assert_eq!(request.support(StatusCode::LateOther), 0);
    }

    #[test]
    fn test_late_response_rejected_under_reject_policy() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        for i in 0..3 {
            reg.submit(&key, StatusCode::OnTime, &acct(&format!("oracle-{i}")), 3, LateResponsePolicy::Reject)
                .unwrap();
        }
        let err = reg
            .submit(&key, StatusCode::LateOther, &acct("oracle-4"), 3, LateResponsePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyResolved { .. }));
        assert!(reg.request(&key).unwrap().late_responses().is_empty());
    }

    #[test]
    fn test_submission_requires_assigned_index() {
        let source = FixedIndexSource::new(vec![4], 4).with_oracle(acct("outsider"), vec![0, 1, 2]);
        let mut reg = OracleRegistry::new(Box::new(source));
        reg.register(&acct("outsider"), fee(), fee(), 3, 10).unwrap();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        let err = reg
            .submit(&key, StatusCode::OnTime, &acct("outsider"), 3, LateResponsePolicy::Record)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        let err = reg
            .submit(&key, StatusCode::OnTime, &acct("stranger"), 3, LateResponsePolicy::Record)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn test_submission_for_unknown_request() {
        let reg = registry();
        let key = RequestKey::new(4, flight());
        let err = reg
            .check_submission(&key, StatusCode::OnTime, &acct("oracle-0"), 3, LateResponsePolicy::Record)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownEntity { .. }));
    }

    #[test]
    fn test_reopen_keeps_collected_responses() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        reg.submit(&key, StatusCode::LateAirline, &acct("oracle-0"), 3, LateResponsePolicy::Record)
            .unwrap();
        let (again, opening) = reg.open_request(flight(), &acct("pax-2"), 10).unwrap();
        assert_eq!(again, key);
        assert_eq!(opening, RequestOpening::AlreadyOpen);
        let request = reg.request(&key).unwrap();
        assert_eq!(request.support(StatusCode::LateAirline), 1);
        assert_eq!(request.requester, acct("pax-1"));
    }

    #[test]
    fn test_unknown_resolution_can_be_requested_again() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        for i in 0..3 {
            reg.submit(&key, StatusCode::Unknown, &acct(&format!("oracle-{i}")), 3, LateResponsePolicy::Record)
                .unwrap();
        }
        assert!(reg.request(&key).unwrap().is_resolved());
        let (_, opening) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        assert_eq!(opening, RequestOpening::Opened);
        assert_eq!(reg.request(&key).unwrap().state(), RequestState::Open);
    }

    #[test]
    fn test_resolved_request_is_not_reset() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        for i in 0..3 {
            reg.submit(&key, StatusCode::OnTime, &acct(&format!("oracle-{i}")), 3, LateResponsePolicy::Record)
                .unwrap();
        }
        let (_, opening) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        assert_eq!(opening, RequestOpening::AlreadyResolved);
        assert_eq!(
            reg.request(&key).unwrap().resolved_status(),
            Some(StatusCode::OnTime)
        );
    }

    #[test]
    fn test_check_submission_is_pure() {
        let mut reg = registry();
        let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
        let outcome = reg
            .check_submission(&key, StatusCode::LateOther, &acct("oracle-0"), 1, LateResponsePolicy::Record)
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Resolved {
                status: StatusCode::LateOther
            }
        );
        assert_eq!(reg.request(&key).unwrap().state(), RequestState::Open);
    }

    use proptest::prelude::*;

    proptest! {
        /// However the five oracles are ordered, the request resolves exactly
        /// once, on the third agreeing response.
        #[test]
        fn test_resolution_is_order_independent(order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()) {
            let mut reg = registry();
            let (key, _) = reg.open_request(flight(), &acct("pax-1"), 10).unwrap();
            let mut resolutions = Vec::new();
            for (position, i) in order.iter().enumerate() {
                let outcome = reg
                    .submit(&key, StatusCode::LateTechnical, &acct(&format!("oracle-{i}")), 3, LateResponsePolicy::Record)
                    .unwrap();
                if matches!(outcome, SubmissionOutcome::Resolved { .. }) {
                    resolutions.push(position);
                }
            }
            prop_assert_eq!(resolutions, vec![2]);
            prop_assert_eq!(
                reg.request(&key).unwrap().resolved_status(),
                Some(StatusCode::LateTechnical)
            );
        }
    }

    #[test]
    fn test_request_state_display() {
        assert_eq!(RequestState::Resolving.to_string(), "RESOLVING");
        assert!(RequestState::Resolved.is_terminal());
        assert!(!RequestState::Open.is_terminal());
    }
}
