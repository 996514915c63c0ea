//! # Flight-Surety Ledger
//!
//! [`FlightSuretyLedger`] owns one of each store (gate, airlines, flights,
//! escrow, oracles) and is the only way to reach them. Every mutating entry
//! point checks the operational gate first, validates all preconditions
//! across components, and only then commits. Nothing is written when an
//! error is returned.
//!
//! Cross-component effects are explicit calls made here: a quorum-reaching
//! oracle response applies the flight status and then credits (or expires)
//! the flight's policies in the same operation.

use surety_core::{
    Amount, ConfigError, FlightCode, FlightKey, LedgerAccount, LedgerConfig, LedgerError,
    StatusCode, Timestamp,
};
use surety_escrow::{
    CreditPlan, InMemoryRail, InsuranceEscrow, InsurancePolicy, Payout, PayoutRail, PolicyKey,
};
use surety_state::{
    AdmissionOutcome, AdmissionState, Airline, AirlineRegistry, DigestIndexSource, Flight,
    FlightRegistry, IndexSource, OperationalGate, OracleRegistry, OracleRequest, RequestKey,
    RequestOpening, StatusApplication, StatusSource, SubmissionOutcome,
};

use crate::event::LedgerEvent;

/// The single serialized ledger.
///
/// Generic over the payout rail so tests and embedders can inspect the
/// concrete rail through [`Self::rail`].
#[derive(Debug)]
pub struct FlightSuretyLedger<R: PayoutRail = InMemoryRail> {
    config: LedgerConfig,
    gate: OperationalGate,
    airlines: AirlineRegistry,
    flights: FlightRegistry,
    escrow: InsuranceEscrow,
    oracles: OracleRegistry,
    rail: R,
    events: Vec<LedgerEvent>,
}

impl FlightSuretyLedger<InMemoryRail> {
    /// A ledger with hash-derived indices and an in-memory payout rail.
    ///
    /// `entropy` is mixed into every oracle and request index draw; pass
    /// material the oracles cannot know in advance, or indices become
    /// predictable from identities alone. `first_airline` is admitted at
    /// construction; it still has to fund itself before it can act.
    pub fn new(
        config: LedgerConfig,
        owner: LedgerAccount,
        first_airline: LedgerAccount,
        entropy: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            owner,
            first_airline,
            Box::new(DigestIndexSource::with_entropy(entropy)),
            InMemoryRail::new(),
        )
    }
}

impl<R: PayoutRail> FlightSuretyLedger<R> {
    /// A ledger with an explicit index source and payout rail.
    pub fn with_parts(
        config: LedgerConfig,
        owner: LedgerAccount,
        first_airline: LedgerAccount,
        index_source: Box<dyn IndexSource>,
        rail: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let airlines = AirlineRegistry::with_founder(first_airline, config.bootstrap_airline_count);
        Ok(Self {
            gate: OperationalGate::new(owner),
            airlines,
            flights: FlightRegistry::new(),
            escrow: InsuranceEscrow::new(),
            oracles: OracleRegistry::new(index_source),
            rail,
            events: Vec::new(),
            config,
        })
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// The configuration in force.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Whether mutating operations are accepted.
    pub fn is_operational(&self) -> bool {
        self.gate.is_operational()
    }

    /// The administrative owner.
    pub fn owner(&self) -> &LedgerAccount {
        self.gate.owner()
    }

    /// Whether `account` may use the direct status write.
    pub fn is_authorized_caller(&self, account: &LedgerAccount) -> bool {
        self.gate.is_authorized(account)
    }

    /// Whether `airline` is admitted.
    pub fn is_admitted_airline(&self, airline: &LedgerAccount) -> bool {
        self.airlines.is_admitted(airline)
    }

    /// Whether `airline` is admitted and funded.
    pub fn is_funded_airline(&self, airline: &LedgerAccount) -> bool {
        self.airlines.is_funded(airline)
    }

    /// Number of admitted airlines.
    pub fn admitted_airline_count(&self) -> usize {
        self.airlines.admitted_count()
    }

    /// Votes recorded for a candidate.
    pub fn votes_for(&self, candidate: &LedgerAccount) -> usize {
        self.airlines.votes_for(candidate)
    }

    /// Full airline record.
    pub fn airline(&self, account: &LedgerAccount) -> Option<&Airline> {
        self.airlines.get(account)
    }

    /// Look up a flight.
    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// Whether a flight is registered.
    pub fn is_registered_flight(&self, key: &FlightKey) -> bool {
        self.flights.is_registered(key)
    }

    /// Current status of a flight.
    pub fn flight_status(&self, key: &FlightKey) -> Option<StatusCode> {
        self.flights.status(key)
    }

    /// A passenger's policy on a flight.
    pub fn policy(&self, passenger: &LedgerAccount, flight: &FlightKey) -> Option<&InsurancePolicy> {
        self.escrow
            .policy(&PolicyKey::new(passenger.clone(), flight.clone()))
    }

    /// Credit owed to a passenger on one flight.
    pub fn credit_owed(&self, passenger: &LedgerAccount, flight: &FlightKey) -> Amount {
        self.escrow.credit_owed(passenger, flight)
    }

    /// Credit owed to a passenger across all flights.
    pub fn total_owed(&self, passenger: &LedgerAccount) -> Result<Amount, LedgerError> {
        self.escrow.total_owed(passenger)
    }

    /// Funds held in escrow.
    pub fn escrow_balance(&self) -> Amount {
        self.escrow.held()
    }

    /// Outstanding escrow liabilities.
    pub fn escrow_liabilities(&self) -> Result<Amount, LedgerError> {
        self.escrow.liabilities()
    }

    /// The escrow store, for history and solvency inspection.
    pub fn escrow(&self) -> &InsuranceEscrow {
        &self.escrow
    }

    /// Indices assigned to the calling oracle.
    pub fn get_my_indexes(&self, caller: &LedgerAccount) -> Result<Vec<u8>, LedgerError> {
        self.oracles.indices_of(caller).map(<[u8]>::to_vec)
    }

    /// Number of registered oracles.
    pub fn oracle_count(&self) -> usize {
        self.oracles.oracle_count()
    }

    /// Stake held by the oracle registry, outside the insurance pool.
    /// `None` on overflow.
    pub fn total_oracle_stake(&self) -> Option<Amount> {
        self.oracles.total_staked()
    }

    /// Requests still waiting for quorum, for relays that poll instead of
    /// draining signals.
    pub fn pending_requests(&self) -> Vec<&OracleRequest> {
        self.oracles.pending_requests().collect()
    }

    /// Look up an oracle request.
    pub fn oracle_request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.oracles.request(key)
    }

    /// The payout rail.
    pub fn rail(&self) -> &R {
        &self.rail
    }

    /// Mutable access to the payout rail.
    pub fn rail_mut(&mut self) -> &mut R {
        &mut self.rail
    }

    /// Signals emitted since the last drain, without clearing them.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take every signal emitted since the last drain, in commit order.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Gate ───────────────────────────────────────────────────────

    /// Open or close the ledger. Owner only; allowed while closed.
    pub fn set_operating_status(&mut self, mode: bool, caller: &LedgerAccount) -> Result<(), LedgerError> {
        if self.gate.set_operational(mode, caller)? {
            tracing::info!(operational = mode, owner = %caller, "operating status changed");
            self.events
                .push(LedgerEvent::OperationalStatusChanged { operational: mode });
        }
        Ok(())
    }

    /// Allow `account` to write flight status directly. Owner only.
    pub fn authorize_caller(&mut self, account: LedgerAccount, caller: &LedgerAccount) -> Result<(), LedgerError> {
        self.gate.require_operational("authorize caller")?;
        if self.gate.authorize_caller(account.clone(), caller)? {
            tracing::info!(account = %account, "caller authorized");
            self.events.push(LedgerEvent::CallerAuthorized { account });
        }
        Ok(())
    }

    /// Revoke a direct-write authorization. Owner only.
    pub fn deauthorize_caller(&mut self, account: &LedgerAccount, caller: &LedgerAccount) -> Result<(), LedgerError> {
        self.gate.require_operational("deauthorize caller")?;
        if self.gate.deauthorize_caller(account, caller)? {
            tracing::info!(account = %account, "caller deauthorized");
            self.events.push(LedgerEvent::CallerDeauthorized {
                account: account.clone(),
            });
        }
        Ok(())
    }

    // ─── Airlines ───────────────────────────────────────────────────

    /// Nominate `candidate`, or vote for it if it is already pending.
    pub fn register_airline(
        &mut self,
        candidate: LedgerAccount,
        caller: &LedgerAccount,
    ) -> Result<AdmissionOutcome, LedgerError> {
        self.gate.require_operational("register airline")?;
        let voting = self
            .airlines
            .get(&candidate)
            .is_some_and(|a| a.state == AdmissionState::Pending);
        let outcome = self.airlines.register(candidate.clone(), caller)?;

        if voting {
            let votes = self.airlines.votes_for(&candidate);
            tracing::debug!(candidate = %candidate, voter = %caller, votes, "airline vote recorded");
            self.events.push(LedgerEvent::AirlineVoted {
                candidate: candidate.clone(),
                voter: caller.clone(),
                votes,
            });
        } else {
            tracing::info!(candidate = %candidate, nominator = %caller, "airline nominated");
            self.events.push(LedgerEvent::AirlineNominated {
                candidate: candidate.clone(),
                nominator: caller.clone(),
            });
        }
        if outcome == AdmissionOutcome::Admitted {
            tracing::info!(
                airline = %candidate,
                admitted = self.airlines.admitted_count(),
                "airline admitted"
            );
            self.events
                .push(LedgerEvent::AirlineAdmitted { airline: candidate });
        }
        Ok(outcome)
    }

    /// Fund the calling airline, moving `amount` into the escrow pool.
    pub fn fund(&mut self, caller: &LedgerAccount, amount: Amount) -> Result<(), LedgerError> {
        self.gate.require_operational("fund airline")?;
        self.airlines
            .check_funding(caller, amount, self.config.min_airline_funding)?;
        self.escrow.deposit_funding(caller, amount)?;
        self.airlines
            .fund(caller, amount, self.config.min_airline_funding)?;
        tracing::info!(airline = %caller, amount = %amount, "airline funded");
        self.events.push(LedgerEvent::AirlineFunded {
            airline: caller.clone(),
            amount,
        });
        Ok(())
    }

    // ─── Flights ────────────────────────────────────────────────────

    /// Register a flight operated by `airline`. The caller must be that
    /// airline, admitted and funded.
    pub fn register_flight(
        &mut self,
        airline: &LedgerAccount,
        code: FlightCode,
        timestamp: Timestamp,
        caller: &LedgerAccount,
    ) -> Result<FlightKey, LedgerError> {
        self.gate.require_operational("register flight")?;
        let key = FlightKey::new(airline.clone(), code, timestamp);
        self.flights.register(key.clone(), caller, &self.airlines)?;
        tracing::info!(flight = %key, "flight registered");
        self.events
            .push(LedgerEvent::FlightRegistered { flight: key.clone() });
        Ok(key)
    }

    /// Ask the oracle swarm for a flight's status.
    ///
    /// Emits an [`LedgerEvent::OracleRequest`] unless the derived request
    /// already resolved.
    pub fn fetch_flight_status(
        &mut self,
        airline: &LedgerAccount,
        code: FlightCode,
        timestamp: Timestamp,
        caller: &LedgerAccount,
    ) -> Result<RequestKey, LedgerError> {
        self.gate.require_operational("fetch flight status")?;
        let flight = FlightKey::new(airline.clone(), code, timestamp);
        self.flights.require(&flight)?;
        let (key, opening) = self
            .oracles
            .open_request(flight, caller, self.config.index_space)?;
        match opening {
            RequestOpening::Opened | RequestOpening::AlreadyOpen => {
                tracing::info!(request = %key, requester = %caller, "flight status requested");
                self.events
                    .push(LedgerEvent::oracle_request(key.index, &key.flight));
            }
            RequestOpening::AlreadyResolved => {
                tracing::debug!(request = %key, "flight status request already resolved");
            }
        }
        Ok(key)
    }

    /// Privileged direct status write, for the owner and authorized callers.
    ///
    /// Resolving to a covered delay does not credit insurees; the operating
    /// airline calls [`Self::credit_insurees`]. Resolving to an uncovered
    /// status expires the flight's active policies.
    pub fn process_flight_status(
        &mut self,
        airline: &LedgerAccount,
        code: FlightCode,
        timestamp: Timestamp,
        status: StatusCode,
        caller: &LedgerAccount,
    ) -> Result<StatusApplication, LedgerError> {
        self.gate.require_operational("process flight status")?;
        if !self.gate.is_authorized(caller) {
            return Err(LedgerError::unauthorized(
                caller,
                "process flight status",
                "caller is not authorized to write flight status",
            ));
        }
        let flight = FlightKey::new(airline.clone(), code, timestamp);
        let application = self
            .flights
            .apply_status(&flight, status, StatusSource::DirectWrite)?;
        if let StatusApplication::Applied(status) = application {
            self.finalize_status(&flight, status, StatusSource::DirectWrite);
            if !self.config.is_covered(status) {
                self.expire_policies(&flight);
            }
        }
        Ok(application)
    }

    // ─── Insurance ──────────────────────────────────────────────────

    /// Buy insurance on `flight` for `amount`.
    pub fn buy(&mut self, flight: &FlightKey, caller: &LedgerAccount, amount: Amount) -> Result<(), LedgerError> {
        self.gate.require_operational("buy insurance")?;
        let record = self.flights.require(flight)?;
        self.escrow.buy(caller, record, amount, &self.config)?;
        tracing::info!(passenger = %caller, flight = %flight, premium = %amount, "policy purchased");
        self.events.push(LedgerEvent::PolicyPurchased {
            passenger: caller.clone(),
            flight: flight.clone(),
            premium: amount,
        });
        Ok(())
    }

    /// Credit every active policy on a delayed flight. Operating airline
    /// only; re-running it credits nothing new.
    pub fn credit_insurees(&mut self, flight: &FlightKey, caller: &LedgerAccount) -> Result<CreditPlan, LedgerError> {
        self.gate.require_operational("credit insurees")?;
        let record = self.flights.require(flight)?;
        self.escrow
            .authorize_credit(record, caller, &self.airlines, &self.config)?;
        let plan = self.escrow.plan_credit(flight, &self.config)?;
        self.apply_credit(&plan);
        Ok(plan)
    }

    /// Withdraw what the caller's policy on `flight` owes.
    pub fn withdraw(&mut self, flight: &FlightKey, caller: &LedgerAccount) -> Result<Payout, LedgerError> {
        self.gate.require_operational("withdraw")?;
        let record = self.flights.require(flight)?;
        let payout = self.escrow.withdraw(caller, record, &mut self.rail)?;
        self.record_payout(&payout);
        Ok(payout)
    }

    /// Pay out every credited policy of the caller.
    pub fn pay(&mut self, caller: &LedgerAccount) -> Result<Payout, LedgerError> {
        self.gate.require_operational("pay")?;
        let payout = self.escrow.pay(caller, &mut self.rail)?;
        self.record_payout(&payout);
        Ok(payout)
    }

    // ─── Oracles ────────────────────────────────────────────────────

    /// Register the caller as an oracle, returning its indices.
    pub fn register_oracle(&mut self, caller: &LedgerAccount, stake: Amount) -> Result<Vec<u8>, LedgerError> {
        self.gate.require_operational("register oracle")?;
        let worker = self.oracles.register(
            caller,
            stake,
            self.config.oracle_registration_fee,
            self.config.indices_per_oracle,
            self.config.index_space,
        )?;
        let indices = worker.indices.clone();
        tracing::info!(oracle = %caller, indices = ?indices, "oracle registered");
        self.events.push(LedgerEvent::OracleRegistered {
            oracle: caller.clone(),
            indices: indices.clone(),
        });
        Ok(indices)
    }

    /// Accept an oracle's report for an open request.
    ///
    /// The response that reaches quorum finalizes the flight status and, in
    /// the same step, credits insurees for a covered delay or expires their
    /// policies otherwise. Purchases are bounded by the escrow's worst-case
    /// exposure, so a delay quorum can always be credited.
    pub fn submit_oracle_response(
        &mut self,
        index: u8,
        airline: &LedgerAccount,
        code: FlightCode,
        timestamp: Timestamp,
        status: StatusCode,
        caller: &LedgerAccount,
    ) -> Result<SubmissionOutcome, LedgerError> {
        self.gate.require_operational("submit oracle response")?;
        let key = RequestKey::new(index, FlightKey::new(airline.clone(), code, timestamp));
        let outcome = self.oracles.check_submission(
            &key,
            status,
            caller,
            self.config.oracle_quorum,
            self.config.late_response_policy,
        )?;

        let mut credit = None;
        if let SubmissionOutcome::Resolved { status } = outcome {
            let flight = self.flights.require(&key.flight)?;
            if !flight.is_resolved() && self.config.is_covered(status) {
                credit = Some(self.escrow.plan_credit(&key.flight, &self.config)?);
            }
        }

        self.oracles
            .commit_submission(&key, status, caller, outcome)?;
        match outcome {
            SubmissionOutcome::Duplicate { .. } => {
                tracing::debug!(request = %key, oracle = %caller, "duplicate oracle response ignored");
                return Ok(outcome);
            }
            SubmissionOutcome::Late { .. } => {
                tracing::debug!(request = %key, oracle = %caller, "late oracle response recorded");
            }
            SubmissionOutcome::Pending { support, .. } => {
                tracing::debug!(request = %key, oracle = %caller, status = status.as_str(), support, "oracle response recorded");
            }
            SubmissionOutcome::Resolved { .. } => {}
        }
        self.events.push(LedgerEvent::OracleReport {
            airline: airline.clone(),
            flight: code,
            timestamp,
            status,
            oracle: caller.clone(),
        });

        if let SubmissionOutcome::Resolved { status } = outcome {
            tracing::info!(request = %key, status = status.as_str(), "oracle quorum reached");
            let application = self
                .flights
                .apply_status(&key.flight, status, StatusSource::OracleQuorum)?;
            if let StatusApplication::Applied(status) = application {
                self.finalize_status(&key.flight, status, StatusSource::OracleQuorum);
                match credit {
                    Some(plan) => self.apply_credit(&plan),
                    None => self.expire_policies(&key.flight),
                }
            }
        }
        Ok(outcome)
    }

    // ─── Internal effects ───────────────────────────────────────────

    fn finalize_status(&mut self, flight: &FlightKey, status: StatusCode, source: StatusSource) {
        tracing::info!(flight = %flight, status = status.as_str(), source = ?source, "flight status finalized");
        self.events.push(LedgerEvent::FlightStatusInfo {
            airline: flight.airline.clone(),
            flight: flight.code,
            timestamp: flight.timestamp,
            status,
            source,
        });
    }

    fn apply_credit(&mut self, plan: &CreditPlan) {
        self.escrow.apply_credit(plan);
        if plan.is_empty() {
            return;
        }
        tracing::info!(
            flight = %plan.flight,
            policies = plan.credits.len(),
            total = %plan.total,
            "insurees credited"
        );
        self.events.push(LedgerEvent::InsureesCredited {
            flight: plan.flight.clone(),
            policies: plan.credits.len(),
            total: plan.total,
        });
    }

    fn expire_policies(&mut self, flight: &FlightKey) {
        let expired = self.escrow.expire_policies(flight);
        if expired > 0 {
            tracing::info!(flight = %flight, policies = expired, "policies expired");
            self.events.push(LedgerEvent::PoliciesExpired {
                flight: flight.clone(),
                policies: expired,
            });
        }
    }

    fn record_payout(&mut self, payout: &Payout) {
        tracing::info!(
            recipient = %payout.recipient,
            amount = %payout.amount,
            kind = ?payout.kind,
            "payout sent"
        );
        self.events.push(LedgerEvent::PayoutSent {
            recipient: payout.recipient.clone(),
            amount: payout.amount,
            kind: payout.kind,
        });
    }
}
