//! # Oracle Quorum Tests
//!
//! Request assignment, response validation, and quorum resolution through
//! the ledger. The property tests check that the resolved status does not
//! depend on the order responses arrive in, and that the escrow stays
//! solvent under arbitrary interleavings of purchases, reports, and
//! payouts.

use proptest::prelude::*;
use surety_core::{
    Amount, FlightCode, FlightKey, LedgerAccount, LedgerConfig, LedgerError, StatusCode, Timestamp,
};
use surety_escrow::{InMemoryRail, PolicyStatus};
use surety_ledger::{FlightSuretyLedger, LedgerEvent};
use surety_state::{FixedIndexSource, RequestState, SubmissionOutcome};

const REQUEST_INDEX: u8 = 4;

fn acct(s: &str) -> LedgerAccount {
    LedgerAccount::new(s).expect("valid account")
}

fn oracle(i: usize) -> LedgerAccount {
    acct(&format!("oracle-{i}"))
}

/// Funded founder, flights `F0..F{flights}`, `oracles` registered oracles
/// all assigned the request bucket, except `oracle-outsider`.
fn setup(flights: usize, oracles: usize) -> (FlightSuretyLedger, Vec<FlightKey>) {
    let source = FixedIndexSource::new(vec![0, REQUEST_INDEX, 7], REQUEST_INDEX)
        .with_oracle(acct("oracle-outsider"), vec![0, 1, 2]);
    let mut ledger = FlightSuretyLedger::with_parts(
        LedgerConfig::default(),
        acct("owner"),
        acct("air-0"),
        Box::new(source),
        InMemoryRail::new(),
    )
    .expect("default config is valid");

    let air = acct("air-0");
    ledger.fund(&air, Amount::units(10)).unwrap();
    let departure = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
    let keys: Vec<_> = (0..flights)
        .map(|i| {
            let code = FlightCode::new(&format!("F{i}")).unwrap();
            ledger.register_flight(&air, code, departure, &air).unwrap()
        })
        .collect();
    for i in 0..oracles {
        ledger.register_oracle(&oracle(i), Amount::units(1)).unwrap();
    }
    ledger.drain_events();
    (ledger, keys)
}

fn fetch(ledger: &mut FlightSuretyLedger, key: &FlightKey) {
    ledger
        .fetch_flight_status(&key.airline, key.code, key.timestamp, &acct("pax-0"))
        .unwrap();
}

fn submit(
    ledger: &mut FlightSuretyLedger,
    key: &FlightKey,
    who: &LedgerAccount,
    index: u8,
    status: StatusCode,
) -> Result<SubmissionOutcome, LedgerError> {
    ledger.submit_oracle_response(index, &key.airline, key.code, key.timestamp, status, who)
}

// ─── Registration ───────────────────────────────────────────────────

#[test]
fn registration_requires_the_fee_and_is_unique() {
    let (mut ledger, _) = setup(0, 0);
    let err = ledger
        .register_oracle(&oracle(0), Amount::new(Amount::UNIT - 1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    assert!(ledger.get_my_indexes(&oracle(0)).is_err());

    let indices = ledger.register_oracle(&oracle(0), Amount::units(1)).unwrap();
    assert_eq!(indices, vec![0, REQUEST_INDEX, 7]);
    assert_eq!(ledger.get_my_indexes(&oracle(0)).unwrap(), indices);

    let err = ledger
        .register_oracle(&oracle(0), Amount::units(1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyRegistered { .. }));
    assert_eq!(ledger.oracle_count(), 1);
    assert_eq!(ledger.total_oracle_stake(), Some(Amount::units(1)));
    // Stakes never enter the insurance pool.
    assert_eq!(ledger.escrow_balance(), Amount::units(10));
}

fn digest_ledger(entropy: &str) -> FlightSuretyLedger {
    FlightSuretyLedger::new(LedgerConfig::default(), acct("owner"), acct("air-0"), entropy)
        .expect("default config is valid")
}

#[test]
fn digest_source_assigns_distinct_indices() {
    let mut ledger = digest_ledger("block-1");
    for i in 0..20 {
        let indices = ledger.register_oracle(&oracle(i), Amount::units(1)).unwrap();
        assert_eq!(indices.len(), 3);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices.iter().all(|i| *i < 10));
    }
    assert_eq!(ledger.oracle_count(), 20);
    assert_eq!(ledger.total_oracle_stake(), Some(Amount::units(20)));
}

#[test]
fn index_assignment_depends_on_entropy() {
    let assign = |entropy: &str| -> Vec<Vec<u8>> {
        let mut ledger = digest_ledger(entropy);
        (0..20)
            .map(|i| ledger.register_oracle(&oracle(i), Amount::units(1)).unwrap())
            .collect()
    };
    assert_eq!(assign("block-1"), assign("block-1"));
    assert_ne!(assign("block-1"), assign("block-2"));
}

// ─── Requests ───────────────────────────────────────────────────────

#[test]
fn fetch_requires_a_registered_flight() {
    let (mut ledger, _) = setup(0, 0);
    let err = ledger
        .fetch_flight_status(
            &acct("air-0"),
            FlightCode::new("NOPE").unwrap(),
            Timestamp::from_epoch_secs(1).unwrap(),
            &acct("pax-0"),
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownEntity { .. }));
}

#[test]
fn refetching_an_open_request_reemits_the_signal() {
    let (mut ledger, keys) = setup(1, 0);
    fetch(&mut ledger, &keys[0]);
    fetch(&mut ledger, &keys[0]);
    assert_eq!(ledger.pending_requests().len(), 1);
    let events = ledger.drain_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(
        e,
        LedgerEvent::OracleRequest { index: REQUEST_INDEX, .. }
    )));
}

#[test]
fn responses_are_validated() {
    let (mut ledger, keys) = setup(1, 3);
    let key = &keys[0];
    ledger
        .register_oracle(&acct("oracle-outsider"), Amount::units(1))
        .unwrap();

    // No request yet.
    let err = submit(&mut ledger, key, &oracle(0), REQUEST_INDEX, StatusCode::OnTime).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownEntity { .. }));

    fetch(&mut ledger, key);
    let err = submit(&mut ledger, key, &acct("stranger"), REQUEST_INDEX, StatusCode::OnTime)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
    let err = submit(
        &mut ledger,
        key,
        &acct("oracle-outsider"),
        REQUEST_INDEX,
        StatusCode::OnTime,
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));

    // Assigned index, but no request opened at it.
    let err = submit(&mut ledger, key, &oracle(0), 7, StatusCode::OnTime).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownEntity { .. }));
}

#[test]
fn duplicate_response_is_not_counted() {
    let (mut ledger, keys) = setup(1, 3);
    let key = &keys[0];
    fetch(&mut ledger, key);
    submit(&mut ledger, key, &oracle(0), REQUEST_INDEX, StatusCode::LateAirline).unwrap();
    ledger.drain_events();

    let outcome =
        submit(&mut ledger, key, &oracle(0), REQUEST_INDEX, StatusCode::OnTime).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Duplicate {
            previous: StatusCode::LateAirline
        }
    );
    assert!(ledger.drain_events().is_empty());

    let pending = ledger.pending_requests();
    let request = pending[0];
    assert_eq!(request.support(StatusCode::LateAirline), 1);
    assert_eq!(request.support(StatusCode::OnTime), 0);
}

#[test]
fn split_responses_wait_for_quorum() {
    let (mut ledger, keys) = setup(1, 5);
    let key = &keys[0];
    fetch(&mut ledger, key);
    for (i, status) in [
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::OnTime,
        StatusCode::LateAirline,
    ]
    .into_iter()
    .enumerate()
    {
        let outcome = submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, status).unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Pending { .. }));
    }
    assert_eq!(ledger.flight_status(key), Some(StatusCode::Unknown));

    let outcome =
        submit(&mut ledger, key, &oracle(4), REQUEST_INDEX, StatusCode::LateAirline).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Resolved {
            status: StatusCode::LateAirline
        }
    );
    assert_eq!(ledger.flight_status(key), Some(StatusCode::LateAirline));
    assert!(ledger.pending_requests().is_empty());
}

#[test]
fn late_responses_are_recorded_without_effect() {
    let (mut ledger, keys) = setup(1, 4);
    let key = &keys[0];
    fetch(&mut ledger, key);
    for i in 0..3 {
        submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::LateTechnical).unwrap();
    }
    let outcome = submit(&mut ledger, key, &oracle(3), REQUEST_INDEX, StatusCode::OnTime).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Late {
            resolved: StatusCode::LateTechnical
        }
    );
    assert_eq!(ledger.flight_status(key), Some(StatusCode::LateTechnical));

    // A resolved request is not reopened.
    ledger.drain_events();
    fetch(&mut ledger, key);
    assert!(ledger.drain_events().is_empty());
    assert!(ledger.pending_requests().is_empty());
}

#[test]
fn late_responses_can_be_rejected() {
    let config = LedgerConfig {
        late_response_policy: surety_core::LateResponsePolicy::Reject,
        ..LedgerConfig::default()
    };
    let mut ledger = FlightSuretyLedger::with_parts(
        config,
        acct("owner"),
        acct("air-0"),
        Box::new(FixedIndexSource::new(vec![0, REQUEST_INDEX, 7], REQUEST_INDEX)),
        InMemoryRail::new(),
    )
    .unwrap();
    let air = acct("air-0");
    ledger.fund(&air, Amount::units(10)).unwrap();
    let key = ledger
        .register_flight(
            &air,
            FlightCode::new("F0").unwrap(),
            Timestamp::from_epoch_secs(1).unwrap(),
            &air,
        )
        .unwrap();
    for i in 0..4 {
        ledger.register_oracle(&oracle(i), Amount::units(1)).unwrap();
    }
    fetch(&mut ledger, &key);
    for i in 0..3 {
        submit(&mut ledger, &key, &oracle(i), REQUEST_INDEX, StatusCode::OnTime).unwrap();
    }
    let err = submit(&mut ledger, &key, &oracle(3), REQUEST_INDEX, StatusCode::OnTime).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyResolved { .. }));
}

#[test]
fn unknown_quorum_leaves_flight_open_for_a_new_request() {
    let (mut ledger, keys) = setup(1, 3);
    let key = &keys[0];
    fetch(&mut ledger, key);
    for i in 0..3 {
        submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::Unknown).unwrap();
    }
    assert_eq!(ledger.flight_status(key), Some(StatusCode::Unknown));
    assert!(!ledger.flight(key).unwrap().is_resolved());
    assert!(ledger.pending_requests().is_empty());

    fetch(&mut ledger, key);
    let pending = ledger.pending_requests();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].state(), RequestState::Open);

    for i in 0..3 {
        submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::LateOther).unwrap();
    }
    assert_eq!(ledger.flight_status(key), Some(StatusCode::LateOther));
}

#[test]
fn purchases_beyond_escrow_cover_are_rejected() {
    let (mut ledger, keys) = setup(1, 3);
    let key = &keys[0];
    // 10 funding covers the extra half unit on 20 one-unit policies.
    for p in 0..20 {
        ledger.buy(key, &acct(&format!("pax-{p}")), Amount::units(1)).unwrap();
    }
    let err = ledger
        .buy(key, &acct("pax-20"), Amount::units(1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientEscrow { .. }));
    assert_eq!(ledger.escrow_balance(), Amount::units(30));
    assert!(ledger.policy(&acct("pax-20"), key).is_none());

    // Another airline's funding restores room for the purchase.
    let air = acct("air-0");
    ledger.register_airline(acct("air-1"), &air).unwrap();
    ledger.fund(&acct("air-1"), Amount::units(10)).unwrap();
    ledger.buy(key, &acct("pax-20"), Amount::units(1)).unwrap();

    fetch(&mut ledger, key);
    for i in 0..3 {
        submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::LateAirline).unwrap();
    }
    assert_eq!(ledger.flight_status(key), Some(StatusCode::LateAirline));
    assert_eq!(
        ledger.credit_owed(&acct("pax-20"), key),
        Amount::new(Amount::UNIT * 3 / 2)
    );
    assert!(ledger.escrow().is_solvent());
}

#[test]
fn delay_quorum_on_a_fully_sold_flight_beats_later_reports() {
    let (mut ledger, keys) = setup(1, 6);
    let key = &keys[0];
    let mut sold = 0;
    while ledger
        .buy(key, &acct(&format!("pax-{sold}")), Amount::units(1))
        .is_ok()
    {
        sold += 1;
    }
    assert_eq!(sold, 20);

    fetch(&mut ledger, key);
    for i in 0..2 {
        submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::LateAirline).unwrap();
    }
    let outcome =
        submit(&mut ledger, key, &oracle(2), REQUEST_INDEX, StatusCode::LateAirline).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Resolved {
            status: StatusCode::LateAirline
        }
    );
    for i in 3..6 {
        let outcome = submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, StatusCode::OnTime).unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Late {
                resolved: StatusCode::LateAirline
            }
        );
    }

    assert_eq!(ledger.flight_status(key), Some(StatusCode::LateAirline));
    for p in 0..sold {
        assert_eq!(
            ledger.policy(&acct(&format!("pax-{p}")), key).unwrap().status,
            PolicyStatus::Credited
        );
    }
    assert_eq!(ledger.escrow_liabilities().unwrap(), Amount::units(30));
    assert!(ledger.escrow().is_solvent());
}

// ─── Properties ─────────────────────────────────────────────────────

proptest! {
    /// Three delay reports and two on-time reports resolve to the delay
    /// whatever order they arrive in.
    #[test]
    fn resolution_does_not_depend_on_arrival_order(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let (mut ledger, keys) = setup(1, 5);
        let key = &keys[0];
        let pax = acct("pax-1");
        ledger.buy(key, &pax, Amount::units(1)).unwrap();
        fetch(&mut ledger, key);

        let mut resolved = 0;
        for i in order {
            let status = if i < 3 { StatusCode::LateWeather } else { StatusCode::OnTime };
            let outcome = submit(&mut ledger, key, &oracle(i), REQUEST_INDEX, status).unwrap();
            if matches!(outcome, SubmissionOutcome::Resolved { .. }) {
                resolved += 1;
            }
        }

        prop_assert_eq!(resolved, 1);
        prop_assert_eq!(ledger.flight_status(key), Some(StatusCode::LateWeather));
        prop_assert_eq!(ledger.credit_owed(&pax, key), Amount::new(Amount::UNIT * 3 / 2));
    }
}

#[derive(Debug, Clone)]
enum Op {
    Buy { pax: usize, flight: usize, millis: u64 },
    Withdraw { pax: usize, flight: usize },
    Pay { pax: usize },
    Report { oracle: usize, flight: usize, status: usize },
    Fetch { flight: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..2usize, 1..=1000u64)
            .prop_map(|(pax, flight, millis)| Op::Buy { pax, flight, millis }),
        (0..4usize, 0..2usize).prop_map(|(pax, flight)| Op::Withdraw { pax, flight }),
        (0..4usize).prop_map(|pax| Op::Pay { pax }),
        (0..5usize, 0..2usize, 0..6usize)
            .prop_map(|(oracle, flight, status)| Op::Report { oracle, flight, status }),
        (0..2usize).prop_map(|flight| Op::Fetch { flight }),
    ]
}

proptest! {
    /// Funds held plus funds paid out always equals funds deposited, and
    /// liabilities never exceed what is held.
    #[test]
    fn escrow_stays_solvent_under_any_interleaving(
        ops in proptest::collection::vec(op_strategy(), 1..60)
    ) {
        let (mut ledger, keys) = setup(2, 5);
        let mut deposited = Amount::units(10);

        for op in ops {
            match op {
                Op::Buy { pax, flight, millis } => {
                    let amount = Amount::new(u128::from(millis) * (Amount::UNIT / 1000));
                    let who = acct(&format!("pax-{pax}"));
                    if ledger.buy(&keys[flight], &who, amount).is_ok() {
                        deposited = deposited.checked_add(amount).unwrap();
                    }
                }
                Op::Withdraw { pax, flight } => {
                    let _ = ledger.withdraw(&keys[flight], &acct(&format!("pax-{pax}")));
                }
                Op::Pay { pax } => {
                    let _ = ledger.pay(&acct(&format!("pax-{pax}")));
                }
                Op::Report { oracle: i, flight, status } => {
                    let status = StatusCode::all()[status];
                    let result = submit(&mut ledger, &keys[flight], &oracle(i), REQUEST_INDEX, status);
                    prop_assert!(
                        !matches!(result, Err(LedgerError::InsufficientEscrow { .. })),
                        "report must not fail with InsufficientEscrow: {:?}",
                        result
                    );
                }
                Op::Fetch { flight } => fetch(&mut ledger, &keys[flight]),
            }

            let paid = ledger.rail().total_paid().unwrap();
            prop_assert_eq!(ledger.escrow_balance().checked_add(paid), Some(deposited));
            prop_assert!(ledger.escrow().is_solvent());
            prop_assert!(
                ledger.escrow().worst_case_liabilities(ledger.config()).unwrap()
                    <= ledger.escrow_balance()
            );
        }
    }
}
