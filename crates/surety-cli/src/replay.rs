//! # Replay Subcommand
//!
//! Executes a scripted ledger session in-process and reports, per step,
//! the outcome (or error) and the signals the ledger emitted.
//!
//! A script is YAML or JSON:
//!
//! ```yaml
//! owner: owner
//! first_airline: air-0
//! steps:
//!   - op: fund
//!     caller: air-0
//!     amount: "10000000000000000000"
//!   - op: register_flight
//!     caller: air-0
//!     flight: { airline: air-0, code: ND1309, timestamp: 1700000000 }
//!   - op: relay
//!     status: 20
//! ```
//!
//! Amounts are strings in smallest units. A step marked `expect_error: true`
//! passes only if the ledger rejects it. The `relay` step stands in for
//! external oracle workers: every oracle registered during the session
//! answers every pending request at one of its indices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use surety_core::{Amount, FlightKey, LedgerAccount, LedgerConfig, LedgerError, StatusCode};
use surety_escrow::{CreditPlan, InMemoryRail, Payout};
use surety_ledger::{FlightSuretyLedger, LedgerEvent};
use surety_state::{
    AdmissionOutcome, DigestIndexSource, RequestKey, StatusApplication, SubmissionOutcome,
};

/// Arguments for the `surety replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the session script (YAML or JSON).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Continue after a step fails unexpectedly.
    #[arg(long)]
    pub keep_going: bool,
}

// ─── Script ─────────────────────────────────────────────────────────

/// A scripted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Administrative owner of the ledger.
    pub owner: LedgerAccount,
    /// Airline admitted at construction.
    pub first_airline: LedgerAccount,
    /// Entropy mixed into index derivation.
    #[serde(default)]
    pub entropy: Option<String>,
    /// Overrides the configuration passed on the command line.
    #[serde(default)]
    pub config: Option<LedgerConfig>,
    /// Operations, in order.
    pub steps: Vec<Step>,
}

/// One scripted operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    /// The step passes only if the ledger rejects it.
    #[serde(default)]
    pub expect_error: bool,
}

/// A ledger operation, named as in the ledger API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    SetOperatingStatus {
        caller: LedgerAccount,
        operational: bool,
    },
    AuthorizeCaller {
        caller: LedgerAccount,
        account: LedgerAccount,
    },
    DeauthorizeCaller {
        caller: LedgerAccount,
        account: LedgerAccount,
    },
    RegisterAirline {
        caller: LedgerAccount,
        candidate: LedgerAccount,
    },
    Fund {
        caller: LedgerAccount,
        amount: Amount,
    },
    RegisterFlight {
        caller: LedgerAccount,
        flight: FlightKey,
    },
    FetchFlightStatus {
        caller: LedgerAccount,
        flight: FlightKey,
    },
    ProcessFlightStatus {
        caller: LedgerAccount,
        flight: FlightKey,
        status: StatusCode,
    },
    Buy {
        caller: LedgerAccount,
        flight: FlightKey,
        amount: Amount,
    },
    Withdraw {
        caller: LedgerAccount,
        flight: FlightKey,
    },
    CreditInsurees {
        caller: LedgerAccount,
        flight: FlightKey,
    },
    Pay {
        caller: LedgerAccount,
    },
    RegisterOracle {
        caller: LedgerAccount,
        stake: Amount,
    },
    SubmitOracleResponse {
        caller: LedgerAccount,
        index: u8,
        flight: FlightKey,
        status: StatusCode,
    },
    /// Every session oracle answers every pending request it is assigned.
    Relay {
        status: StatusCode,
    },
}

impl Op {
    /// Operation name as written in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetOperatingStatus { .. } => "set_operating_status",
            Self::AuthorizeCaller { .. } => "authorize_caller",
            Self::DeauthorizeCaller { .. } => "deauthorize_caller",
            Self::RegisterAirline { .. } => "register_airline",
            Self::Fund { .. } => "fund",
            Self::RegisterFlight { .. } => "register_flight",
            Self::FetchFlightStatus { .. } => "fetch_flight_status",
            Self::ProcessFlightStatus { .. } => "process_flight_status",
            Self::Buy { .. } => "buy",
            Self::Withdraw { .. } => "withdraw",
            Self::CreditInsurees { .. } => "credit_insurees",
            Self::Pay { .. } => "pay",
            Self::RegisterOracle { .. } => "register_oracle",
            Self::SubmitOracleResponse { .. } => "submit_oracle_response",
            Self::Relay { .. } => "relay",
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────

/// What a successful step returned.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Done,
    Admission(AdmissionOutcome),
    Flight(FlightKey),
    Request(RequestKey),
    Status(StatusApplication),
    Credit(CreditPlan),
    Payout(Payout),
    Indices(Vec<u8>),
    Submission(SubmissionOutcome),
    Relay(Vec<RelayResponse>),
}

/// One oracle's answer during a `relay` step.
#[derive(Debug, Clone, Serialize)]
pub struct RelayResponse {
    pub oracle: LedgerAccount,
    pub request: RequestKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SubmissionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub ok: bool,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<LedgerEvent>,
}

/// Ledger state after the session.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub operational: bool,
    pub escrow_balance: Amount,
    pub escrow_liabilities: Amount,
    pub solvent: bool,
    pub paid_out: Amount,
    pub steps_run: usize,
    pub failures: usize,
}

/// Full session report.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub summary: Summary,
}

impl ReplayReport {
    /// Whether every step behaved as scripted.
    pub fn passed(&self) -> bool {
        self.summary.failures == 0
    }
}

// ─── Execution ──────────────────────────────────────────────────────

/// Execute the replay subcommand.
///
/// Returns exit code 0 when every step behaved as scripted, 1 otherwise.
pub fn run_replay(args: &ReplayArgs, config: &LedgerConfig) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script: {}", args.script.display()))?;
    let script: Script = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse script: {}", args.script.display()))?;

    let report = replay(&script, config, args.keep_going)?;
    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(out) => {
            std::fs::write(out, json)
                .with_context(|| format!("failed to write report: {}", out.display()))?;
            println!(
                "{}: {} steps, {} failures",
                if report.passed() { "OK" } else { "FAIL" },
                report.summary.steps_run,
                report.summary.failures
            );
        }
        None => println!("{json}"),
    }
    Ok(if report.passed() { 0 } else { 1 })
}

/// Run `script` against a fresh ledger.
///
/// Stops at the first step that does not behave as scripted unless
/// `keep_going` is set.
pub fn replay(script: &Script, config: &LedgerConfig, keep_going: bool) -> Result<ReplayReport> {
    let config = script.config.clone().unwrap_or_else(|| config.clone());
    let source = DigestIndexSource::with_entropy(script.entropy.clone().unwrap_or_default());
    let mut ledger = FlightSuretyLedger::with_parts(
        config,
        script.owner.clone(),
        script.first_airline.clone(),
        Box::new(source),
        InMemoryRail::new(),
    )
    .context("failed to construct ledger")?;

    let mut session = Session {
        ledger: &mut ledger,
        oracles: Vec::new(),
    };
    let mut steps = Vec::with_capacity(script.steps.len());
    let mut failures = 0;

    for (i, step) in script.steps.iter().enumerate() {
        let op = step.op.name();
        tracing::debug!(step = i, op, "replaying step");
        let result = session.execute(&step.op);
        let events = session.ledger.drain_events();
        let ok = result.is_ok();
        let passed = ok != step.expect_error;
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => (None, Some(e.to_string())),
        };
        if !passed {
            failures += 1;
            tracing::warn!(step = i, op, error = ?error, "step did not behave as scripted");
        }
        steps.push(StepReport {
            step: i,
            op,
            ok,
            passed,
            outcome,
            error,
            events,
        });
        if !passed && !keep_going {
            break;
        }
    }

    let summary = Summary {
        operational: ledger.is_operational(),
        escrow_balance: ledger.escrow_balance(),
        escrow_liabilities: ledger
            .escrow_liabilities()
            .context("escrow liabilities overflowed")?,
        solvent: ledger.escrow().is_solvent(),
        paid_out: ledger
            .rail()
            .total_paid()
            .context("paid-out total overflowed")?,
        steps_run: steps.len(),
        failures,
    };
    tracing::info!(
        steps = summary.steps_run,
        failures = summary.failures,
        solvent = summary.solvent,
        "replay finished"
    );
    Ok(ReplayReport { steps, summary })
}

struct Session<'a> {
    ledger: &'a mut FlightSuretyLedger,
    oracles: Vec<LedgerAccount>,
}

impl Session<'_> {
    fn execute(&mut self, op: &Op) -> Result<Outcome, LedgerError> {
        let ledger = &mut *self.ledger;
        Ok(match op {
            Op::SetOperatingStatus { caller, operational } => {
                ledger.set_operating_status(*operational, caller)?;
                Outcome::Done
            }
            Op::AuthorizeCaller { caller, account } => {
                ledger.authorize_caller(account.clone(), caller)?;
                Outcome::Done
            }
            Op::DeauthorizeCaller { caller, account } => {
                ledger.deauthorize_caller(account, caller)?;
                Outcome::Done
            }
            Op::RegisterAirline { caller, candidate } => {
                Outcome::Admission(ledger.register_airline(candidate.clone(), caller)?)
            }
            Op::Fund { caller, amount } => {
                ledger.fund(caller, *amount)?;
                Outcome::Done
            }
            Op::RegisterFlight { caller, flight } => Outcome::Flight(ledger.register_flight(
                &flight.airline,
                flight.code,
                flight.timestamp,
                caller,
            )?),
            Op::FetchFlightStatus { caller, flight } => Outcome::Request(
                ledger.fetch_flight_status(&flight.airline, flight.code, flight.timestamp, caller)?,
            ),
            Op::ProcessFlightStatus {
                caller,
                flight,
                status,
            } => Outcome::Status(ledger.process_flight_status(
                &flight.airline,
                flight.code,
                flight.timestamp,
                *status,
                caller,
            )?),
            Op::Buy {
                caller,
                flight,
                amount,
            } => {
                ledger.buy(flight, caller, *amount)?;
                Outcome::Done
            }
            Op::Withdraw { caller, flight } => Outcome::Payout(ledger.withdraw(flight, caller)?),
            Op::CreditInsurees { caller, flight } => {
                Outcome::Credit(ledger.credit_insurees(flight, caller)?)
            }
            Op::Pay { caller } => Outcome::Payout(ledger.pay(caller)?),
            Op::RegisterOracle { caller, stake } => {
                let indices = ledger.register_oracle(caller, *stake)?;
                self.oracles.push(caller.clone());
                Outcome::Indices(indices)
            }
            Op::SubmitOracleResponse {
                caller,
                index,
                flight,
                status,
            } => Outcome::Submission(ledger.submit_oracle_response(
                *index,
                &flight.airline,
                flight.code,
                flight.timestamp,
                *status,
                caller,
            )?),
            Op::Relay { status } => Outcome::Relay(self.relay(*status)),
        })
    }

    fn relay(&mut self, status: StatusCode) -> Vec<RelayResponse> {
        let requests: Vec<RequestKey> = self
            .ledger
            .pending_requests()
            .into_iter()
            .map(|r| r.key.clone())
            .collect();
        let mut responses = Vec::new();
        for request in requests {
            for oracle in &self.oracles {
                let assigned = self
                    .ledger
                    .get_my_indexes(oracle)
                    .is_ok_and(|indices| indices.contains(&request.index));
                if !assigned {
                    continue;
                }
                let result = self.ledger.submit_oracle_response(
                    request.index,
                    &request.flight.airline,
                    request.flight.code,
                    request.flight.timestamp,
                    status,
                    oracle,
                );
                let (outcome, error) = match result {
                    Ok(outcome) => (Some(outcome), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                responses.push(RelayResponse {
                    oracle: oracle.clone(),
                    request: request.clone(),
                    outcome,
                    error,
                });
            }
        }
        responses
    }
}
