//! # Insurance Escrow
//!
//! Pooled funds held on behalf of passengers: airline funding, premiums,
//! and credited payouts all live in one balance.
//!
//! ## Solvency Invariant
//!
//! After every committed operation,
//!
//! ```text
//! Σ credit_owed (CREDITED) + Σ premium (ACTIVE) ≤ held
//! ```
//!
//! Crediting is planned first ([`InsuranceEscrow::plan_credit`]) and
//! refused with `InsufficientEscrow` if committing it would break the
//! invariant. Payouts zero the owed amount and debit the pool before the
//! external transfer; a refused transfer restores both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use surety_core::{Amount, FlightKey, LedgerAccount, LedgerConfig, LedgerError, Timestamp};
use surety_state::{AirlineRegistry, Flight};

use crate::payout::PayoutRail;
use crate::policy::{InsurancePolicy, PolicyKey, PolicyStatus};

// ── Escrow Transaction ─────────────────────────────────────────────────

/// Kinds of movements recorded against the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Airline funding contribution.
    AirlineFunding,
    /// Passenger premium.
    Premium,
    /// Payout credited to a policy (no funds move).
    Credit,
    /// Credited payout transferred out.
    Payout,
    /// Premium returned before resolution.
    Refund,
    /// Premium released to the pool after an uncovered resolution.
    Expiry,
}

/// A recorded movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// The airline or passenger involved.
    pub account: LedgerAccount,
    /// The flight involved, if any.
    pub flight: Option<FlightKey>,
    /// Amount involved.
    pub amount: Amount,
    /// When it was recorded.
    pub timestamp: Timestamp,
}

// ── Credit Plans and Payouts ───────────────────────────────────────────

/// Credits that [`InsuranceEscrow::apply_credit`] would write for a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPlan {
    /// The flight being credited.
    pub flight: FlightKey,
    /// Payout per still-active policy.
    pub credits: Vec<(PolicyKey, Amount)>,
    /// Sum of all payouts.
    pub total: Amount,
}

impl CreditPlan {
    /// Whether every policy on the flight is already settled or credited.
    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

/// What a withdrawal or payment transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// A credited payout.
    Credit,
    /// A premium refund.
    Refund,
}

/// A completed transfer out of the escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Who received the funds.
    pub recipient: LedgerAccount,
    /// Amount transferred.
    pub amount: Amount,
    /// Refund or credit.
    pub kind: PayoutKind,
    /// Policies settled by this transfer.
    pub policies: Vec<PolicyKey>,
}

// ── Insurance Escrow ───────────────────────────────────────────────────

/// Pooled passenger and airline funds plus every policy.
#[derive(Debug, Clone, Default)]
pub struct InsuranceEscrow {
    policies: BTreeMap<PolicyKey, InsurancePolicy>,
    held: Amount,
    transactions: Vec<EscrowTransaction>,
}

impl InsuranceEscrow {
    /// An empty escrow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total funds held.
    pub fn held(&self) -> Amount {
        self.held
    }

    /// Current liabilities: credits owed plus premiums of active policies.
    pub fn liabilities(&self) -> Result<Amount, LedgerError> {
        Amount::checked_sum(self.policies.values().map(InsurancePolicy::liability))
            .ok_or_else(|| LedgerError::ArithmeticOverflow("escrow liabilities".into()))
    }

    /// Liabilities if every active policy is later credited: credits owed
    /// plus the larger of premium and payout for each active policy.
    pub fn worst_case_liabilities(&self, config: &LedgerConfig) -> Result<Amount, LedgerError> {
        let mut total = Amount::ZERO;
        for policy in self.policies.values() {
            let exposure = match policy.status {
                PolicyStatus::Active => worst_case_payout(policy.premium, config)?,
                PolicyStatus::Credited => policy.credit_owed,
                PolicyStatus::Paid | PolicyStatus::Refunded | PolicyStatus::Expired => continue,
            };
            total = total
                .checked_add(exposure)
                .ok_or_else(|| LedgerError::ArithmeticOverflow("escrow exposure".into()))?;
        }
        Ok(total)
    }

    /// Whether liabilities are covered by the funds held.
    pub fn is_solvent(&self) -> bool {
        self.liabilities().is_ok_and(|owed| owed <= self.held)
    }

    /// Transaction history, oldest first.
    pub fn transactions(&self) -> &[EscrowTransaction] {
        &self.transactions
    }

    /// Look up a policy.
    pub fn policy(&self, key: &PolicyKey) -> Option<&InsurancePolicy> {
        self.policies.get(key)
    }

    /// Policies held by `passenger`, in flight order.
    pub fn policies_of<'a>(
        &'a self,
        passenger: &'a LedgerAccount,
    ) -> impl Iterator<Item = &'a InsurancePolicy> {
        self.policies
            .values()
            .filter(move |p| p.key.passenger == *passenger)
    }

    /// Policies on `flight`.
    pub fn policies_on<'a>(&'a self, flight: &'a FlightKey) -> impl Iterator<Item = &'a InsurancePolicy> {
        self.policies.values().filter(move |p| p.key.flight == *flight)
    }

    /// Credit owed to `passenger` on `flight`.
    pub fn credit_owed(&self, passenger: &LedgerAccount, flight: &FlightKey) -> Amount {
        self.policy(&PolicyKey::new(passenger.clone(), flight.clone()))
            .filter(|p| p.status == PolicyStatus::Credited)
            .map_or(Amount::ZERO, |p| p.credit_owed)
    }

    /// Credit owed to `passenger` across all flights.
    pub fn total_owed(&self, passenger: &LedgerAccount) -> Result<Amount, LedgerError> {
        Amount::checked_sum(
            self.policies_of(passenger)
                .filter(|p| p.status == PolicyStatus::Credited)
                .map(|p| p.credit_owed),
        )
        .ok_or_else(|| LedgerError::ArithmeticOverflow("total owed".into()))
    }

    /// Add an airline's funding contribution to the pool.
    pub fn deposit_funding(&mut self, airline: &LedgerAccount, amount: Amount) -> Result<(), LedgerError> {
        self.held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| LedgerError::ArithmeticOverflow("airline funding".into()))?;
        self.record(TransactionType::AirlineFunding, airline, None, amount);
        Ok(())
    }

    /// Validate a purchase without changing anything.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for a zero amount or one above the cap.
    /// - [`LedgerError::AlreadyResolved`] if the flight already has a status.
    /// - [`LedgerError::DuplicatePurchase`] if an outstanding policy exists,
    ///   or a withdrawn one exists and repurchase is disabled.
    /// - [`LedgerError::InsufficientEscrow`] if crediting every active
    ///   policy, this one included, would exceed the funds held.
    pub fn check_purchase(
        &self,
        passenger: &LedgerAccount,
        flight: &Flight,
        amount: Amount,
        config: &LedgerConfig,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                operation: "buy insurance".into(),
                amount: amount.to_string(),
                reason: "premium must be positive".into(),
            });
        }
        if amount > config.insurance_cap {
            return Err(LedgerError::InvalidAmount {
                operation: "buy insurance".into(),
                amount: amount.to_string(),
                reason: format!("above the insurance cap of {}", config.insurance_cap),
            });
        }
        if flight.is_resolved() {
            return Err(LedgerError::already_resolved("flight", &flight.key));
        }
        let key = PolicyKey::new(passenger.clone(), flight.key.clone());
        if let Some(existing) = self.policies.get(&key) {
            if existing.status.is_outstanding() || !config.repurchase_after_withdrawal {
                return Err(LedgerError::DuplicatePurchase {
                    passenger: passenger.to_string(),
                    flight: flight.key.to_string(),
                });
            }
        }
        let available = self
            .held
            .checked_add(amount)
            .ok_or_else(|| LedgerError::ArithmeticOverflow("premium".into()))?;
        let required = self
            .worst_case_liabilities(config)?
            .checked_add(worst_case_payout(amount, config)?)
            .ok_or_else(|| LedgerError::ArithmeticOverflow("escrow exposure".into()))?;
        if required > available {
            return Err(LedgerError::InsufficientEscrow {
                required: required.to_string(),
                available: available.to_string(),
            });
        }
        Ok(())
    }

    /// Buy a policy, holding the premium in the pool.
    pub fn buy(
        &mut self,
        passenger: &LedgerAccount,
        flight: &Flight,
        amount: Amount,
        config: &LedgerConfig,
    ) -> Result<&InsurancePolicy, LedgerError> {
        self.check_purchase(passenger, flight, amount, config)?;
        self.held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| LedgerError::ArithmeticOverflow("premium".into()))?;
        self.record(TransactionType::Premium, passenger, Some(&flight.key), amount);
        let key = PolicyKey::new(passenger.clone(), flight.key.clone());
        let policy = InsurancePolicy::purchase(key.clone(), amount);
        self.policies.insert(key.clone(), policy);
        self.policies
            .get(&key)
            .ok_or_else(|| LedgerError::unknown("policy", &key))
    }

    /// Check that `caller` may credit the insurees of `flight`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] unless `caller` is the flight's own
    /// admitted, funded airline and the flight resolved to a covered delay.
    pub fn authorize_credit(
        &self,
        flight: &Flight,
        caller: &LedgerAccount,
        airlines: &AirlineRegistry,
        config: &LedgerConfig,
    ) -> Result<(), LedgerError> {
        if *caller != flight.key.airline {
            return Err(LedgerError::unauthorized(
                caller,
                "credit insurees",
                "only the operating airline may credit its insurees",
            ));
        }
        airlines.require_active_member(caller, "credit insurees")?;
        if !config.is_covered(flight.status) {
            return Err(LedgerError::unauthorized(
                caller,
                "credit insurees",
                format!("flight status {} is not a covered delay", flight.status.as_str()),
            ));
        }
        Ok(())
    }

    /// Work out the credits for every still-active policy on `flight`.
    ///
    /// Pure. Policies that are already credited or settled are skipped, so
    /// planning again after [`Self::apply_credit`] yields an empty plan.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ArithmeticOverflow`] if a payout overflows.
    /// - [`LedgerError::InsufficientEscrow`] if the credits would leave
    ///   liabilities above the funds held. Unreachable for policies bought
    ///   through [`Self::buy`], which bounds [`Self::worst_case_liabilities`].
    pub fn plan_credit(&self, flight: &FlightKey, config: &LedgerConfig) -> Result<CreditPlan, LedgerError> {
        let mut credits = Vec::new();
        let mut released = Amount::ZERO;
        for policy in self
            .policies_on(flight)
            .filter(|p| p.status == PolicyStatus::Active)
        {
            let payout = policy
                .premium
                .checked_mul_ratio(config.payout_numerator, config.payout_denominator)
                .ok_or_else(|| LedgerError::ArithmeticOverflow("payout multiplier".into()))?;
            released = released
                .checked_add(policy.premium)
                .ok_or_else(|| LedgerError::ArithmeticOverflow("credit plan".into()))?;
            credits.push((policy.key.clone(), payout));
        }
        let total = Amount::checked_sum(credits.iter().map(|(_, a)| *a))
            .ok_or_else(|| LedgerError::ArithmeticOverflow("credit plan".into()))?;

        let required = self
            .liabilities()?
            .checked_sub(released)
            .and_then(|rest| rest.checked_add(total))
            .ok_or_else(|| LedgerError::ArithmeticOverflow("credit plan".into()))?;
        if required > self.held {
            return Err(LedgerError::InsufficientEscrow {
                required: required.to_string(),
                available: self.held.to_string(),
            });
        }
        Ok(CreditPlan {
            flight: flight.clone(),
            credits,
            total,
        })
    }

    /// Commit a plan from [`Self::plan_credit`].
    ///
    /// Entries whose policy is no longer active are skipped.
    pub fn apply_credit(&mut self, plan: &CreditPlan) {
        for (key, payout) in &plan.credits {
            let Some(policy) = self.policies.get_mut(key) else {
                continue;
            };
            if policy.status != PolicyStatus::Active {
                continue;
            }
            policy.status = PolicyStatus::Credited;
            policy.credit_owed = *payout;
            self.transactions.push(EscrowTransaction {
                transaction_type: TransactionType::Credit,
                account: key.passenger.clone(),
                flight: Some(key.flight.clone()),
                amount: *payout,
                timestamp: Timestamp::now(),
            });
        }
    }

    /// Expire every active policy on a flight that resolved without a
    /// covered delay. Their premiums stay in the pool.
    ///
    /// Returns the number of policies expired.
    pub fn expire_policies(&mut self, flight: &FlightKey) -> usize {
        let now = Timestamp::now();
        let mut expired = Vec::new();
        for policy in self
            .policies
            .values_mut()
            .filter(|p| p.key.flight == *flight && p.status == PolicyStatus::Active)
        {
            policy.status = PolicyStatus::Expired;
            policy.settled_at = Some(now);
            expired.push((policy.key.passenger.clone(), policy.premium));
        }
        let count = expired.len();
        for (passenger, premium) in expired {
            self.record(TransactionType::Expiry, &passenger, Some(flight), premium);
        }
        count
    }

    /// Withdraw what one policy owes: the credit if credited, the premium
    /// if the flight has not resolved yet.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownEntity`] if `passenger` holds no policy on the flight.
    /// - [`LedgerError::NothingOwed`] if the policy is settled, or the flight
    ///   resolved without a credit.
    /// - [`LedgerError::TransferFailed`] if the rail refuses; nothing changes.
    pub fn withdraw(
        &mut self,
        passenger: &LedgerAccount,
        flight: &Flight,
        rail: &mut dyn PayoutRail,
    ) -> Result<Payout, LedgerError> {
        let key = PolicyKey::new(passenger.clone(), flight.key.clone());
        let policy = self
            .policies
            .get(&key)
            .ok_or_else(|| LedgerError::unknown("policy", &key))?;
        let (amount, settled, kind) = match policy.status {
            PolicyStatus::Credited => (policy.credit_owed, PolicyStatus::Paid, PayoutKind::Credit),
            PolicyStatus::Active if !flight.is_resolved() => {
                (policy.premium, PolicyStatus::Refunded, PayoutKind::Refund)
            }
            PolicyStatus::Active => {
                return Err(nothing_owed(
                    passenger,
                    format!(
                        "flight resolved to {} and no credit was issued",
                        flight.status.as_str()
                    ),
                ))
            }
            PolicyStatus::Paid | PolicyStatus::Refunded => {
                return Err(nothing_owed(passenger, "policy was already withdrawn"))
            }
            PolicyStatus::Expired => {
                return Err(nothing_owed(
                    passenger,
                    "flight resolved without a covered delay",
                ))
            }
        };

        let restore = vec![policy.clone()];
        self.settle(&[key.clone()], settled)?;
        self.transfer_out(rail, passenger, amount, kind, restore)
    }

    /// Pay every credited policy of `caller` in a single transfer.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NothingOwed`] if no policy of `caller` is credited.
    /// - [`LedgerError::TransferFailed`] if the rail refuses; nothing changes.
    pub fn pay(&mut self, caller: &LedgerAccount, rail: &mut dyn PayoutRail) -> Result<Payout, LedgerError> {
        let credited: Vec<InsurancePolicy> = self
            .policies_of(caller)
            .filter(|p| p.status == PolicyStatus::Credited)
            .cloned()
            .collect();
        if credited.is_empty() {
            return Err(nothing_owed(caller, "no credited policies"));
        }
        let amount = Amount::checked_sum(credited.iter().map(|p| p.credit_owed))
            .ok_or_else(|| LedgerError::ArithmeticOverflow("payout".into()))?;
        let keys: Vec<PolicyKey> = credited.iter().map(|p| p.key.clone()).collect();
        self.settle(&keys, PolicyStatus::Paid)?;
        self.transfer_out(rail, caller, amount, PayoutKind::Credit, credited)
    }

    /// Effects half of a payout: mark policies settled and zero their credit.
    fn settle(&mut self, keys: &[PolicyKey], status: PolicyStatus) -> Result<(), LedgerError> {
        let now = Timestamp::now();
        for key in keys {
            let policy = self
                .policies
                .get_mut(key)
                .ok_or_else(|| LedgerError::unknown("policy", key))?;
            policy.status = status;
            policy.credit_owed = Amount::ZERO;
            policy.settled_at = Some(now);
        }
        Ok(())
    }

    /// Debit the pool, then call the rail. On refusal, restore the pool and
    /// the pre-settlement policies.
    fn transfer_out(
        &mut self,
        rail: &mut dyn PayoutRail,
        recipient: &LedgerAccount,
        amount: Amount,
        kind: PayoutKind,
        restore: Vec<InsurancePolicy>,
    ) -> Result<Payout, LedgerError> {
        let held_before = self.held;
        let Some(remaining) = self.held.checked_sub(amount) else {
            self.restore(restore);
            return Err(LedgerError::InsufficientEscrow {
                required: amount.to_string(),
                available: held_before.to_string(),
            });
        };
        self.held = remaining;

        if let Err(err) = rail.transfer(recipient, amount) {
            self.held = held_before;
            self.restore(restore);
            return Err(LedgerError::TransferFailed {
                recipient: recipient.to_string(),
                amount: amount.to_string(),
                reason: err.reason,
            });
        }

        let policies: Vec<PolicyKey> = restore.into_iter().map(|p| p.key).collect();
        let transaction_type = match kind {
            PayoutKind::Credit => TransactionType::Payout,
            PayoutKind::Refund => TransactionType::Refund,
        };
        let flight = match policies.as_slice() {
            [single] => Some(single.flight.clone()),
            _ => None,
        };
        self.record(transaction_type, recipient, flight.as_ref(), amount);
        Ok(Payout {
            recipient: recipient.clone(),
            amount,
            kind,
            policies,
        })
    }

    fn restore(&mut self, policies: Vec<InsurancePolicy>) {
        for policy in policies {
            self.policies.insert(policy.key.clone(), policy);
        }
    }

    fn record(
        &mut self,
        transaction_type: TransactionType,
        account: &LedgerAccount,
        flight: Option<&FlightKey>,
        amount: Amount,
    ) {
        self.transactions.push(EscrowTransaction {
            transaction_type,
            account: account.clone(),
            flight: flight.cloned(),
            amount,
            timestamp: Timestamp::now(),
        });
    }
}

fn worst_case_payout(premium: Amount, config: &LedgerConfig) -> Result<Amount, LedgerError> {
    let payout = premium
        .checked_mul_ratio(config.payout_numerator, config.payout_denominator)
        .ok_or_else(|| LedgerError::ArithmeticOverflow("payout multiplier".into()))?;
    Ok(payout.max(premium))
}

fn nothing_owed(account: &LedgerAccount, reason: impl Into<String>) -> LedgerError {
    LedgerError::NothingOwed {
        account: account.to_string(),
        reason: reason.into(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
