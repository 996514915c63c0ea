//! # Currency Amounts
//!
//! [`Amount`] is a non-negative integer count of the ledger's smallest currency
//! unit. One whole unit is [`Amount::UNIT`] (10^18) smallest units.
//!
//! Amounts serialize as decimal strings so that values above 2^53 survive JSON
//! consumers that parse numbers as doubles. All arithmetic is checked; callers
//! turn `None` into [`LedgerError::ArithmeticOverflow`](crate::LedgerError).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A currency amount in smallest units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u128);

impl Amount {
    /// Smallest units per whole currency unit.
    pub const UNIT: u128 = 1_000_000_000_000_000_000;

    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// An amount of `smallest` smallest units.
    pub const fn new(smallest: u128) -> Self {
        Self(smallest)
    }

    /// An amount of `whole` currency units.
    pub const fn units(whole: u64) -> Self {
        Self(whole as u128 * Self::UNIT)
    }

    /// The raw smallest-unit value.
    pub const fn smallest(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Multiply by `numerator / denominator`, rounding down.
    ///
    /// Returns `None` on overflow or a zero denominator.
    pub fn checked_mul_ratio(self, numerator: u64, denominator: u64) -> Option<Amount> {
        if denominator == 0 {
            return None;
        }
        self.0
            .checked_mul(u128::from(numerator))
            .map(|v| Self(v / u128::from(denominator)))
    }

    /// Checked sum of an iterator of amounts.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(iter: I) -> Option<Amount> {
        iter.into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }

    /// Render as whole units with up to 18 fractional digits (`1.5`).
    pub fn to_units_string(&self) -> String {
        let whole = self.0 / Self::UNIT;
        let frac = self.0 % Self::UNIT;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:018}");
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidAmount(s.to_string()))
    }
}

impl TryFrom<String> for Amount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_scale_by_unit() {
        assert_eq!(Amount::units(1).smallest(), Amount::UNIT);
        assert_eq!(Amount::units(10).smallest(), 10 * Amount::UNIT);
    }

    #[test]
    fn one_and_a_half_payout() {
        let payout = Amount::units(1).checked_mul_ratio(3, 2).unwrap();
        assert_eq!(payout.smallest(), 1_500_000_000_000_000_000);
        assert_eq!(payout.to_units_string(), "1.5");
    }

    #[test]
    fn mul_ratio_rejects_zero_denominator_and_overflow() {
        assert!(Amount::units(1).checked_mul_ratio(1, 0).is_none());
        assert!(Amount::new(u128::MAX).checked_mul_ratio(2, 1).is_none());
    }

    #[test]
    fn checked_sub_underflow() {
        assert!(Amount::ZERO.checked_sub(Amount::new(1)).is_none());
    }

    #[test]
    fn checked_sum() {
        let total = Amount::checked_sum([Amount::units(1), Amount::units(2)]).unwrap();
        assert_eq!(total, Amount::units(3));
        assert!(Amount::checked_sum([Amount::new(u128::MAX), Amount::new(1)]).is_none());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Amount::units(2)).unwrap();
        assert_eq!(json, "\"2000000000000000000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::units(2));
        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"1.5\"").is_err());
    }

    #[test]
    fn whole_units_render_without_fraction() {
        assert_eq!(Amount::units(10).to_units_string(), "10");
        assert_eq!(Amount::ZERO.to_units_string(), "0");
        assert_eq!(Amount::new(1).to_units_string(), "0.000000000000000001");
    }

    use proptest::prelude::*;

    proptest! {
        /// A multiplier of at least 1x never shrinks a premium.
        #[test]
        fn payout_ratio_never_below_premium(premium in 0u128..=Amount::UNIT * 1_000) {
            let paid = Amount::new(premium).checked_mul_ratio(3, 2).unwrap();
            prop_assert!(paid >= Amount::new(premium));
        }

        /// Summing never loses value relative to pairwise addition.
        #[test]
        fn checked_sum_matches_fold(xs in proptest::collection::vec(0u128..=Amount::UNIT, 0..16)) {
            let expected: u128 = xs.iter().sum();
            let total = Amount::checked_sum(xs.into_iter().map(Amount::new)).unwrap();
            prop_assert_eq!(total.smallest(), expected);
        }
    }
}
