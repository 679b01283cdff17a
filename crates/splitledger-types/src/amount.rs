//! Integral amounts in the smallest currency unit.
//!
//! The ledger never works with fractions: every stake, expense share, debt
//! edge and payout is a whole number of smallest units. Decimal display is a
//! caller concern handled by [`crate::CurrencyConfig`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// A non-negative amount of the group's currency, in smallest units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// # Errors
    /// Returns [`LedgerError::ArithmeticOverflow`] on overflow.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// # Errors
    /// Returns [`LedgerError::InsufficientBalance`] if `rhs > self`.
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(LedgerError::InsufficientBalance {
                needed: rhs,
                available: self,
            })
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[must_use]
    pub fn min(self, rhs: Self) -> Self {
        Self(self.0.min(rhs.0))
    }

    /// Split into `parts` equal shares. The remainder of the integer division
    /// is added to the first share.
    ///
    /// Returns an empty vector when `parts == 0`.
    #[must_use]
    pub fn split_even(self, parts: usize) -> Vec<Self> {
        if parts == 0 {
            return Vec::new();
        }
        let n = parts as u128;
        let base = self.0 / n;
        let remainder = self.0 % n;
        let mut shares = vec![Self(base); parts];
        shares[0] = Self(base + remainder);
        shares
    }

    /// Signed view for net-position arithmetic.
    ///
    /// # Errors
    /// Returns [`LedgerError::ArithmeticOverflow`] if the amount exceeds `i128::MAX`.
    pub fn to_signed(self) -> Result<i128> {
        i128::try_from(self.0).map_err(|_| LedgerError::ArithmeticOverflow)
    }

    /// Convert a signed value back into an amount.
    ///
    /// # Errors
    /// Returns [`LedgerError::ArithmeticOverflow`] if `value` is negative.
    pub fn from_signed(value: i128) -> Result<Self> {
        u128::try_from(value)
            .map(Self)
            .map_err(|_| LedgerError::ArithmeticOverflow)
    }

    /// Checked sum over an iterator of amounts.
    ///
    /// # Errors
    /// Returns [`LedgerError::ArithmeticOverflow`] on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(iter: I) -> Result<Self> {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, next| acc.checked_add(next))
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(u128::from(units))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // Test-only: the library exposes only `Amount::checked_sum`.
    impl std::iter::Sum for Amount {
        fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
            Amount::checked_sum(iter).expect("test sum overflowed")
        }
    }

    #[test]
    fn split_even_divisible() {
        let shares = Amount::new(300).split_even(2);
        assert_eq!(shares, vec![Amount::new(150), Amount::new(150)]);
    }

    #[test]
    fn split_even_remainder_goes_to_first() {
        let shares = Amount::new(100).split_even(3);
        assert_eq!(
            shares,
            vec![Amount::new(34), Amount::new(33), Amount::new(33)]
        );
        assert_eq!(shares.into_iter().sum::<Amount>(), Amount::new(100));
    }

    #[test]
    fn split_even_smaller_than_parts() {
        let shares = Amount::new(2).split_even(3);
        assert_eq!(shares, vec![Amount::new(2), Amount::ZERO, Amount::ZERO]);
        assert!(Amount::new(5).split_even(0).is_empty());
    }

    #[test]
    fn checked_sub_underflow_is_insufficient_balance() {
        let err = Amount::new(5).checked_sub(Amount::new(6)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { needed, available }
                if needed == Amount::new(6) && available == Amount::new(5)
        ));
    }

    #[test]
    fn checked_add_overflow() {
        let err = Amount::new(u128::MAX).checked_add(Amount::new(1)).unwrap_err();
        assert!(matches!(err, LedgerError::ArithmeticOverflow));
    }

    #[test]
    fn signed_conversions() {
        assert_eq!(Amount::new(42).to_signed().unwrap(), 42);
        assert!(Amount::new(u128::MAX).to_signed().is_err());
        assert_eq!(Amount::from_signed(7).unwrap(), Amount::new(7));
        assert!(Amount::from_signed(-1).is_err());
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let ok = Amount::checked_sum([Amount::new(1), Amount::new(2)]).unwrap();
        assert_eq!(ok, Amount::new(3));
        assert!(Amount::checked_sum([Amount::new(u128::MAX), Amount::new(1)]).is_err());
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&Amount::new(1_000_000)).unwrap();
        assert_eq!(json, "1000000");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::new(1_000_000));
    }
}
