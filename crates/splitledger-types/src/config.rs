//! Configuration types for SplitLedger groups.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, Identity, LedgerError, Result, constants};

/// Who may record an expense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpensePolicy {
    /// Only the administrator records expenses.
    #[default]
    AdminOnly,
    /// The administrator, or the member who paid.
    AdminOrPayer,
}

/// Display currency of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Ticker shown to humans (e.g., "HBAR").
    pub symbol: String,
    /// Decimal places between one display unit and one smallest unit.
    pub decimals: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: constants::DEFAULT_CURRENCY_SYMBOL.to_string(),
            decimals: constants::DEFAULT_CURRENCY_DECIMALS,
        }
    }
}

impl CurrencyConfig {
    /// Convert a human amount (e.g. `0.01`) into smallest units.
    ///
    /// # Errors
    /// - `InvalidAmount` if negative or finer than `decimals` allows
    /// - `ArithmeticOverflow` if the result does not fit in an [`Amount`]
    pub fn parse_units(&self, value: Decimal) -> Result<Amount> {
        let value = value.normalize();
        if value.is_sign_negative() && !value.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: format!("{value} {} is negative", self.symbol),
            });
        }
        if value.scale() > self.decimals {
            return Err(LedgerError::InvalidAmount {
                reason: format!(
                    "{value} {} has more than {} fractional digits",
                    self.symbol, self.decimals
                ),
            });
        }
        let mantissa =
            u128::try_from(value.mantissa()).map_err(|_| LedgerError::ArithmeticOverflow)?;
        let factor = 10u128
            .checked_pow(self.decimals - value.scale())
            .ok_or(LedgerError::ArithmeticOverflow)?;
        mantissa
            .checked_mul(factor)
            .map(Amount::new)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Convert smallest units back into a human amount.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the amount exceeds `Decimal`'s range.
    pub fn format_units(&self, amount: Amount) -> Result<Decimal> {
        let units = amount.to_signed()?;
        Decimal::try_from_i128_with_scale(units, self.decimals)
            .map(|d| d.normalize())
            .map_err(|_| LedgerError::ArithmeticOverflow)
    }
}

/// Everything needed to construct a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// The distinguished administrator; becomes the first member.
    pub administrator: Identity,
    /// Exact stake every joining member must pay, in smallest units.
    pub required_stake: Amount,
    /// Identities allowed to join.
    pub whitelist: Vec<Identity>,
    #[serde(default)]
    pub expense_policy: ExpensePolicy,
    #[serde(default)]
    pub currency: CurrencyConfig,
}

impl GroupConfig {
    /// Config with default policy and currency.
    #[must_use]
    pub fn new(administrator: Identity, required_stake: Amount, whitelist: Vec<Identity>) -> Self {
        Self {
            administrator,
            required_stake,
            whitelist,
            expense_policy: ExpensePolicy::default(),
            currency: CurrencyConfig::default(),
        }
    }

    #[must_use]
    pub fn with_expense_policy(mut self, policy: ExpensePolicy) -> Self {
        self.expense_policy = policy;
        self
    }

    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `Configuration` if the stake is zero, the whitelist contains
    /// duplicates, or `decimals` is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.required_stake.is_zero() {
            return Err(LedgerError::Configuration(
                "required stake must be positive".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.whitelist.len());
        for id in &self.whitelist {
            if !seen.insert(id) {
                return Err(LedgerError::Configuration(format!(
                    "duplicate whitelist entry {id}"
                )));
            }
        }
        if self.currency.decimals > constants::MAX_CURRENCY_DECIMALS {
            return Err(LedgerError::Configuration(format!(
                "currency decimals {} exceeds maximum {}",
                self.currency.decimals,
                constants::MAX_CURRENCY_DECIMALS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hbar() -> CurrencyConfig {
        CurrencyConfig::default()
    }

    #[test]
    fn parse_units_matches_tinybars() {
        // 0.01 HBAR = 1_000_000 tinybars
        let amount = hbar().parse_units(Decimal::new(1, 2)).unwrap();
        assert_eq!(amount, Amount::new(1_000_000));
        assert_eq!(hbar().parse_units(Decimal::ONE).unwrap(), Amount::new(100_000_000));
    }

    #[test]
    fn parse_units_rejects_excess_precision() {
        let err = hbar().parse_units(Decimal::new(1, 9)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[test]
    fn parse_units_rejects_negative() {
        let err = hbar().parse_units(Decimal::new(-5, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[test]
    fn format_units_inverts_parse() {
        let c = hbar();
        let shown = c.format_units(Amount::new(1_000_000)).unwrap();
        assert_eq!(shown, Decimal::new(1, 2));
        assert_eq!(shown.to_string(), "0.01");
    }

    #[test]
    fn config_from_json_defaults() {
        let admin = Identity([1; 20]);
        let json = format!(
            r#"{{"administrator":"{admin}","required_stake":1000000,"whitelist":["{}"]}}"#,
            Identity([2; 20])
        );
        let cfg = GroupConfig::from_json(&json).unwrap();
        assert_eq!(cfg.administrator, admin);
        assert_eq!(cfg.required_stake, Amount::new(1_000_000));
        assert_eq!(cfg.expense_policy, ExpensePolicy::AdminOnly);
        assert_eq!(cfg.currency.symbol, "HBAR");
        assert_eq!(cfg.currency.decimals, 8);
    }

    #[test]
    fn config_policy_snake_case() {
        let cfg = GroupConfig::new(Identity([1; 20]), Amount::new(10), vec![])
            .with_expense_policy(ExpensePolicy::AdminOrPayer);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"admin_or_payer\""));
    }

    #[test]
    fn zero_stake_rejected() {
        let cfg = GroupConfig::new(Identity([1; 20]), Amount::ZERO, vec![]);
        assert!(matches!(cfg.validate(), Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn duplicate_whitelist_rejected() {
        let b = Identity([2; 20]);
        let cfg = GroupConfig::new(Identity([1; 20]), Amount::new(1), vec![b, b]);
        assert!(matches!(cfg.validate(), Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = GroupConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
