//! Error types for the SplitLedger group ledger.
//!
//! All errors use the `SL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Access and membership errors
//! - 2xx: Expense / debt ledger errors
//! - 3xx: Settlement errors
//! - 4xx: Treasury errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the operation that raised it with no observable state
//! change. Nothing in the ledger retries.

use thiserror::Error;

use crate::{Amount, Capability, Identity};

/// Central error enum for all SplitLedger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // =================================================================
    // Access / Membership Errors (1xx)
    // =================================================================
    /// The caller lacks the capability the operation requires
    /// (administrator, whitelisted identity, or expense payer).
    #[error("SL_ERR_100: Unauthorized: {caller} lacks {required} capability")]
    Unauthorized {
        caller: Identity,
        required: Capability,
    },

    /// The identity is already an active member.
    #[error("SL_ERR_101: Already a member: {0}")]
    AlreadyMember(Identity),

    /// The identity is not an active member.
    #[error("SL_ERR_102: Not a member: {0}")]
    NotAMember(Identity),

    /// The value paid to join differs from the required stake.
    #[error("SL_ERR_103: Wrong stake amount: required {expected}, paid {paid}")]
    WrongAmount { expected: Amount, paid: Amount },

    // =================================================================
    // Expense / Debt Ledger Errors (2xx)
    // =================================================================
    /// The amount violates a positivity or precision constraint.
    #[error("SL_ERR_200: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The expense debtor list is empty, has duplicates, or includes the payer.
    #[error("SL_ERR_201: Invalid debtors: {reason}")]
    InvalidDebtors { reason: String },

    /// A history index is past the end of the expense log.
    #[error("SL_ERR_202: Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    // =================================================================
    // Settlement Errors (3xx)
    // =================================================================
    /// The group has already been settled; settlement is terminal.
    #[error("SL_ERR_300: Group already settled")]
    AlreadySettled,

    // =================================================================
    // Treasury Errors (4xx)
    // =================================================================
    /// Not enough value in the treasury (or in a member's collateral) to
    /// cover the requested movement.
    #[error("SL_ERR_400: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// The recipient refused the transfer.
    #[error("SL_ERR_401: Transfer to {recipient} rejected: {reason}")]
    TransferRejected { recipient: Identity, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// An amount computation overflowed.
    #[error("SL_ERR_900: Arithmetic overflow")]
    ArithmeticOverflow,

    /// Unrecoverable internal error.
    #[error("SL_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, bad identity, etc.).
    #[error("SL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("SL_ERR_903: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_names_capability() {
        let err = LedgerError::Unauthorized {
            caller: Identity([0; 20]),
            required: Capability::Administrator,
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("SL_ERR_100"), "Got: {msg}");
        assert!(msg.contains("ADMINISTRATOR"));
    }

    #[test]
    fn wrong_amount_display() {
        let err = LedgerError::WrongAmount {
            expected: Amount::new(1_000_000),
            paid: Amount::new(5),
        };
        let msg = format!("{err}");
        assert!(msg.contains("SL_ERR_103"));
        assert!(msg.contains("1000000"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn all_errors_have_sl_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(LedgerError::AlreadySettled),
            Box::new(LedgerError::NotAMember(Identity([1; 20]))),
            Box::new(LedgerError::IndexOutOfRange { index: 3, len: 1 }),
            Box::new(LedgerError::ArithmeticOverflow),
            Box::new(LedgerError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("SL_ERR_"),
                "Error missing SL_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn json_errors_convert() {
        let err: LedgerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
