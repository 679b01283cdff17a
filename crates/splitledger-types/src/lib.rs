//! # splitledger-types
//!
//! Shared types, errors, and configuration for the **SplitLedger** group
//! expense ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Identity`], [`GroupId`]
//! - **Amounts**: [`Amount`] in smallest currency units
//! - **Membership model**: [`Member`], [`Capability`], [`GroupPhase`]
//! - **Expense model**: [`Expense`]
//! - **Settlement model**: [`SettlementReceipt`], [`Payout`]
//! - **Configuration**: [`GroupConfig`], [`CurrencyConfig`], [`ExpensePolicy`]
//! - **Errors**: [`LedgerError`] with `SL_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod expense;
pub mod ids;
pub mod member;
pub mod receipt;

pub use amount::*;
pub use config::*;
pub use error::*;
pub use expense::*;
pub use ids::*;
pub use member::*;
pub use receipt::*;

// Constants are accessed via `splitledger_types::constants::FOO`.
