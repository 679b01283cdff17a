//! # splitledger-ledger
//!
//! The stateful building blocks of a staked expense-sharing group.
//!
//! ## Components
//!
//! 1. **AddressRegistry**: join whitelist and the administrator identity
//! 2. **Membership**: active members, stakes, join / refund-then-remove
//! 3. **DebtLedger**: append-only expenses and netted pairwise debts
//! 4. **Treasury**: pooled value with guarded, balance-checked transfers
//!
//! ## Flow
//!
//! ```text
//! join → Membership.join() → Treasury.receive_stake()
//! addExpense → DebtLedger.record_expense() → netted edges
//! removeMember → Treasury.release_stake() → Membership deactivates
//! ```
//!
//! None of these components check who is calling beyond the whitelist;
//! administrator gating and rollback live in `splitledger-settlement`.

pub mod debt_ledger;
pub mod membership;
pub mod registry;
pub mod treasury;

pub use debt_ledger::DebtLedger;
pub use membership::Membership;
pub use registry::AddressRegistry;
pub use treasury::{ExternalBalances, Treasury, ValueSink};
