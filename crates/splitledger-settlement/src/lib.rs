//! # splitledger-settlement
//!
//! Group lifecycle and final settlement on top of `splitledger-ledger`.
//!
//! ## Components
//!
//! - [`Group`]: administrator gating, expense policy, and an all-or-nothing
//!   checkpoint around every mutation
//! - [`SettlementEngine`]: plan and execute the final distribution
//! - [`StakeConservation`]: checks the staked bucket after every mutation
//! - [`SharedGroup`]: `Arc<RwLock<_>>` handle for concurrent readers
//!
//! ## Settlement
//!
//! ```text
//! payout(m) = stake(m) + net_position(m) + surplus_share(m)
//! Σ payout  = treasury balance            (checked before any transfer)
//! ```

pub mod conservation;
pub mod engine;
pub mod group;
pub mod shared;

pub use conservation::StakeConservation;
pub use engine::{SettlementEngine, SettlementPlan};
pub use group::Group;
pub use shared::SharedGroup;
