//! Treasury: the group's pooled value and the guarded transfer primitive.
//!
//! The treasury holds two buckets:
//! - **staked**: the sum of all active members' stakes
//! - **free**: incidental value sent to the group by anyone
//!
//! Every outgoing movement goes through a balance-check-then-move sequence:
//! the bucket is checked, the recipient is credited through a [`ValueSink`],
//! and only then is the bucket debited. If the sink refuses, nothing changes.
//!
//! ```text
//!   ∀ open group: staked == Σ(active member stakes)
//! ```

use std::collections::{HashMap, HashSet};

use splitledger_types::{Amount, Identity, LedgerError, Result};

/// Destination of value leaving the treasury.
///
/// Implementations model the outside world: a wallet ledger, a payment
/// rail, a chain adapter. A refusal must leave the sink unchanged.
pub trait ValueSink {
    /// Credit `amount` to `recipient`.
    ///
    /// # Errors
    /// Returns [`LedgerError::TransferRejected`] if the recipient refuses.
    fn credit(&mut self, recipient: Identity, amount: Amount) -> Result<()>;
}

/// In-process record of external balances credited by the treasury.
///
/// Recipients can be marked as refusing, which makes every credit to them
/// fail, the way a contract without a payable fallback would.
#[derive(Debug, Clone, Default)]
pub struct ExternalBalances {
    balances: HashMap<Identity, Amount>,
    refusing: HashSet<Identity>,
}

impl ExternalBalances {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// External balance of `identity` (zero if never credited).
    #[must_use]
    pub fn balance_of(&self, identity: &Identity) -> Amount {
        self.balances.get(identity).copied().unwrap_or_default()
    }

    /// Make every future credit to `identity` fail.
    pub fn refuse(&mut self, identity: Identity) {
        self.refusing.insert(identity);
    }

    /// Undo [`Self::refuse`].
    pub fn accept(&mut self, identity: &Identity) {
        self.refusing.remove(identity);
    }

    /// Sum of everything ever credited.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the balances together exceed `u128::MAX`.
    pub fn total_credited(&self) -> Result<Amount> {
        Amount::checked_sum(self.balances.values().copied())
    }
}

impl ValueSink for ExternalBalances {
    fn credit(&mut self, recipient: Identity, amount: Amount) -> Result<()> {
        if self.refusing.contains(&recipient) {
            return Err(LedgerError::TransferRejected {
                recipient,
                reason: "recipient refuses incoming value".to_string(),
            });
        }
        let entry = self.balances.entry(recipient).or_default();
        *entry = entry.checked_add(amount)?;
        Ok(())
    }
}

/// Pooled value held by the group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Treasury {
    staked: Amount,
    free: Amount,
}

impl Treasury {
    /// Create an empty treasury.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stake-derived balance.
    #[must_use]
    pub fn staked(&self) -> Amount {
        self.staked
    }

    /// Balance not backing any stake.
    #[must_use]
    pub fn free(&self) -> Amount {
        self.free
    }

    /// Total held value. Deposits refuse to push this past `u128::MAX`.
    #[must_use]
    pub fn total(&self) -> Amount {
        Amount::new(self.staked.units() + self.free.units())
    }

    /// Accept a member's stake into the staked bucket.
    pub fn receive_stake(&mut self, amount: Amount) -> Result<()> {
        self.total().checked_add(amount)?;
        self.staked = self.staked.checked_add(amount)?;
        Ok(())
    }

    /// Accept incidental value into the free bucket.
    ///
    /// # Errors
    /// `InvalidAmount` for a zero deposit, `ArithmeticOverflow` if the
    /// total would overflow.
    pub fn deposit(&mut self, from: Identity, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "deposit must be positive".to_string(),
            });
        }
        self.total().checked_add(amount)?;
        self.free = self.free.checked_add(amount)?;
        tracing::info!(from = %from, amount = %amount, free = %self.free, "Deposit received");
        Ok(())
    }

    /// Administrative transfer out of the free bucket.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero
    /// - `InsufficientBalance` if the free bucket is smaller than `amount`
    /// - `TransferRejected` if the recipient refuses
    pub fn transfer<S: ValueSink>(
        &mut self,
        sink: &mut S,
        recipient: Identity,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "transfer must be positive".to_string(),
            });
        }
        let remaining = self.free.checked_sub(amount)?;
        sink.credit(recipient, amount)?;
        self.free = remaining;
        tracing::info!(recipient = %recipient, amount = %amount, free = %self.free, "Transfer sent");
        Ok(())
    }

    /// Refund a stake out of the staked bucket. Zero is a no-op.
    pub fn release_stake<S: ValueSink>(
        &mut self,
        sink: &mut S,
        recipient: Identity,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let remaining = self.staked.checked_sub(amount)?;
        sink.credit(recipient, amount)?;
        self.staked = remaining;
        tracing::debug!(recipient = %recipient, amount = %amount, staked = %self.staked, "Stake released");
        Ok(())
    }

    /// Pay out of the whole treasury, draining the free bucket first.
    /// Used by settlement. Zero is a no-op.
    pub fn disburse<S: ValueSink>(
        &mut self,
        sink: &mut S,
        recipient: Identity,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let total = self.total();
        if total < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: total,
            });
        }
        sink.credit(recipient, amount)?;
        let from_free = self.free.min(amount);
        self.free = self.free.saturating_sub(from_free);
        self.staked = self.staked.saturating_sub(amount.saturating_sub(from_free));
        tracing::debug!(recipient = %recipient, amount = %amount, "Disbursed");
        Ok(())
    }
}
