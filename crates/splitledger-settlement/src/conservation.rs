//! Stake conservation invariant checker.
//!
//! Invariant enforced after every mutating operation:
//! ```text
//! Σ(active member stakes) == treasury.staked == Σ(stakes in) - Σ(stakes out)
//! ```
//!
//! A violation means the ledger itself is inconsistent. The operation that
//! produced it is rolled back and surfaced as `InsufficientBalance`.

use splitledger_types::{Amount, LedgerError, Result};

/// Running totals of stake flowing into and out of the treasury.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeConservation {
    /// Total stakes received since the group was created.
    staked_in: Amount,
    /// Total stakes paid back out (refunds and settlement).
    released_out: Amount,
}

impl StakeConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stake received on join.
    pub fn record_stake(&mut self, amount: Amount) -> Result<()> {
        self.staked_in = self.staked_in.checked_add(amount)?;
        Ok(())
    }

    /// Record a stake paid back out.
    pub fn record_release(&mut self, amount: Amount) -> Result<()> {
        self.released_out = self.released_out.checked_add(amount)?;
        Ok(())
    }

    /// Expected staked balance: stakes in minus stakes out.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if more was released than received.
    pub fn expected(&self) -> Result<Amount> {
        self.staked_in.checked_sub(self.released_out)
    }

    /// Verify the treasury's staked bucket against the flow totals and the
    /// members' recorded stakes.
    ///
    /// # Errors
    /// Returns [`LedgerError::InsufficientBalance`] on any mismatch.
    pub fn verify(&self, treasury_staked: Amount, member_stakes: Amount) -> Result<()> {
        let expected = self.expected()?;
        if treasury_staked != expected {
            return Err(LedgerError::InsufficientBalance {
                needed: expected,
                available: treasury_staked,
            });
        }
        if member_stakes != treasury_staked {
            return Err(LedgerError::InsufficientBalance {
                needed: member_stakes,
                available: treasury_staked,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_staked_in(&self) -> Amount {
        self.staked_in
    }

    #[must_use]
    pub fn total_released(&self) -> Amount {
        self.released_out
    }
}
