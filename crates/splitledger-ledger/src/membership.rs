//! Membership: active members, their stakes, and the join/leave rules.
//!
//! Joining moves the exact required stake into the treasury's staked bucket.
//! Removal is refund-then-remove: the stake goes back to the member through
//! the treasury first, and only if that succeeds is the member deactivated.

use std::collections::HashMap;

use splitledger_types::{Amount, Identity, LedgerError, Member, Result};

use crate::registry::AddressRegistry;
use crate::treasury::{Treasury, ValueSink};

/// Tracks every member ever admitted and the ordered active set.
#[derive(Debug, Clone)]
pub struct Membership {
    required_stake: Amount,
    /// All members ever admitted, active or not.
    members: HashMap<Identity, Member>,
    /// Active members in join order.
    active: Vec<Identity>,
}

impl Membership {
    /// Create an empty membership requiring `required_stake` to join.
    #[must_use]
    pub fn new(required_stake: Amount) -> Self {
        Self {
            required_stake,
            members: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Admit a founding member with no stake (the administrator at
    /// construction). Bypasses the whitelist.
    ///
    /// # Errors
    /// Returns `AlreadyMember` if the identity is active.
    pub fn enroll_founder(&mut self, identity: Identity) -> Result<()> {
        if self.is_member(&identity) {
            return Err(LedgerError::AlreadyMember(identity));
        }
        self.activate(identity, Amount::ZERO);
        Ok(())
    }

    /// Join with a stake payment.
    ///
    /// # Errors
    /// - `Unauthorized` if `identity` is not whitelisted
    /// - `AlreadyMember` if `identity` is active
    /// - `WrongAmount` if `paid` differs from the required stake
    pub fn join(
        &mut self,
        registry: &AddressRegistry,
        treasury: &mut Treasury,
        identity: Identity,
        paid: Amount,
    ) -> Result<()> {
        registry.require_whitelisted(identity)?;
        if self.is_member(&identity) {
            return Err(LedgerError::AlreadyMember(identity));
        }
        if paid != self.required_stake {
            return Err(LedgerError::WrongAmount {
                expected: self.required_stake,
                paid,
            });
        }

        treasury.receive_stake(paid)?;
        self.activate(identity, paid);

        tracing::info!(member = %identity, stake = %paid, active = self.active.len(), "Member joined");
        Ok(())
    }

    /// Remove an active member, refunding their stake.
    ///
    /// Returns the refunded amount.
    ///
    /// # Errors
    /// - `NotAMember` if `identity` is not active
    /// - any transfer error from the refund, in which case nothing changes
    pub fn remove<S: ValueSink>(
        &mut self,
        treasury: &mut Treasury,
        sink: &mut S,
        identity: Identity,
    ) -> Result<Amount> {
        let stake = self
            .members
            .get(&identity)
            .filter(|m| m.active)
            .map(|m| m.stake)
            .ok_or(LedgerError::NotAMember(identity))?;

        treasury.release_stake(sink, identity, stake)?;

        let refunded = self.deactivate(&identity);
        tracing::info!(member = %identity, refunded = %refunded, active = self.active.len(), "Member removed");
        Ok(refunded)
    }

    /// Deactivate every active member and zero their stakes.
    /// Returns `(identity, stake)` in active order.
    pub fn deactivate_all(&mut self) -> Vec<(Identity, Amount)> {
        let active = std::mem::take(&mut self.active);
        active
            .into_iter()
            .map(|id| {
                let stake = self.members.get_mut(&id).map_or(Amount::ZERO, Member::deactivate);
                (id, stake)
            })
            .collect()
    }

    fn activate(&mut self, identity: Identity, stake: Amount) {
        self.members
            .entry(identity)
            .and_modify(|m| {
                m.stake = stake;
                m.active = true;
            })
            .or_insert_with(|| Member::new(identity, stake));
        self.active.push(identity);
    }

    fn deactivate(&mut self, identity: &Identity) -> Amount {
        self.active.retain(|id| id != identity);
        self.members
            .get_mut(identity)
            .map_or(Amount::ZERO, Member::deactivate)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn required_stake(&self) -> Amount {
        self.required_stake
    }

    #[must_use]
    pub fn is_member(&self, identity: &Identity) -> bool {
        self.members.get(identity).is_some_and(|m| m.active)
    }

    /// Current stake of `identity` (zero for inactive or unknown identities).
    #[must_use]
    pub fn stake_of(&self, identity: &Identity) -> Amount {
        self.members
            .get(identity)
            .map_or(Amount::ZERO, |m| m.stake)
    }

    #[must_use]
    pub fn member(&self, identity: &Identity) -> Option<&Member> {
        self.members.get(identity)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active member at ordinal position `index`.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` past the end of the active set.
    pub fn active_member(&self, index: usize) -> Result<Identity> {
        self.active
            .get(index)
            .copied()
            .ok_or(LedgerError::IndexOutOfRange {
                index,
                len: self.active.len(),
            })
    }

    /// Active members in join order.
    #[must_use]
    pub fn active_members(&self) -> &[Identity] {
        &self.active
    }

    /// Sum of active stakes.
    pub fn total_stake(&self) -> Result<Amount> {
        Amount::checked_sum(self.active.iter().map(|id| self.stake_of(id)))
    }
}
