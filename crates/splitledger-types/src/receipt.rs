//! Settlement receipt: the audit record left behind by `settle_group`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Amount, GroupId, Identity};

/// What one member received at settlement and how it was derived.
///
/// `amount == stake + net_position + surplus_share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub member: Identity,
    /// Stake held for the member immediately before settlement.
    pub stake: Amount,
    /// Debts owed to the member minus debts they owe (active members only).
    pub net_position: i128,
    /// The member's slice of non-stake treasury funds.
    pub surplus_share: Amount,
    /// Value transferred to the member.
    pub amount: Amount,
}

/// Final distribution of a settled group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub group_id: GroupId,
    /// Payouts in active-member order, including zero payouts.
    pub payouts: Vec<Payout>,
    /// Sum of all payouts; equals the treasury balance before settlement.
    pub total: Amount,
    pub settled_at: DateTime<Utc>,
    /// SHA-256 over the canonical payout list.
    pub digest: [u8; 32],
}

impl SettlementReceipt {
    /// Build a receipt, computing its digest.
    #[must_use]
    pub fn new(group_id: GroupId, payouts: Vec<Payout>, total: Amount) -> Self {
        let digest = Self::compute_digest(group_id, &payouts, total);
        Self {
            group_id,
            payouts,
            total,
            settled_at: Utc::now(),
            digest,
        }
    }

    /// Deterministic digest: same group and payouts → same bytes.
    ///
    /// Format: `"splitledger:settlement:v1:" || group_id || total || (member || stake || net || surplus || amount)*`
    #[must_use]
    pub fn compute_digest(group_id: GroupId, payouts: &[Payout], total: Amount) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"splitledger:settlement:v1:");
        hasher.update(group_id.0.as_bytes());
        hasher.update(total.units().to_le_bytes());
        for p in payouts {
            hasher.update(p.member.as_bytes());
            hasher.update(p.stake.units().to_le_bytes());
            hasher.update(p.net_position.to_le_bytes());
            hasher.update(p.surplus_share.units().to_le_bytes());
            hasher.update(p.amount.units().to_le_bytes());
        }
        hasher.finalize().into()
    }

    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Whether the stored digest matches the payouts.
    #[must_use]
    pub fn verify_digest(&self) -> bool {
        Self::compute_digest(self.group_id, &self.payouts, self.total) == self.digest
    }

    /// Payout for a given member, if they were active at settlement.
    #[must_use]
    pub fn payout_for(&self, member: &Identity) -> Option<&Payout> {
        self.payouts.iter().find(|p| &p.member == member)
    }
}
