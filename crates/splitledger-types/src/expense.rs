//! Expense records: the append-only history of the group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, Identity};

/// One recorded expense. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Position in the expense log (creation order).
    pub index: usize,
    pub payer: Identity,
    /// Free-text description supplied by the caller.
    pub label: String,
    /// Debtors in the order given by the caller.
    pub debtors: Vec<Identity>,
    /// Total amount paid by `payer`.
    pub amount: Amount,
    /// Share charged to each debtor, parallel to `debtors`.
    pub shares: Vec<Amount>,
    pub recorded_at: DateTime<Utc>,
}

impl Expense {
    /// The share charged to `debtor`, if they took part.
    #[must_use]
    pub fn share_of(&self, debtor: &Identity) -> Option<Amount> {
        self.debtors
            .iter()
            .position(|d| d == debtor)
            .and_then(|i| self.shares.get(i).copied())
    }

    /// Iterate `(debtor, share)` pairs in debtor order.
    pub fn charges(&self) -> impl Iterator<Item = (Identity, Amount)> + '_ {
        self.debtors.iter().copied().zip(self.shares.iter().copied())
    }
}
