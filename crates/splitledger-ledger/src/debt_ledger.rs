//! Debt ledger: append-only expense history plus netted pairwise debts.
//!
//! Each expense charges its debtors an even share of the amount and records
//! "debtor owes payer share" for each of them. New debt is always netted
//! against the opposite direction first:
//!
//! ```text
//!   record d owes p s:
//!     x      = debt(p → d)
//!     p → d := x - min(x, s)
//!     d → p += s - min(x, s)
//! ```
//!
//! so for every unordered pair at most one direction is non-zero.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use splitledger_types::{Amount, Expense, Identity, LedgerError, Result};

use crate::membership::Membership;

/// Expense log and netted debt edges keyed by `(debtor, creditor)`.
///
/// Members are referenced by identity only, so deactivating a member never
/// invalidates history.
#[derive(Debug, Clone, Default)]
pub struct DebtLedger {
    /// Non-zero debts only; a missing key means zero.
    edges: HashMap<(Identity, Identity), Amount>,
    expenses: Vec<Expense>,
}

impl DebtLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, split, net, and append an expense. Returns its index.
    ///
    /// The amount is split evenly across `debtors`; the division remainder
    /// is charged to the first debtor. A zero share leaves the edges alone.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero
    /// - `InvalidDebtors` if `debtors` is empty, repeats an identity, or contains the payer
    /// - `NotAMember` if the payer or any debtor is not active
    pub fn record_expense(
        &mut self,
        membership: &Membership,
        payer: Identity,
        label: impl Into<String>,
        debtors: Vec<Identity>,
        amount: Amount,
    ) -> Result<usize> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "expense amount must be positive".to_string(),
            });
        }
        Self::validate_debtors(payer, &debtors)?;
        if !membership.is_member(&payer) {
            return Err(LedgerError::NotAMember(payer));
        }
        if let Some(outsider) = debtors.iter().find(|d| !membership.is_member(d)) {
            return Err(LedgerError::NotAMember(*outsider));
        }

        let shares = amount.split_even(debtors.len());

        // Compute every netted edge before touching the map. Debtors are
        // distinct, so each pair is visited once.
        let mut updates = Vec::with_capacity(debtors.len());
        for (debtor, share) in debtors.iter().copied().zip(shares.iter().copied()) {
            if share.is_zero() {
                continue;
            }
            let (owed_by_debtor, owed_to_debtor) = self.netted(debtor, payer, share)?;
            updates.push((debtor, owed_by_debtor, owed_to_debtor));
        }
        for (debtor, owed_by_debtor, owed_to_debtor) in updates {
            self.set_edge(debtor, payer, owed_by_debtor);
            self.set_edge(payer, debtor, owed_to_debtor);
            tracing::debug!(
                debtor = %debtor,
                creditor = %payer,
                owes = %owed_by_debtor,
                owed = %owed_to_debtor,
                "Debt netted"
            );
        }

        let index = self.expenses.len();
        let expense = Expense {
            index,
            payer,
            label: label.into(),
            debtors,
            amount,
            shares,
            recorded_at: Utc::now(),
        };
        tracing::info!(
            index,
            payer = %payer,
            amount = %amount,
            debtors = expense.debtors.len(),
            label = %expense.label,
            "Expense recorded"
        );
        self.expenses.push(expense);
        Ok(index)
    }

    fn validate_debtors(payer: Identity, debtors: &[Identity]) -> Result<()> {
        if debtors.is_empty() {
            return Err(LedgerError::InvalidDebtors {
                reason: "debtor list is empty".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(debtors.len());
        for debtor in debtors {
            if *debtor == payer {
                return Err(LedgerError::InvalidDebtors {
                    reason: format!("payer {payer} listed as debtor"),
                });
            }
            if !seen.insert(debtor) {
                return Err(LedgerError::InvalidDebtors {
                    reason: format!("duplicate debtor {debtor}"),
                });
            }
        }
        Ok(())
    }

    /// New `(debtor → creditor, creditor → debtor)` amounts after recording
    /// that `debtor` owes `creditor` another `amount`.
    fn netted(&self, debtor: Identity, creditor: Identity, amount: Amount) -> Result<(Amount, Amount)> {
        let forward = self.debt(&debtor, &creditor);
        let reverse = self.debt(&creditor, &debtor);
        let offset = reverse.min(amount);
        let forward = forward.checked_add(amount.saturating_sub(offset))?;
        Ok((forward, reverse.saturating_sub(offset)))
    }

    fn set_edge(&mut self, debtor: Identity, creditor: Identity, amount: Amount) {
        if amount.is_zero() {
            self.edges.remove(&(debtor, creditor));
        } else {
            self.edges.insert((debtor, creditor), amount);
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// How much `debtor` owes `creditor` (zero if none or if the net runs
    /// the other way).
    #[must_use]
    pub fn debt(&self, debtor: &Identity, creditor: &Identity) -> Amount {
        self.edges
            .get(&(*debtor, *creditor))
            .copied()
            .unwrap_or_default()
    }

    /// Signed net position of `member` against `counterparties`:
    /// debts owed to `member` minus debts `member` owes.
    pub fn net_position(&self, member: &Identity, counterparties: &[Identity]) -> Result<i128> {
        let mut net: i128 = 0;
        for other in counterparties.iter().filter(|o| *o != member) {
            let owed_to = self.debt(other, member).to_signed()?;
            let owes = self.debt(member, other).to_signed()?;
            net = net
                .checked_add(owed_to)
                .and_then(|n| n.checked_sub(owes))
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }
        Ok(net)
    }

    /// All non-zero edges as `(debtor, creditor, amount)`.
    pub fn outstanding(&self) -> impl Iterator<Item = (Identity, Identity, Amount)> + '_ {
        self.edges.iter().map(|(&(d, c), &a)| (d, c, a))
    }

    #[must_use]
    pub fn expenses_len(&self) -> usize {
        self.expenses.len()
    }

    /// # Errors
    /// Returns `IndexOutOfRange` past the end of the log.
    pub fn expense(&self, index: usize) -> Result<&Expense> {
        self.expenses.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.expenses.len(),
        })
    }

    #[must_use]
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }
}
