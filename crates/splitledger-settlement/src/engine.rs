//! Settlement engine: final distribution of a group's treasury.
//!
//! Settlement runs in two steps:
//! 1. **Plan**: compute every active member's payout without touching state
//!    - `amount = stake + net_position + surplus_share`
//!    - a negative amount fails the whole settlement
//!    - `Σ amount` must equal the treasury balance exactly
//! 2. **Execute**: disburse the planned payouts in active order against
//!    scratch copies of the treasury and sink, then commit both at once
//!
//! If any payout is refused, neither the treasury nor the sink changes.
//! Zero payouts issue no transfer but still appear on the receipt.

use splitledger_ledger::{DebtLedger, Membership, Treasury, ValueSink};
use splitledger_types::{Amount, GroupId, Identity, LedgerError, Payout, Result, SettlementReceipt};

/// A computed, not yet executed, settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Payouts in active-member order.
    pub payouts: Vec<Payout>,
    /// Sum of payouts; equals the treasury balance the plan was built from.
    pub total: Amount,
}

impl SettlementPlan {
    /// Payouts that actually move value.
    pub fn transfers(&self) -> impl Iterator<Item = (Identity, Amount)> + '_ {
        self.payouts
            .iter()
            .filter(|p| !p.amount.is_zero())
            .map(|p| (p.member, p.amount))
    }
}

/// Stateless settlement calculator and executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementEngine;

impl SettlementEngine {
    /// Compute payouts for every active member.
    ///
    /// Debts involving departed members are ignored. Funds outside the
    /// staked bucket are split evenly across active members, remainder to
    /// the first.
    ///
    /// # Errors
    /// - `InsufficientBalance` if any member's payout would be negative, or
    ///   if the payouts do not add up to the treasury balance
    /// - `ArithmeticOverflow` on overflow
    pub fn plan(
        membership: &Membership,
        ledger: &DebtLedger,
        treasury: &Treasury,
    ) -> Result<SettlementPlan> {
        let active = membership.active_members();
        let surplus = treasury.free().split_even(active.len());

        let mut payouts = Vec::with_capacity(active.len());
        for (member, surplus_share) in active.iter().zip(surplus.iter().copied()) {
            let stake = membership.stake_of(member);
            let net_position = ledger.net_position(member, active)?;
            let available = stake.checked_add(surplus_share)?;
            let payable = available
                .to_signed()?
                .checked_add(net_position)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            if payable < 0 {
                tracing::warn!(
                    member = %member.short(),
                    stake = %stake,
                    net_position,
                    "Member owes more than their stake"
                );
                return Err(LedgerError::InsufficientBalance {
                    needed: Amount::new(net_position.unsigned_abs()),
                    available,
                });
            }
            payouts.push(Payout {
                member: *member,
                stake,
                net_position,
                surplus_share,
                amount: Amount::from_signed(payable)?,
            });
        }

        let total = Amount::checked_sum(payouts.iter().map(|p| p.amount))?;
        let held = treasury.total();
        if total != held {
            return Err(LedgerError::InsufficientBalance {
                needed: total,
                available: held,
            });
        }

        Ok(SettlementPlan { payouts, total })
    }

    /// Disburse a plan and close out the membership.
    ///
    /// On success the treasury is empty, every member is inactive with a
    /// zero stake, and the returned receipt records the distribution.
    ///
    /// # Errors
    /// Any transfer error. Treasury, sink, and membership are unchanged.
    pub fn execute<S: ValueSink + Clone>(
        group_id: GroupId,
        plan: SettlementPlan,
        membership: &mut Membership,
        treasury: &mut Treasury,
        sink: &mut S,
    ) -> Result<SettlementReceipt> {
        let mut scratch_treasury = treasury.clone();
        let mut scratch_sink = sink.clone();
        for (member, amount) in plan.transfers() {
            scratch_treasury.disburse(&mut scratch_sink, member, amount)?;
        }
        if !scratch_treasury.total().is_zero() {
            return Err(LedgerError::Internal(format!(
                "treasury holds {} after settlement",
                scratch_treasury.total()
            )));
        }

        *treasury = scratch_treasury;
        *sink = scratch_sink;
        membership.deactivate_all();

        let receipt = SettlementReceipt::new(group_id, plan.payouts, plan.total);
        tracing::info!(
            group = %group_id,
            members = receipt.payouts.len(),
            total = %receipt.total,
            digest = %receipt.digest_hex(),
            "Group settled"
        );
        Ok(receipt)
    }

    /// Plan and execute in one step.
    pub fn settle<S: ValueSink + Clone>(
        group_id: GroupId,
        membership: &mut Membership,
        ledger: &DebtLedger,
        treasury: &mut Treasury,
        sink: &mut S,
    ) -> Result<SettlementReceipt> {
        let plan = Self::plan(membership, ledger, treasury)?;
        Self::execute(group_id, plan, membership, treasury, sink)
    }
}
