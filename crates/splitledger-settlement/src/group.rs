//! Group: the facade every caller goes through.
//!
//! A [`Group`] owns the registry, membership, debt ledger, treasury and the
//! value sink, and exposes the full operation surface:
//!
//! ```text
//! join ──────────┐
//! remove_member ─┤
//! add_expense ───┼─► transact(checkpoint) ─► op ─► conservation check ─► commit
//! settle_group ──┤                                        │
//! transfer ──────┤                                        └─ Err ─► restore checkpoint
//! deposit ───────┘
//! ```
//!
//! Every mutation is all-or-nothing. The components holding history
//! (registry, membership, debt ledger, sink) are atomic on their own, and
//! each operation touches at most one of them, as its last fallible step.
//! The checkpoint therefore only covers the fixed-size parts: treasury
//! buckets, conservation totals and phase.

use rust_decimal::Decimal;
use splitledger_ledger::{AddressRegistry, DebtLedger, ExternalBalances, Membership, Treasury, ValueSink};
use splitledger_types::constants;
use splitledger_types::{
    Amount, Capability, CurrencyConfig, Expense, ExpensePolicy, GroupConfig, GroupId, GroupPhase,
    Identity, LedgerError, Result, SettlementReceipt,
};

use crate::conservation::StakeConservation;
use crate::engine::SettlementEngine;

/// Everything a mutation may touch.
#[derive(Debug, Clone)]
struct GroupState<S> {
    registry: AddressRegistry,
    membership: Membership,
    ledger: DebtLedger,
    treasury: Treasury,
    conservation: StakeConservation,
    sink: S,
    phase: GroupPhase,
    receipt: Option<SettlementReceipt>,
}

impl<S> GroupState<S> {
    fn require_open(&self) -> Result<()> {
        if self.phase.is_settled() {
            return Err(LedgerError::AlreadySettled);
        }
        Ok(())
    }

    fn check_conservation(&self) -> Result<()> {
        self.conservation
            .verify(self.treasury.staked(), self.membership.total_stake()?)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            treasury: self.treasury.clone(),
            conservation: self.conservation.clone(),
            phase: self.phase,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.treasury = checkpoint.treasury;
        self.conservation = checkpoint.conservation;
        self.phase = checkpoint.phase;
    }
}

/// Fixed-size state restored when an operation fails.
#[derive(Debug)]
struct Checkpoint {
    treasury: Treasury,
    conservation: StakeConservation,
    phase: GroupPhase,
}

/// A staked expense-sharing group.
///
/// `S` is where value leaving the treasury lands; it defaults to the
/// in-process [`ExternalBalances`].
#[derive(Debug, Clone)]
pub struct Group<S = ExternalBalances> {
    id: GroupId,
    expense_policy: ExpensePolicy,
    currency: CurrencyConfig,
    state: GroupState<S>,
}

impl Group<ExternalBalances> {
    /// Create a group crediting an in-process [`ExternalBalances`].
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: GroupConfig) -> Result<Self> {
        Self::with_sink(config, ExternalBalances::new())
    }
}

impl<S: ValueSink + Clone> Group<S> {
    /// Create a group paying out through `sink`.
    ///
    /// The administrator becomes the first active member with a zero stake.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn with_sink(config: GroupConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let GroupConfig {
            administrator,
            required_stake,
            whitelist,
            expense_policy,
            currency,
        } = config;

        let mut membership = Membership::new(required_stake);
        membership.enroll_founder(administrator)?;

        let id = GroupId::new();
        tracing::info!(
            group = %id,
            administrator = %administrator,
            required_stake = %required_stake,
            whitelisted = whitelist.len(),
            policy = ?expense_policy,
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            "Group created"
        );

        Ok(Self {
            id,
            expense_policy,
            currency,
            state: GroupState {
                registry: AddressRegistry::new(administrator, whitelist),
                membership,
                ledger: DebtLedger::new(),
                treasury: Treasury::new(),
                conservation: StakeConservation::new(),
                sink,
                phase: GroupPhase::Open,
                receipt: None,
            },
        })
    }

    /// Run `op` against the state; restore the checkpoint if it or the
    /// conservation check fails.
    ///
    /// `op` must leave registry, membership, ledger and sink untouched
    /// unless it succeeds.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut GroupState<S>) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = self.state.checkpoint();
        let outcome = op(&mut self.state).and_then(|value| {
            self.state.check_conservation()?;
            Ok(value)
        });
        if let Err(err) = &outcome {
            self.state.restore(checkpoint);
            tracing::warn!(group = %self.id, operation, error = %err, "Operation rolled back");
        }
        outcome
    }

    // =================================================================
    // Mutations
    // =================================================================

    /// Join the group as `identity`, paying `paid` as stake.
    ///
    /// # Errors
    /// `AlreadySettled`, `Unauthorized` (not whitelisted), `AlreadyMember`,
    /// `WrongAmount`.
    pub fn join(&mut self, identity: Identity, paid: Amount) -> Result<()> {
        self.state.require_open()?;
        self.transact("join", |st| {
            st.conservation.record_stake(paid)?;
            st.membership
                .join(&st.registry, &mut st.treasury, identity, paid)
        })
    }

    /// Remove an active member, refunding their stake first. Returns the
    /// refunded amount.
    ///
    /// # Errors
    /// `Unauthorized` (not administrator), `AlreadySettled`, `NotAMember`,
    /// or any refund transfer error.
    pub fn remove_member(&mut self, caller: Identity, identity: Identity) -> Result<Amount> {
        self.state.registry.require_administrator(caller)?;
        self.state.require_open()?;
        let group = self.id;
        self.transact("remove_member", |st| {
            st.conservation
                .record_release(st.membership.stake_of(&identity))?;
            let refunded = st
                .membership
                .remove(&mut st.treasury, &mut st.sink, identity)?;
            tracing::debug!(group = %group, member = %identity, "Removal committed");
            Ok(refunded)
        })
    }

    /// Record an expense paid by `payer` on behalf of `debtors`. Returns the
    /// expense index.
    ///
    /// # Errors
    /// `Unauthorized` (caller fails the expense policy), `AlreadySettled`,
    /// `NotAMember`, `InvalidAmount`, `InvalidDebtors`.
    pub fn add_expense(
        &mut self,
        caller: Identity,
        payer: Identity,
        label: impl Into<String>,
        debtors: Vec<Identity>,
        amount: Amount,
    ) -> Result<usize> {
        self.authorize_expense(caller, payer)?;
        self.state.require_open()?;
        if !self.state.membership.is_member(&caller) {
            return Err(LedgerError::NotAMember(caller));
        }
        let group = self.id;
        let label = label.into();
        self.transact("add_expense", |st| {
            let index = st
                .ledger
                .record_expense(&st.membership, payer, label, debtors, amount)?;
            tracing::debug!(group = %group, index, "Expense committed");
            Ok(index)
        })
    }

    fn authorize_expense(&self, caller: Identity, payer: Identity) -> Result<()> {
        let registry = &self.state.registry;
        match self.expense_policy {
            ExpensePolicy::AdminOnly => registry.require_administrator(caller),
            ExpensePolicy::AdminOrPayer => {
                if registry.is_administrator(&caller) || caller == payer {
                    Ok(())
                } else {
                    Err(LedgerError::Unauthorized {
                        caller,
                        required: Capability::Payer,
                    })
                }
            }
        }
    }

    /// Settle the group: pay every active member `stake + net + surplus`,
    /// empty the treasury, and move to [`GroupPhase::Settled`].
    ///
    /// # Errors
    /// `Unauthorized` (not administrator), `AlreadySettled`,
    /// `InsufficientBalance` (a member's debts exceed their collateral, or
    /// the conservation check fails), or any payout transfer error.
    pub fn settle_group(&mut self, caller: Identity) -> Result<SettlementReceipt> {
        self.state.registry.require_administrator(caller)?;
        self.state.require_open()?;
        let group = self.id;
        self.transact("settle_group", |st| {
            st.conservation.record_release(st.treasury.staked())?;
            let receipt = SettlementEngine::settle(
                group,
                &mut st.membership,
                &st.ledger,
                &mut st.treasury,
                &mut st.sink,
            )?;
            st.phase = GroupPhase::Settled;
            st.receipt = Some(receipt.clone());
            Ok(receipt)
        })
    }

    /// Administrative transfer out of the free (non-stake) balance.
    /// Allowed in any phase.
    ///
    /// # Errors
    /// `Unauthorized` (not administrator), `InvalidAmount` (zero),
    /// `InsufficientBalance`, `TransferRejected`.
    pub fn transfer(&mut self, caller: Identity, amount: Amount, recipient: Identity) -> Result<()> {
        self.state.registry.require_administrator(caller)?;
        self.transact("transfer", |st| {
            st.treasury.transfer(&mut st.sink, recipient, amount)
        })
    }

    /// Accept incidental value from anyone. Allowed in any phase.
    ///
    /// # Errors
    /// `InvalidAmount` for zero, `ArithmeticOverflow`.
    pub fn deposit(&mut self, from: Identity, amount: Amount) -> Result<()> {
        self.transact("deposit", |st| st.treasury.deposit(from, amount))
    }

    /// Whitelist `identity` for future joins. Returns `false` if it already was.
    ///
    /// # Errors
    /// `Unauthorized` (not administrator), `AlreadySettled`.
    pub fn whitelist_add(&mut self, caller: Identity, identity: Identity) -> Result<bool> {
        self.state.registry.require_administrator(caller)?;
        self.state.require_open()?;
        self.transact("whitelist_add", |st| Ok(st.registry.admit(identity)))
    }

    /// Drop `identity` from the whitelist. Active members stay active.
    /// Returns `false` if it was not whitelisted.
    ///
    /// # Errors
    /// `Unauthorized` (not administrator), `AlreadySettled`.
    pub fn whitelist_remove(&mut self, caller: Identity, identity: Identity) -> Result<bool> {
        self.state.registry.require_administrator(caller)?;
        self.state.require_open()?;
        self.transact("whitelist_remove", |st| Ok(st.registry.revoke(&identity)))
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The administrator.
    #[must_use]
    pub fn owner(&self) -> Identity {
        self.state.registry.administrator()
    }

    #[must_use]
    pub fn required_amount(&self) -> Amount {
        self.state.membership.required_stake()
    }

    #[must_use]
    pub fn expense_policy(&self) -> ExpensePolicy {
        self.expense_policy
    }

    #[must_use]
    pub fn currency(&self) -> &CurrencyConfig {
        &self.currency
    }

    #[must_use]
    pub fn phase(&self) -> GroupPhase {
        self.state.phase
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.phase.is_settled()
    }

    #[must_use]
    pub fn is_member(&self, identity: &Identity) -> bool {
        self.state.membership.is_member(identity)
    }

    #[must_use]
    pub fn is_whitelisted(&self, identity: &Identity) -> bool {
        self.state.registry.is_whitelisted(identity)
    }

    #[must_use]
    pub fn stake_of(&self, identity: &Identity) -> Amount {
        self.state.membership.stake_of(identity)
    }

    /// Active member at `index` in join order.
    ///
    /// # Errors
    /// `IndexOutOfRange`.
    pub fn active_member(&self, index: usize) -> Result<Identity> {
        self.state.membership.active_member(index)
    }

    #[must_use]
    pub fn active_members_count(&self) -> usize {
        self.state.membership.active_count()
    }

    #[must_use]
    pub fn active_members(&self) -> &[Identity] {
        self.state.membership.active_members()
    }

    /// How much `debtor` owes `creditor`.
    #[must_use]
    pub fn debt(&self, debtor: &Identity, creditor: &Identity) -> Amount {
        self.state.ledger.debt(debtor, creditor)
    }

    /// Signed net position of `member` over the active members.
    ///
    /// # Errors
    /// `ArithmeticOverflow`.
    pub fn net_position(&self, member: &Identity) -> Result<i128> {
        self.state
            .ledger
            .net_position(member, self.state.membership.active_members())
    }

    #[must_use]
    pub fn expenses_len(&self) -> usize {
        self.state.ledger.expenses_len()
    }

    /// # Errors
    /// `IndexOutOfRange`.
    pub fn expense(&self, index: usize) -> Result<&Expense> {
        self.state.ledger.expense(index)
    }

    /// All non-zero debts as `(debtor, creditor, amount)`.
    pub fn outstanding_debts(&self) -> impl Iterator<Item = (Identity, Identity, Amount)> + '_ {
        self.state.ledger.outstanding()
    }

    #[must_use]
    pub fn treasury_balance(&self) -> Amount {
        self.state.treasury.total()
    }

    #[must_use]
    pub fn staked_balance(&self) -> Amount {
        self.state.treasury.staked()
    }

    #[must_use]
    pub fn free_balance(&self) -> Amount {
        self.state.treasury.free()
    }

    /// The receipt of a completed settlement.
    #[must_use]
    pub fn settlement(&self) -> Option<&SettlementReceipt> {
        self.state.receipt.as_ref()
    }

    /// Where outgoing value has been credited.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.state.sink
    }

    /// Mutable access to the sink, e.g. to toggle a refusing recipient.
    /// Treasury state is not reachable through it.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.state.sink
    }

    /// Verify stake conservation and that no pair of members owes in both
    /// directions.
    ///
    /// # Errors
    /// `InsufficientBalance` for a conservation breach, `Internal` for a
    /// two-way debt.
    pub fn check_invariants(&self) -> Result<()> {
        self.state.check_conservation()?;
        for (debtor, creditor, _) in self.state.ledger.outstanding() {
            if !self.state.ledger.debt(&creditor, &debtor).is_zero() {
                return Err(LedgerError::Internal(format!(
                    "debt recorded in both directions between {debtor} and {creditor}"
                )));
            }
        }
        Ok(())
    }

    /// `amount` as a decimal in the group's currency.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the amount does not fit a decimal.
    pub fn format_amount(&self, amount: Amount) -> Result<Decimal> {
        self.currency.format_units(amount)
    }

    /// Decimal amount in the group's currency to smallest units.
    ///
    /// # Errors
    /// `InvalidAmount` for negative values or excess precision.
    pub fn parse_amount(&self, value: Decimal) -> Result<Amount> {
        self.currency.parse_units(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAKE: Amount = Amount::new(1_000);

    struct Fixture {
        group: Group,
        admin: Identity,
        b: Identity,
        c: Identity,
    }

    fn setup(policy: ExpensePolicy) -> Fixture {
        let admin = Identity::random();
        let b = Identity::random();
        let c = Identity::random();
        let config = GroupConfig::new(admin, STAKE, vec![b, c]).with_expense_policy(policy);
        let mut group = Group::new(config).unwrap();
        group.join(b, STAKE).unwrap();
        group.join(c, STAKE).unwrap();
        Fixture { group, admin, b, c }
    }

    #[test]
    fn construction_enrolls_admin() {
        let admin = Identity::random();
        let group = Group::new(GroupConfig::new(admin, STAKE, vec![])).unwrap();
        assert_eq!(group.owner(), admin);
        assert!(group.is_member(&admin));
        assert!(!group.is_whitelisted(&admin));
        assert_eq!(group.active_member(0).unwrap(), admin);
        assert_eq!(group.required_amount(), STAKE);
        assert_eq!(group.phase(), GroupPhase::Open);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = Group::new(GroupConfig::new(Identity::random(), Amount::ZERO, vec![])).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }

    #[test]
    fn non_admin_cannot_remove() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let err = f.group.remove_member(f.b, f.c).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                caller: f.b,
                required: Capability::Administrator
            }
        );
        assert!(f.group.is_member(&f.c));
    }

    #[test]
    fn admin_only_policy_rejects_payer() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let err = f
            .group
            .add_expense(f.b, f.b, "taxi", vec![f.c], Amount::new(100))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { required: Capability::Administrator, .. }));
        assert_eq!(f.group.expenses_len(), 0);
    }

    #[test]
    fn admin_or_payer_policy() {
        let mut f = setup(ExpensePolicy::AdminOrPayer);
        f.group
            .add_expense(f.b, f.b, "taxi", vec![f.c], Amount::new(100))
            .unwrap();
        assert_eq!(f.group.debt(&f.c, &f.b), Amount::new(100));

        // c may not book an expense paid by b.
        let err = f
            .group
            .add_expense(f.c, f.b, "taxi", vec![f.c], Amount::new(100))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { required: Capability::Payer, .. }));
    }

    #[test]
    fn removed_admin_cannot_add_expense() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        f.group.remove_member(f.admin, f.admin).unwrap();
        let err = f
            .group
            .add_expense(f.admin, f.b, "lunch", vec![f.c], Amount::new(10))
            .unwrap_err();
        assert_eq!(err, LedgerError::NotAMember(f.admin));
    }

    #[test]
    fn failed_expense_rolls_back() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let stranger = Identity::random();
        let err = f
            .group
            .add_expense(f.admin, f.b, "lunch", vec![f.c, stranger], Amount::new(10))
            .unwrap_err();
        assert_eq!(err, LedgerError::NotAMember(stranger));
        assert_eq!(f.group.expenses_len(), 0);
        assert!(f.group.debt(&f.c, &f.b).is_zero());
    }

    #[test]
    fn failed_join_restores_conservation() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let d = Identity::random();
        f.group.whitelist_add(f.admin, d).unwrap();
        assert!(f.group.join(d, Amount::new(1)).is_err());
        assert!(f.group.join(f.b, STAKE).is_err());
        f.group.check_invariants().unwrap();
        f.group.join(d, STAKE).unwrap();
        f.group.check_invariants().unwrap();
        assert_eq!(f.group.staked_balance(), Amount::new(3_000));
    }

    #[test]
    fn failed_removal_restores_conservation() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let stranger = Identity::random();
        assert_eq!(
            f.group.remove_member(f.admin, stranger),
            Err(LedgerError::NotAMember(stranger))
        );
        f.group.check_invariants().unwrap();
        f.group.remove_member(f.admin, f.b).unwrap();
        f.group.check_invariants().unwrap();
    }

    #[test]
    fn refused_payout_restores_conservation() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        f.group.sink_mut().refuse(f.c);
        assert!(f.group.settle_group(f.admin).is_err());
        f.group.check_invariants().unwrap();
        assert!(!f.group.is_settled());
        f.group.sink_mut().accept(&f.c);
        f.group.settle_group(f.admin).unwrap();
        f.group.check_invariants().unwrap();
    }

    #[test]
    fn refused_refund_rolls_back_removal() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        f.group.sink_mut().refuse(f.b);
        let err = f.group.remove_member(f.admin, f.b).unwrap_err();
        assert!(matches!(err, LedgerError::TransferRejected { .. }));
        assert!(f.group.is_member(&f.b));
        assert_eq!(f.group.staked_balance(), Amount::new(2_000));
        f.group.check_invariants().unwrap();
    }

    #[test]
    fn whitelist_amendment() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let d = Identity::random();
        assert!(f.group.join(d, STAKE).is_err());
        assert!(f.group.whitelist_add(f.admin, d).unwrap());
        assert!(!f.group.whitelist_add(f.admin, d).unwrap());
        f.group.join(d, STAKE).unwrap();

        // Revoking does not evict.
        assert!(f.group.whitelist_remove(f.admin, d).unwrap());
        assert!(f.group.is_member(&d));
        assert!(!f.group.is_whitelisted(&d));
        assert!(f.group.whitelist_add(f.b, d).is_err());
    }

    #[test]
    fn transfer_spends_free_balance_only() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        let to = Identity::random();
        assert!(matches!(
            f.group.transfer(f.admin, Amount::new(1), to),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        f.group.deposit(Identity::random(), Amount::new(50)).unwrap();
        assert!(f.group.transfer(f.b, Amount::new(10), to).is_err());
        f.group.transfer(f.admin, Amount::new(10), to).unwrap();
        assert_eq!(f.group.sink().balance_of(&to), Amount::new(10));
        assert_eq!(f.group.free_balance(), Amount::new(40));
        assert_eq!(f.group.treasury_balance(), Amount::new(2_040));
    }

    #[test]
    fn settlement_is_terminal() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        assert!(f.group.settle_group(f.b).is_err());
        let receipt = f.group.settle_group(f.admin).unwrap();
        assert_eq!(receipt.total, Amount::new(2_000));
        assert!(f.group.is_settled());
        assert_eq!(f.group.settlement(), Some(&receipt));
        assert_eq!(f.group.settle_group(f.admin).unwrap_err(), LedgerError::AlreadySettled);
        assert_eq!(f.group.join(f.b, STAKE).unwrap_err(), LedgerError::AlreadySettled);
        assert_eq!(
            f.group
                .add_expense(f.admin, f.b, "late", vec![f.c], Amount::new(1))
                .unwrap_err(),
            LedgerError::AlreadySettled
        );
        assert_eq!(f.group.remove_member(f.admin, f.b).unwrap_err(), LedgerError::AlreadySettled);
        f.group.check_invariants().unwrap();
    }

    #[test]
    fn late_deposit_can_be_swept() {
        let mut f = setup(ExpensePolicy::AdminOnly);
        f.group.settle_group(f.admin).unwrap();
        f.group.deposit(f.b, Amount::new(7)).unwrap();
        f.group.transfer(f.admin, Amount::new(7), f.c).unwrap();
        assert!(f.group.treasury_balance().is_zero());
    }

    #[test]
    fn amounts_format_in_group_currency() {
        let f = setup(ExpensePolicy::AdminOnly);
        let amount = f.group.parse_amount(Decimal::new(125, 1)).unwrap();
        assert_eq!(amount, Amount::new(1_250_000_000));
        assert_eq!(f.group.format_amount(amount).unwrap(), Decimal::new(125, 1));
    }
}
