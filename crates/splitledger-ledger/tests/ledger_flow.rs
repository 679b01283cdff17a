//! Integration tests across registry, membership, debt ledger and treasury.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use splitledger_ledger::{AddressRegistry, DebtLedger, ExternalBalances, Membership, Treasury};
use splitledger_types::*;

const STAKE: Amount = Amount::new(500);

struct Ledger {
    registry: AddressRegistry,
    membership: Membership,
    debts: DebtLedger,
    treasury: Treasury,
    sink: ExternalBalances,
    admin: Identity,
    pool: Vec<Identity>,
}

impl Ledger {
    fn new(pool_size: usize) -> Self {
        let admin = Identity::random();
        let pool: Vec<Identity> = (0..pool_size).map(|_| Identity::random()).collect();
        let mut membership = Membership::new(STAKE);
        membership.enroll_founder(admin).unwrap();
        Self {
            registry: AddressRegistry::new(admin, pool.iter().copied()),
            membership,
            debts: DebtLedger::new(),
            treasury: Treasury::new(),
            sink: ExternalBalances::new(),
            admin,
            pool,
        }
    }

    fn join_all(&mut self) {
        for id in self.pool.clone() {
            self.membership
                .join(&self.registry, &mut self.treasury, id, STAKE)
                .unwrap();
        }
    }
}

#[test]
fn join_expense_remove_flow() {
    let mut l = Ledger::new(3);
    l.join_all();
    let [b, c, d] = [l.pool[0], l.pool[1], l.pool[2]];
    assert_eq!(l.treasury.staked(), Amount::new(1_500));

    l.debts
        .record_expense(&l.membership, b, "groceries", vec![c, d], Amount::new(90))
        .unwrap();
    assert_eq!(l.debts.debt(&c, &b), Amount::new(45));
    assert_eq!(l.debts.net_position(&b, l.membership.active_members()).unwrap(), 90);

    let refunded = l.membership.remove(&mut l.treasury, &mut l.sink, d).unwrap();
    assert_eq!(refunded, STAKE);
    assert_eq!(l.sink.balance_of(&d), STAKE);

    // d's debt stays on record but drops out of the active net position.
    assert_eq!(l.debts.debt(&d, &b), Amount::new(45));
    assert_eq!(l.debts.net_position(&b, l.membership.active_members()).unwrap(), 45);

    // d can no longer take part in expenses.
    let err = l
        .debts
        .record_expense(&l.membership, b, "taxi", vec![d], Amount::new(10))
        .unwrap_err();
    assert_eq!(err, LedgerError::NotAMember(d));
    assert_eq!(l.debts.expenses_len(), 1);
}

#[test]
fn expense_history_serializes() {
    let mut l = Ledger::new(1);
    l.join_all();
    let b = l.pool[0];
    l.debts
        .record_expense(&l.membership, l.admin, "rent", vec![b], Amount::new(7))
        .unwrap();

    let json = serde_json::to_string(l.debts.expenses()).unwrap();
    let back: Vec<Expense> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_slice(), l.debts.expenses());
    assert!(json.contains(&b.to_string()));
}

#[test]
fn random_expenses_keep_single_direction() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut l = Ledger::new(6);
    l.join_all();
    let members = l.membership.active_members().to_vec();

    for _ in 0..500 {
        let payer = *members.choose(&mut rng).unwrap();
        let mut debtors: Vec<Identity> = members.iter().copied().filter(|m| *m != payer).collect();
        debtors.shuffle(&mut rng);
        debtors.truncate(rng.gen_range(1..=debtors.len()));
        let amount = Amount::new(rng.gen_range(1..1_000));
        l.debts
            .record_expense(&l.membership, payer, "random", debtors, amount)
            .unwrap();

        for (debtor, creditor, owed) in l.debts.outstanding() {
            assert!(!owed.is_zero());
            assert!(l.debts.debt(&creditor, &debtor).is_zero());
        }
        let total: i128 = members
            .iter()
            .map(|m| l.debts.net_position(m, &members).unwrap())
            .sum();
        assert_eq!(total, 0);
    }
    assert_eq!(l.debts.expenses_len(), 500);
    assert_eq!(l.treasury.staked(), l.membership.total_stake().unwrap());
}
