//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Balance consistency: balance(p) == Σ amount of p's payments
//! - Total consistency: total(t) == Σ positive amounts of t's payments
//! - Id uniqueness across people and transactions
//! - Round trip: deserialize(serialize(state)) == state
//! - Deleting a transaction restores every balance it touched
//! - Amounts at the edge of the i64 range are rejected, never wrapped

use proptest::prelude::*;
use splitledger_core::{
    snapshot, Account, EntityId, Error, JsonFileStore, Ledger, LedgerState, MemoryStore, Payment,
    PaymentInput, Person, Transaction, TransactionUpsert, WriteMode,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One step applied to a ledger; indices pick among existing records
#[derive(Debug, Clone)]
enum Op {
    AddPerson,
    AddTransaction,
    AddPayment { tx: usize, person: usize, amount: i64 },
    DeleteTransaction { tx: usize },
    DeletePayments { tx: usize },
    Upsert { tx: Option<usize>, payments: Vec<(usize, i64)> },
}

/// Strategy for generating amounts, refunds included
fn amount_strategy() -> impl Strategy<Value = i64> + Clone {
    -50_000i64..100_000i64
}

/// Amounts near the ends of the i64 range, mixed with small ones
fn extreme_amount_strategy() -> impl Strategy<Value = i64> + Clone {
    prop_oneof![
        Just(i64::MAX),
        Just(i64::MIN),
        Just(-i64::MAX),
        Just(i64::MAX / 2 + 1),
        (i64::MAX - 10)..=i64::MAX,
        i64::MIN..=(i64::MIN + 10),
        -100i64..100i64,
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    op_strategy_with(amount_strategy())
}

fn op_strategy_with<S>(amounts: S) -> impl Strategy<Value = Op>
where
    S: Strategy<Value = i64> + Clone + 'static,
{
    prop_oneof![
        2 => Just(Op::AddPerson),
        2 => Just(Op::AddTransaction),
        5 => (any::<usize>(), any::<usize>(), amounts.clone())
            .prop_map(|(tx, person, amount)| Op::AddPayment { tx, person, amount }),
        1 => any::<usize>().prop_map(|tx| Op::DeleteTransaction { tx }),
        1 => any::<usize>().prop_map(|tx| Op::DeletePayments { tx }),
        2 => (
            prop::option::of(any::<usize>()),
            prop::collection::vec((any::<usize>(), amounts), 0..5),
        )
            .prop_map(|(tx, payments)| Op::Upsert { tx, payments }),
    ]
}

fn create_test_ledger() -> Ledger {
    Ledger::create(
        Account::new("goats", "Goat Club"),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
}

fn pick(ids: &[EntityId], index: usize) -> Option<EntityId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn apply(ledger: &Ledger, op: &Op) {
    try_apply(ledger, op).unwrap();
}

fn try_apply(ledger: &Ledger, op: &Op) -> splitledger_core::Result<()> {
    let people: Vec<EntityId> = ledger.get_people().iter().map(|p| p.id).collect();
    let transactions: Vec<EntityId> = ledger.get_transactions().iter().map(|t| t.id).collect();

    match op {
        Op::AddPerson => {
            ledger.add_person(Person::new("someone"))?;
        }
        Op::AddTransaction => {
            ledger.add_transaction(Transaction::new("expense", 0))?;
        }
        Op::AddPayment { tx, person, amount } => {
            if let (Some(tx), Some(person)) = (pick(&transactions, *tx), pick(&people, *person)) {
                ledger.add_payment(tx, Payment::new(person, *amount))?;
            }
        }
        Op::DeleteTransaction { tx } => {
            if let Some(tx) = pick(&transactions, *tx) {
                ledger.delete_transaction_by_id(tx)?;
            }
        }
        Op::DeletePayments { tx } => {
            if let Some(tx) = pick(&transactions, *tx) {
                ledger.delete_payments_for_transaction(tx)?;
            }
        }
        Op::Upsert { tx, payments } => {
            if people.is_empty() {
                return Ok(());
            }
            let id = tx.and_then(|index| pick(&transactions, index));
            let payments = payments
                .iter()
                .map(|(person, amount)| PaymentInput {
                    person_id: pick(&people, *person).unwrap(),
                    amount: *amount,
                })
                .collect();
            ledger
                .upsert_transaction(TransactionUpsert {
                    id,
                    description: "upsert".to_string(),
                    date: 1,
                    payments,
                })?;
        }
    }
    Ok(())
}

/// Recompute balances and totals from payments alone
fn assert_consistent(state: &LedgerState) -> Result<(), TestCaseError> {
    let mut balances: BTreeMap<EntityId, i128> = BTreeMap::new();
    for (tx, payments) in &state.payments {
        prop_assert!(state.transactions.contains_key(tx));
        let positive: i128 = payments
            .iter()
            .filter(|p| p.amount > 0)
            .map(|p| i128::from(p.amount))
            .sum();
        prop_assert_eq!(i128::from(state.transactions[tx].total_amount), positive);
        for payment in payments {
            *balances.entry(payment.person_id).or_default() += i128::from(payment.amount);
        }
    }
    for (id, transaction) in &state.transactions {
        if !state.payments.contains_key(id) {
            prop_assert_eq!(transaction.total_amount, 0);
        }
    }
    for (id, person) in &state.people {
        prop_assert_eq!(i128::from(person.balance), balances.get(id).copied().unwrap_or(0));
    }

    let people: BTreeSet<_> = state.people.keys().collect();
    let transactions: BTreeSet<_> = state.transactions.keys().collect();
    prop_assert!(people.is_disjoint(&transactions));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: balances and totals always match the payments
    #[test]
    fn prop_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let ledger = create_test_ledger();
        for op in &ops {
            apply(&ledger, op);
            assert_consistent(&ledger.snapshot())?;
        }
        prop_assert!(ledger.check_invariants().is_ok());
    }

    /// Property: out-of-range sums are refused and leave the ledger as it was
    #[test]
    fn prop_extreme_amounts_rejected_atomically(
        ops in prop::collection::vec(op_strategy_with(extreme_amount_strategy()), 1..60)
    ) {
        let ledger = create_test_ledger();
        for op in &ops {
            let before = ledger.snapshot();
            match try_apply(&ledger, op) {
                Ok(()) => {}
                Err(Error::InvariantViolation(_)) => prop_assert_eq!(ledger.snapshot(), before),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            assert_consistent(&ledger.snapshot())?;
        }
        prop_assert!(ledger.check_invariants().is_ok());
    }

    /// Property: ids are never reused, even after deletes
    #[test]
    fn prop_ids_never_reused(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let ledger = create_test_ledger();
        let mut seen = BTreeSet::new();
        for op in &ops {
            apply(&ledger, op);
            let state = ledger.snapshot();
            for id in state.people.keys().chain(state.transactions.keys()) {
                seen.insert(*id);
            }
            prop_assert!(seen.iter().all(|id| *id <= state.autoincrement));
        }
        let person = ledger.add_person(Person::new("late")).unwrap();
        prop_assert!(!seen.contains(&person.id));
    }

    /// Property: serialize then deserialize reproduces the state
    #[test]
    fn prop_round_trip(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let ledger = create_test_ledger();
        for op in &ops {
            apply(&ledger, op);
        }
        let state = ledger.snapshot();
        let bytes = snapshot::serialize(&state).unwrap();
        prop_assert_eq!(snapshot::deserialize(&bytes).unwrap(), state);
    }

    /// Property: deleting a transaction restores the balances before it
    #[test]
    fn prop_delete_restores_balances(
        setup in prop::collection::vec(op_strategy(), 0..30),
        payments in prop::collection::vec((any::<usize>(), amount_strategy()), 1..8),
    ) {
        let ledger = create_test_ledger();
        ledger.add_person(Person::new("first")).unwrap();
        for op in &setup {
            apply(&ledger, op);
        }

        let before: Vec<Person> = ledger.get_people();
        let ids: Vec<EntityId> = before.iter().map(|p| p.id).collect();

        let tx = ledger.add_transaction(Transaction::new("temporary", 0)).unwrap();
        for (person, amount) in &payments {
            ledger.add_payment(tx.id, Payment::new(pick(&ids, *person).unwrap(), *amount)).unwrap();
        }
        ledger.delete_transaction_by_id(tx.id).unwrap();

        prop_assert_eq!(ledger.get_people(), before.clone());

        // a second delete changes nothing
        ledger.delete_transaction_by_id(tx.id).unwrap();
        prop_assert_eq!(ledger.get_people(), before);
        prop_assert!(ledger.get_transaction_by_id(tx.id).is_none());
    }
}

#[test]
fn test_reload_from_file_matches_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goats.json");
    let store = Arc::new(JsonFileStore::new(&path, WriteMode::AtomicRename));
    let ledger = Ledger::create(Account::new("goats", "Goat Club"), store.clone()).unwrap();

    let ann = ledger.add_person(Person::new("Ann")).unwrap();
    let bob = ledger.add_person(Person::new("Bob")).unwrap();
    let hay = ledger.add_transaction(Transaction::new("Hay", 1_600_000_000)).unwrap();
    ledger.add_payment(hay.id, Payment::new(ann.id, 1200)).unwrap();
    ledger.add_payment(hay.id, Payment::new(bob.id, -600)).unwrap();

    let reopened = Ledger::open(store, true).unwrap();
    assert_eq!(reopened.snapshot(), ledger.snapshot());
    assert_eq!(reopened.get_transaction_by_id(hay.id).unwrap().total_amount, 1200);

    let next = reopened.add_person(Person::new("Cat")).unwrap();
    assert_eq!(next.id, 4);
}

#[test]
fn test_scenario_update_replaces_payments() {
    let ledger = create_test_ledger();
    let a = ledger.add_person(Person::new("A")).unwrap();
    let b = ledger.add_person(Person::new("B")).unwrap();

    let t = ledger.add_transaction(Transaction::new("Feed", 0)).unwrap();
    ledger.add_payment(t.id, Payment::new(a.id, 300)).unwrap();
    ledger.add_payment(t.id, Payment::new(b.id, 200)).unwrap();
    let a_before = 300;
    let b_before = 200;

    ledger
        .update_transaction(t.id, Transaction::new("Feed", 1))
        .unwrap()
        .unwrap();
    ledger.delete_payments_for_transaction(t.id).unwrap();
    ledger.add_payment(t.id, Payment::new(a.id, 500)).unwrap();

    let people = ledger.get_people();
    assert_eq!(people[0].balance, a_before + 200);
    assert_eq!(people[1].balance, b_before - 200);
    assert_eq!(ledger.get_transaction_by_id(t.id).unwrap().total_amount, 500);
}
