//! Per-tenant ledger
//!
//! A [`Ledger`] owns one tenant's people, transactions and payments behind a
//! single reader/writer lock. Reads take the shared side. Every mutation takes
//! the exclusive side, applies the change to a scratch copy of the state,
//! saves that copy through the [`SnapshotStore`], and only then installs it.
//! A failed save therefore leaves memory untouched and is returned to the
//! caller.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use splitledger_core::{Account, Ledger, MemoryStore, Payment, Person, Transaction};
//!
//! fn main() -> splitledger_core::Result<()> {
//!     let ledger = Ledger::create(Account::new("goats", "Goat Club"), Arc::new(MemoryStore::default()))?;
//!
//!     let ann = ledger.add_person(Person::new("Ann"))?;
//!     let lunch = ledger.add_transaction(Transaction::new("Lunch", 1_600_000_000))?;
//!     ledger.add_payment(lunch.id, Payment::new(ann.id, 1000))?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    error::{Error, Result},
    metrics::Metrics,
    snapshot::LedgerState,
    storage::SnapshotStore,
    types::{Account, EntityId, Payment, Person, Transaction, TransactionUpsert},
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Result of a mutation closure: whether the state must be persisted
enum Outcome<R> {
    Changed(R),
    Unchanged(R),
}

/// One tenant's store of people, transactions and payments
pub struct Ledger {
    identifier: String,
    state: RwLock<LedgerState>,
    store: Arc<dyn SnapshotStore>,
    metrics: Option<Metrics>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("identifier", &self.identifier)
            .field("store", &self.store.location())
            .finish()
    }
}

impl Ledger {
    /// Load a ledger from its store
    ///
    /// With `verify` set, a document whose balances or totals disagree with
    /// its payments is rejected.
    pub fn open(store: Arc<dyn SnapshotStore>, verify: bool) -> Result<Self> {
        let state = store.load()?;

        if state.identifier.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "document at {} has no identifier",
                store.location()
            )));
        }

        if verify {
            state.verify()?;
        }

        Ok(Self::from_state(state, store))
    }

    /// Create a new, empty ledger for `account` and save it
    pub fn create(account: Account, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let state = LedgerState::new(account);
        store.save(&state)?;
        Ok(Self::from_state(state, store))
    }

    /// Wrap an already loaded state without touching the store
    pub fn from_state(state: LedgerState, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            identifier: state.identifier.clone(),
            state: RwLock::new(state),
            store,
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Tenant identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Where this ledger is persisted
    pub fn location(&self) -> String {
        self.store.location()
    }

    // Mutations

    /// Store a new person under the next counter value
    pub fn add_person(&self, person: Person) -> Result<Person> {
        self.commit("add_person", |state| {
            let mut person = person;
            person.id = state.next_id();
            person.balance = 0;
            state.people.insert(person.id, person.clone());
            Ok(Outcome::Changed(person))
        })
    }

    /// Store a new transaction under the next counter value, with a zero total
    pub fn add_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        self.commit("add_transaction", |state| {
            Ok(Outcome::Changed(state.insert_transaction(transaction)))
        })
    }

    /// Replace the description and date of an existing transaction
    ///
    /// Returns `None` if the id is unknown; nothing is mutated in that case.
    pub fn update_transaction(
        &self,
        id: EntityId,
        fields: Transaction,
    ) -> Result<Option<Transaction>> {
        self.commit("update_transaction", |state| {
            Ok(match state.update_fields(id, &fields) {
                Some(updated) => Outcome::Changed(Some(updated)),
                None => Outcome::Unchanged(None),
            })
        })
    }

    /// Remove every payment of a transaction, reversing their balance effect
    pub fn delete_payments_for_transaction(&self, id: EntityId) -> Result<()> {
        self.commit("delete_payments", |state| {
            Ok(if state.reverse_payments(id)? {
                Outcome::Changed(())
            } else {
                Outcome::Unchanged(())
            })
        })
    }

    /// Append a payment to a transaction
    ///
    /// The amount is added to the person's balance and the transaction total
    /// is recomputed from its positive payments.
    pub fn add_payment(&self, transaction_id: EntityId, payment: Payment) -> Result<Payment> {
        self.commit("add_payment", |state| {
            Ok(Outcome::Changed(state.apply_payment(transaction_id, payment)?))
        })
    }

    /// Remove a transaction and its payments, reversing their balance effect
    ///
    /// Unknown ids are a no-op.
    pub fn delete_transaction_by_id(&self, id: EntityId) -> Result<()> {
        self.commit("delete_transaction", |state| {
            let had_payments = state.reverse_payments(id)?;
            let had_transaction = state.transactions.remove(&id).is_some();
            Ok(if had_payments || had_transaction {
                Outcome::Changed(())
            } else {
                Outcome::Unchanged(())
            })
        })
    }

    /// Add or fully replace a transaction together with its payment list
    ///
    /// With an existing id the description and date are updated, the old
    /// payments are reversed and removed, then the new ones are applied. Without
    /// one a new transaction is created first. All of it is one mutation and
    /// one save. Returns `None` if a supplied id is unknown.
    pub fn upsert_transaction(&self, request: TransactionUpsert) -> Result<Option<Transaction>> {
        let existing = request.existing_id();
        self.commit("upsert_transaction", |state| {
            let fields = Transaction::new(request.description, request.date);

            let id = match existing {
                Some(id) => {
                    if state.update_fields(id, &fields).is_none() {
                        return Ok(Outcome::Unchanged(None));
                    }
                    state.reverse_payments(id)?;
                    id
                }
                None => state.insert_transaction(fields).id,
            };

            for input in request.payments {
                state.apply_payment(id, input.into())?;
            }

            Ok(Outcome::Changed(state.transactions.get(&id).cloned()))
        })
    }

    // Reads

    /// Tenant descriptive record
    pub fn get_account(&self) -> Account {
        self.state.read().account.clone()
    }

    /// All people, ordered by id
    pub fn get_people(&self) -> Vec<Person> {
        self.state.read().people.values().cloned().collect()
    }

    /// All transactions, ordered by id
    pub fn get_transactions(&self) -> Vec<Transaction> {
        self.state.read().transactions.values().cloned().collect()
    }

    /// One transaction, if it exists
    pub fn get_transaction_by_id(&self, id: EntityId) -> Option<Transaction> {
        self.state.read().transactions.get(&id).cloned()
    }

    /// Payments of a transaction in insertion order, with person names filled in
    pub fn get_payments_for_transaction(&self, id: EntityId) -> Vec<Payment> {
        let state = self.state.read();
        state
            .payments
            .get(&id)
            .map(|payments| {
                payments
                    .iter()
                    .map(|p| Payment {
                        name: state.people.get(&p.person_id).map(|person| person.name.clone()),
                        ..p.clone()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Check balance, total and id invariants against the current state
    pub fn check_invariants(&self) -> Result<()> {
        self.state.read().verify()
    }

    /// Apply `mutate` under the exclusive lock and persist before releasing it
    fn commit<R>(
        &self,
        operation: &'static str,
        mutate: impl FnOnce(&mut LedgerState) -> Result<Outcome<R>>,
    ) -> Result<R> {
        let mut guard = self.state.write();
        let mut next = guard.clone();

        let value = match mutate(&mut next)? {
            Outcome::Unchanged(value) => return Ok(value),
            Outcome::Changed(value) => value,
        };

        let started = Instant::now();
        if let Err(err) = self.store.save(&next) {
            if let Some(metrics) = &self.metrics {
                metrics.record_persist_failure();
            }
            tracing::warn!(
                ledger = %self.identifier,
                operation,
                error = %err,
                "Snapshot save failed, mutation discarded"
            );
            return Err(err);
        }

        *guard = next;

        if let Some(metrics) = &self.metrics {
            metrics.record_persist_duration(started.elapsed().as_secs_f64());
            metrics.record_mutation(operation);
        }

        tracing::debug!(ledger = %self.identifier, operation, "Mutation committed");

        Ok(value)
    }
}

// Helpers below run on a state the caller already holds exclusively.
impl LedgerState {
    fn next_id(&mut self) -> EntityId {
        self.autoincrement += 1;
        self.autoincrement
    }

    fn insert_transaction(&mut self, transaction: Transaction) -> Transaction {
        let mut transaction = transaction;
        transaction.id = self.next_id();
        transaction.total_amount = 0;
        self.transactions.insert(transaction.id, transaction.clone());
        transaction
    }

    fn update_fields(&mut self, id: EntityId, fields: &Transaction) -> Option<Transaction> {
        let current = self.transactions.get_mut(&id)?;
        current.description = fields.description.clone();
        current.date = fields.date;
        Some(current.clone())
    }

    /// Subtract every payment of `transaction_id` from its person's balance
    /// and drop the list. Returns false if there was nothing to remove.
    fn reverse_payments(&mut self, transaction_id: EntityId) -> Result<bool> {
        let Some(payments) = self.payments.remove(&transaction_id) else {
            return Ok(false);
        };

        for payment in &payments {
            if let Some(person) = self.people.get_mut(&payment.person_id) {
                person.balance = person.balance.checked_sub(payment.amount).ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "balance overflow for person {}",
                        payment.person_id
                    ))
                })?;
            }
        }

        if let Some(transaction) = self.transactions.get_mut(&transaction_id) {
            transaction.total_amount = 0;
        }

        Ok(true)
    }

    fn apply_payment(&mut self, transaction_id: EntityId, payment: Payment) -> Result<Payment> {
        if !self.transactions.contains_key(&transaction_id) {
            return Err(Error::TransactionNotFound(transaction_id));
        }

        let person = self
            .people
            .get_mut(&payment.person_id)
            .ok_or(Error::PersonNotFound(payment.person_id))?;
        person.balance = person.balance.checked_add(payment.amount).ok_or_else(|| {
            Error::InvariantViolation(format!("balance overflow for person {}", payment.person_id))
        })?;

        let stored = Payment {
            name: None,
            ..payment
        };
        let payments = self.payments.entry(transaction_id).or_default();
        payments.push(stored.clone());

        let total = LedgerState::positive_total(payments)?;
        if let Some(transaction) = self.transactions.get_mut(&transaction_id) {
            transaction.total_amount = total;
        }

        Ok(stored)
    }
}
