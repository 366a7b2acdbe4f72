//! Persisted document for one ledger and its JSON codec
//!
//! The whole state of a tenant is one document:
//!
//! ```text
//! {
//!     "Identifier": "...",
//!     "Account": { "Identifier": "...", "Name": "...", ... },
//!     "People": { "1": { "Id": 1, "Name": "...", "Balance": 0 } },
//!     "Transactions": { "2": { "Id": 2, "Description": "...", "Date": 0, "TotalAmount": 0 } },
//!     "Payments": { "2": [ { "PersonId": 1, "Amount": 1000 } ] },
//!     "Autoincrement": 2
//! }
//! ```
//!
//! Collections written as `null` by older writers decode as empty.

use crate::{
    error::{Error, Result},
    types::{Account, Amount, EntityId, Payment, Person, Transaction},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Full state of one tenant's ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LedgerState {
    /// Tenant key
    pub identifier: String,

    /// Descriptive record
    #[serde(default, deserialize_with = "null_as_default")]
    pub account: Account,

    /// People by id
    #[serde(default, deserialize_with = "null_as_default")]
    pub people: BTreeMap<EntityId, Person>,

    /// Transactions by id
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: BTreeMap<EntityId, Transaction>,

    /// Ordered payment lists by transaction id
    #[serde(default, deserialize_with = "null_as_default")]
    pub payments: BTreeMap<EntityId, Vec<Payment>>,

    /// Last id handed out to a person or a transaction
    #[serde(default)]
    pub autoincrement: EntityId,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Encode a ledger state as an indented JSON document
pub fn serialize(state: &LedgerState) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(state)?)
}

/// Decode a ledger state from its JSON document
///
/// Person names found on stored payments are dropped; they are resolved at
/// read time only.
pub fn deserialize(bytes: &[u8]) -> Result<LedgerState> {
    let mut state: LedgerState = serde_json::from_slice(bytes)?;
    for payment in state.payments.values_mut().flatten() {
        payment.name = None;
    }
    Ok(state)
}

impl LedgerState {
    /// Empty ledger for a new tenant
    pub fn new(account: Account) -> Self {
        Self {
            identifier: account.identifier.clone(),
            account,
            ..Default::default()
        }
    }

    /// Sum of the positive amounts in a payment list
    ///
    /// A sum that does not fit in an [`Amount`] is an invariant violation.
    pub fn positive_total(payments: &[Payment]) -> Result<Amount> {
        payments
            .iter()
            .filter(|p| p.amount > 0)
            .try_fold(0 as Amount, |total, p| total.checked_add(p.amount))
            .ok_or_else(|| Error::InvariantViolation("payment total overflows".to_string()))
    }

    /// Check every consistency invariant of the document
    ///
    /// - ids are unique across people and transactions and never exceed the counter
    /// - payments belong to existing transactions and reference existing people
    /// - each balance equals the sum of that person's payment amounts
    /// - each total equals the sum of that transaction's positive payment amounts
    pub fn verify(&self) -> Result<()> {
        for (key, person) in &self.people {
            if *key != person.id {
                return Err(Error::InvariantViolation(format!(
                    "person stored under key {} has id {}",
                    key, person.id
                )));
            }
            if self.transactions.contains_key(key) {
                return Err(Error::InvariantViolation(format!(
                    "id {} used by both a person and a transaction",
                    key
                )));
            }
        }

        for (key, transaction) in &self.transactions {
            if *key != transaction.id {
                return Err(Error::InvariantViolation(format!(
                    "transaction stored under key {} has id {}",
                    key, transaction.id
                )));
            }
        }

        let max_id = self
            .people
            .keys()
            .chain(self.transactions.keys())
            .copied()
            .max()
            .unwrap_or(0);
        if max_id > self.autoincrement {
            return Err(Error::InvariantViolation(format!(
                "id {} exceeds counter {}",
                max_id, self.autoincrement
            )));
        }

        // Summed wide so the result does not depend on payment order
        let mut balances: BTreeMap<EntityId, i128> = BTreeMap::new();
        for (transaction_id, payments) in &self.payments {
            let transaction = self
                .transactions
                .get(transaction_id)
                .ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "payments exist for missing transaction {}",
                        transaction_id
                    ))
                })?;

            for payment in payments {
                if !self.people.contains_key(&payment.person_id) {
                    return Err(Error::InvariantViolation(format!(
                        "payment in transaction {} references missing person {}",
                        transaction_id, payment.person_id
                    )));
                }
                *balances.entry(payment.person_id).or_default() += i128::from(payment.amount);
            }

            let expected = Self::positive_total(payments)?;
            if transaction.total_amount != expected {
                return Err(Error::InvariantViolation(format!(
                    "transaction {} total is {}, payments sum to {}",
                    transaction_id, transaction.total_amount, expected
                )));
            }
        }

        for (id, transaction) in &self.transactions {
            if !self.payments.contains_key(id) && transaction.total_amount != 0 {
                return Err(Error::InvariantViolation(format!(
                    "transaction {} has total {} but no payments",
                    id, transaction.total_amount
                )));
            }
        }

        for (id, person) in &self.people {
            let expected = balances.get(id).copied().unwrap_or(0);
            if i128::from(person.balance) != expected {
                return Err(Error::InvariantViolation(format!(
                    "person {} balance is {}, payments sum to {}",
                    id, person.balance, expected
                )));
            }
        }

        Ok(())
    }
}
