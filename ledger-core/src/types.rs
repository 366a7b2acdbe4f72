//! Core types for the ledger
//!
//! Amounts and balances are signed integers in minor currency units. Field
//! names serialize in PascalCase so stored documents and API responses keep
//! the shape existing clients already read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier shared by people and transactions (one counter per ledger)
pub type EntityId = i64;

/// Monetary amount in minor currency units
pub type Amount = i64;

/// Tenant-level descriptive record, one per ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    /// Tenant key
    pub identifier: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Any other descriptive fields carried by the stored document
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Account {
    /// Create an account with only an identifier and a name
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// A participant with a running balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    /// Assigned by the ledger counter
    #[serde(default)]
    pub id: EntityId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Sum of this person's payment amounts. Maintained by the ledger only.
    #[serde(default)]
    pub balance: Amount,
}

impl Person {
    /// New person, not yet stored (id and balance are assigned by the ledger)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            balance: 0,
        }
    }
}

/// A shared expense event
///
/// `Transaction::default()` is the zero value returned to callers that look up
/// an unknown id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    /// Assigned by the ledger counter
    #[serde(default)]
    pub id: EntityId,

    /// Free text
    #[serde(default)]
    pub description: String,

    /// Integer timestamp, opaque to the ledger
    #[serde(default)]
    pub date: i64,

    /// Sum of the positive payment amounts only
    #[serde(default)]
    pub total_amount: Amount,
}

impl Transaction {
    /// New transaction, not yet stored
    pub fn new(description: impl Into<String>, date: i64) -> Self {
        Self {
            id: 0,
            description: description.into(),
            date,
            total_amount: 0,
        }
    }
}

/// One person's contribution or adjustment tied to a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    /// Referenced person
    pub person_id: EntityId,

    /// Signed amount; negative values are refunds or corrections
    pub amount: Amount,

    /// Person name resolved at read time; never stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Payment {
    /// New payment for a person
    pub fn new(person_id: EntityId, amount: Amount) -> Self {
        Self {
            person_id,
            amount,
            name: None,
        }
    }
}

/// One entry of a submitted payment list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentInput {
    /// Referenced person
    pub person_id: EntityId,
    /// Signed amount
    pub amount: Amount,
}

impl From<PaymentInput> for Payment {
    fn from(input: PaymentInput) -> Self {
        Payment::new(input.person_id, input.amount)
    }
}

/// Add-or-update request carrying the full replacement payment list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpsert {
    /// Existing transaction to replace; `None` (or a non-positive id) creates one
    pub id: Option<EntityId>,
    /// New description
    pub description: String,
    /// New date
    pub date: i64,
    /// Complete payment list; replaces any existing payments
    pub payments: Vec<PaymentInput>,
}

impl TransactionUpsert {
    /// The id to update, if this request targets an existing transaction
    pub fn existing_id(&self) -> Option<EntityId> {
        self.id.filter(|id| *id > 0)
    }
}
