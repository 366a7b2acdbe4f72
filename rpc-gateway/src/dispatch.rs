//! Method table: resolves `module.method` to a ledger operation
//!
//! Every handler decodes its params, resolves the tenant through the
//! [`Registry`] and runs exactly one ledger operation. Handlers block on the
//! ledger lock and on disk writes; callers run them off the async executor.

use crate::errors::{GatewayError, Result};
use crate::models::{
    self, AccountParams, EntityParams, PersonParams, TenantParams, TransactionParams,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use splitledger_core::{Error as LedgerError, Person, Registry};
use std::collections::HashMap;
use std::sync::Arc;

type MethodHandler = fn(&Registry, Value) -> Result<Value>;

/// Routes RPC calls to ledgers
pub struct Dispatcher {
    registry: Arc<Registry>,
    methods: HashMap<&'static str, MethodHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Dispatcher")
            .field("tenants", &self.registry.len())
            .field("methods", &methods)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        let mut methods: HashMap<&'static str, MethodHandler> = HashMap::new();
        methods.insert("account.get", account_get);
        methods.insert("person.getforaccount", person_get_for_account);
        methods.insert("person.add", person_add);
        methods.insert("transaction.getforaccount", transaction_get_for_account);
        methods.insert("transaction.add", transaction_add);
        methods.insert("transaction.update", transaction_add);
        methods.insert("transaction.get", transaction_get);
        methods.insert("transaction.get_payments", transaction_get_payments);
        methods.insert("transaction.delete", transaction_delete);

        Self { registry, methods }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the handler registered for `canonical_method`
    pub fn dispatch(&self, canonical_method: &str, params: Value) -> Result<Value> {
        tracing::info!(method = %canonical_method, "API Request");

        let handler = self
            .methods
            .get(canonical_method)
            .ok_or_else(|| GatewayError::UnknownMethod(canonical_method.to_string()))?;

        handler(self.registry.as_ref(), params).map_err(|err| {
            tracing::warn!(method = %canonical_method, error = %err, "API call failed");
            match err {
                GatewayError::InvalidParams { reason, .. } => GatewayError::InvalidParams {
                    method: canonical_method.to_string(),
                    reason,
                },
                other => other,
            }
        })
    }
}

/// Decode params; an absent `params` reads as an empty object
fn decode<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    models::from_value(params).map_err(|e| GatewayError::InvalidParams {
        method: String::new(),
        reason: e.to_string(),
    })
}

fn account_get(registry: &Registry, params: Value) -> Result<Value> {
    let params: AccountParams = decode(params)?;
    let ledger = registry.require(&params.identifier)?;
    Ok(serde_json::to_value(ledger.get_account())?)
}

fn person_get_for_account(registry: &Registry, params: Value) -> Result<Value> {
    let params: TenantParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    Ok(serde_json::to_value(ledger.get_people())?)
}

fn person_add(registry: &Registry, params: Value) -> Result<Value> {
    let params: PersonParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    let person = ledger.add_person(Person::new(params.data.name))?;
    Ok(serde_json::to_value(person)?)
}

fn transaction_get_for_account(registry: &Registry, params: Value) -> Result<Value> {
    let params: TenantParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    Ok(serde_json::to_value(ledger.get_transactions())?)
}

/// Add or fully replace a transaction with its payment list
fn transaction_add(registry: &Registry, params: Value) -> Result<Value> {
    let params: TransactionParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;

    let upsert = splitledger_core::TransactionUpsert::from(params.data);
    let requested = upsert.existing_id();
    match ledger.upsert_transaction(upsert)? {
        Some(_) => Ok(Value::Null),
        None => Err(LedgerError::TransactionNotFound(requested.unwrap_or_default()).into()),
    }
}

/// Unknown ids yield the zero transaction
fn transaction_get(registry: &Registry, params: Value) -> Result<Value> {
    let params: EntityParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    let transaction = ledger.get_transaction_by_id(params.id).unwrap_or_default();
    Ok(serde_json::to_value(transaction)?)
}

fn transaction_get_payments(registry: &Registry, params: Value) -> Result<Value> {
    let params: EntityParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    Ok(serde_json::to_value(ledger.get_payments_for_transaction(params.id))?)
}

fn transaction_delete(registry: &Registry, params: Value) -> Result<Value> {
    let params: EntityParams = decode(params)?;
    let ledger = registry.require(&params.account_identifier)?;
    ledger.delete_transaction_by_id(params.id)?;
    Ok(Value::Null)
}
