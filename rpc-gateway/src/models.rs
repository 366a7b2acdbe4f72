//! Request and response shapes of the RPC surface
//!
//! Keys are matched case-insensitively: [`from_value`] lower-cases every
//! object key before decoding, so `Account_Identifier`, `account_identifier`
//! and `ACCOUNT_IDENTIFIER` all name the same field.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use splitledger_core::{EntityId, PaymentInput, TransactionUpsert};

/// Decode `value` into `T`, ignoring the case of object keys
pub fn from_value<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(lowercase_keys(value))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Body of every RPC call
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRequest {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl ApiRequest {
    /// `module.method`, lower-cased
    pub fn canonical_method(&self) -> String {
        format!(
            "{}.{}",
            self.module.to_lowercase(),
            self.method.to_lowercase()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResult {
    pub api: &'static str,
    pub action: &'static str,
}

/// Success envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub result: ApiResult,
    pub response: Value,
}

impl ApiResponse {
    pub fn ok(response: Value) -> Self {
        Self {
            result: ApiResult {
                api: "OK",
                action: "OK",
            },
            response,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountParams {
    #[serde(default)]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantParams {
    #[serde(default)]
    pub account_identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityParams {
    #[serde(default)]
    pub account_identifier: String,
    #[serde(default)]
    pub id: EntityId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentParams {
    #[serde(default, alias = "toad", alias = "personid")]
    pub person_id: EntityId,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub payments: Vec<PaymentParams>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionParams {
    #[serde(default)]
    pub account_identifier: String,
    #[serde(default)]
    pub data: TransactionData,
}

impl From<TransactionData> for TransactionUpsert {
    fn from(data: TransactionData) -> Self {
        TransactionUpsert {
            id: data.id,
            description: data.description,
            date: data.date,
            payments: data
                .payments
                .into_iter()
                .map(|p| PaymentInput {
                    person_id: p.person_id,
                    amount: p.amount,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonData {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonParams {
    #[serde(default)]
    pub account_identifier: String,
    #[serde(default)]
    pub data: PersonData,
}
