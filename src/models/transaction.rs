//! Transaction models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One transaction as returned by `GET /transactions`.
///
/// Only the fields the OFX conversion reads are typed strictly. Everything else
/// the API sends (merchant, notes, settled, category, ...) lands in `extra`
/// untouched, so a change in those payloads never breaks decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    /// Signed amount in minor units (pence). Negative is money out.
    pub amount: i64,
    /// Account balance after this transaction, in minor units.
    #[serde(default)]
    pub account_balance: i64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub description: String,
    /// Empty (or absent) unless the authorization was declined.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub decline_reason: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub local_amount: i64,
    #[serde(default)]
    pub local_currency: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub counterparty: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionRecord {
    pub fn is_declined(&self) -> bool {
        !self.decline_reason.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `GET /transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionList {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}
