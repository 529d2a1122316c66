//! Inbound Transaction Normalization
//!
//! Raw transactions arrive as JSON objects. Normalization strips null
//! fields, enforces the shape constraints on every remaining field, builds
//! the typed record, and hands the asset payload to the type handler for
//! its own validation. Any violation is a malformed-transaction failure.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::chain::ChainParams;
use crate::transaction::error::TransactionError;
use crate::transaction::registry::TypeRegistry;
use crate::transaction::Transaction;

/// Fields that must survive null-stripping for a transaction to be accepted
const REQUIRED_FIELDS: [&str; 4] = ["type", "timestamp", "senderPublicKey", "signature"];

/// Validates the shape of inbound transactions
#[derive(Debug, Clone)]
pub struct TransactionNormalizer {
    registry: Arc<TypeRegistry>,
    params: Arc<ChainParams>,
}

impl TransactionNormalizer {
    pub fn new(registry: Arc<TypeRegistry>, params: Arc<ChainParams>) -> Self {
        Self { registry, params }
    }

    /// Validate a raw object and produce the typed transaction
    pub fn normalize(&self, raw: Value) -> Result<Transaction, TransactionError> {
        let Value::Object(mut fields) = raw else {
            return Err(malformed("transaction is not an object"));
        };
        fields.retain(|_, value| !value.is_null());

        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                return Err(malformed(&format!("missing required field {field}")));
            }
        }
        self.check_shape(&fields)?;

        let mut trs: Transaction = serde_json::from_value(Value::Object(fields))
            .map_err(|err| malformed(&err.to_string()))?;

        let handler = self.registry.lookup(trs.tx_type)?;
        handler.object_normalize(&mut trs)?;
        Ok(trs)
    }

    fn check_shape(&self, fields: &Map<String, Value>) -> Result<(), TransactionError> {
        for (name, value) in fields {
            match name.as_str() {
                "id" | "blockId" | "senderId" | "recipientId" => {
                    if !value.is_string() {
                        return Err(malformed(&format!("{name} must be a string")));
                    }
                }
                "height" | "confirmations" => {
                    if value.as_u64().is_none() {
                        return Err(malformed(&format!("{name} must be a non-negative integer")));
                    }
                }
                "type" => {
                    let tag = value.as_u64();
                    if tag.is_none() || tag > Some(u8::MAX as u64) {
                        return Err(malformed("type must be an integer in [0, 255]"));
                    }
                }
                "timestamp" => {
                    let ts = value.as_i64();
                    if !matches!(ts, Some(v) if (0..=i32::MAX as i64).contains(&v)) {
                        return Err(malformed("timestamp must be a non-negative integer"));
                    }
                }
                "senderPublicKey" | "requesterPublicKey" => {
                    if !value.as_str().is_some_and(|key| is_lower_hex(key, 64)) {
                        return Err(malformed(&format!("{name} must be a 64-character hex key")));
                    }
                }
                "amount" | "fee" => {
                    let units = value.as_u64();
                    if units.is_none() || units > Some(self.params.total_supply) {
                        return Err(malformed(&format!(
                            "{name} must be an integer in [0, {}]",
                            self.params.total_supply
                        )));
                    }
                }
                "signature" | "signSignature" => {
                    if !value.as_str().is_some_and(|sig| is_lower_hex(sig, 128)) {
                        return Err(malformed(&format!(
                            "{name} must be a 128-character hex signature"
                        )));
                    }
                }
                "signatures" => {
                    let entries = value.as_array();
                    let all_valid = entries.is_some_and(|list| {
                        list.iter()
                            .all(|entry| entry.as_str().is_some_and(|sig| is_lower_hex(sig, 128)))
                    });
                    if !all_valid {
                        return Err(malformed(
                            "signatures must be an array of 128-character hex signatures",
                        ));
                    }
                }
                "asset" => {
                    if !value.is_object() {
                        return Err(malformed("asset must be an object"));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn malformed(detail: &str) -> TransactionError {
    TransactionError::Malformed(detail.to_string())
}

fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
