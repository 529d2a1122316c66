//! Transaction Persistence
//!
//! Translates between the transaction record and ledger rows. Saving emits
//! an insert into the `trs` table followed by any rows the type handler
//! contributes; key and signature columns hold raw bytes and the
//! multisignature list is stored comma-joined. Reading materializes a
//! transaction from a row image whose numeric columns arrive as text.

use std::sync::Arc;

use crate::storage::{KeyValueLedger, SqlValue, TableRow};
use crate::transaction::error::TransactionError;
use crate::transaction::registry::TypeRegistry;
use crate::transaction::Transaction;

/// Column list of the `trs` table, in insert order
const TRS_FIELDS: &[&str] = &[
    "id",
    "blockId",
    "type",
    "timestamp",
    "senderPublicKey",
    "requesterPublicKey",
    "senderId",
    "recipientId",
    "amount",
    "fee",
    "signature",
    "signSignature",
    "signatures",
];

/// Row image of a stored transaction, joined against its block
///
/// Every column arrives as text; numeric fields are parsed during
/// materialization. Key and signature columns carry hex.
#[derive(Debug, Clone, Default)]
pub struct TransactionRow {
    pub t_id: Option<String>,
    pub b_id: Option<String>,
    pub b_height: Option<String>,
    pub t_type: Option<String>,
    pub t_timestamp: Option<String>,
    pub t_sender_public_key: Option<String>,
    pub t_requester_public_key: Option<String>,
    pub t_sender_id: Option<String>,
    pub t_recipient_id: Option<String>,
    pub t_amount: Option<String>,
    pub t_fee: Option<String>,
    pub t_signature: Option<String>,
    pub t_sign_signature: Option<String>,
    pub t_signatures: Option<String>,
    pub confirmations: Option<String>,
}

/// Produces ledger rows for transactions and reads them back
#[derive(Debug, Clone)]
pub struct PersistenceAdapter {
    registry: Arc<TypeRegistry>,
}

impl PersistenceAdapter {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Row operations persisting the transaction
    pub fn db_save(&self, trs: &Transaction) -> Result<Vec<TableRow>, TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;

        let id = trs
            .id
            .clone()
            .ok_or_else(|| TransactionError::Malformed("transaction has no id".to_string()))?;
        let signature = hex_column(trs.signature.as_deref(), "signature")?
            .ok_or_else(|| TransactionError::Malformed("transaction has no signature".to_string()))?;

        let mut rows = vec![TableRow {
            table: "trs",
            fields: TRS_FIELDS,
            values: vec![
                SqlValue::Text(id),
                text_column(trs.block_id.as_deref()),
                SqlValue::Int(trs.tx_type as i64),
                SqlValue::Int(trs.timestamp as i64),
                SqlValue::Bytes(
                    hex_column(Some(&trs.sender_public_key), "senderPublicKey")?
                        .unwrap_or_default(),
                ),
                hex_column(trs.requester_public_key.as_deref(), "requesterPublicKey")?
                    .map_or(SqlValue::Null, SqlValue::Bytes),
                text_column(trs.sender_id.as_deref()),
                text_column(trs.recipient_id.as_deref()),
                SqlValue::BigInt(trs.amount),
                SqlValue::BigInt(trs.fee),
                SqlValue::Bytes(signature),
                hex_column(trs.sign_signature.as_deref(), "signSignature")?
                    .map_or(SqlValue::Null, SqlValue::Bytes),
                trs.signatures
                    .as_ref()
                    .map_or(SqlValue::Null, |sigs| SqlValue::Text(sigs.join(","))),
            ],
        }];
        rows.extend(handler.db_save(trs)?);
        Ok(rows)
    }

    /// Materialize a transaction from a row image, or None without an id
    pub fn db_read(&self, row: &TransactionRow) -> Result<Option<Transaction>, TransactionError> {
        let Some(id) = row.t_id.clone() else {
            return Ok(None);
        };

        let tx_type: u8 = parse_column(&row.t_type, "type")?;
        let handler = self.registry.lookup(tx_type)?;

        let trs = Transaction {
            tx_type,
            timestamp: parse_column(&row.t_timestamp, "timestamp")?,
            sender_public_key: row.t_sender_public_key.clone().unwrap_or_default(),
            requester_public_key: row.t_requester_public_key.clone(),
            sender_id: row.t_sender_id.clone(),
            recipient_id: row.t_recipient_id.clone(),
            amount: parse_column(&row.t_amount, "amount")?,
            fee: parse_column(&row.t_fee, "fee")?,
            signature: row.t_signature.clone(),
            sign_signature: row.t_sign_signature.clone(),
            signatures: row.t_signatures.as_deref().map(|joined| {
                joined.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect()
            }),
            asset: handler.db_read(row)?.unwrap_or(serde_json::Value::Null),
            id: Some(id),
            block_id: row.b_id.clone(),
            height: parse_optional(&row.b_height, "height")?,
            confirmations: parse_optional(&row.confirmations, "confirmations")?,
        };
        Ok(Some(trs))
    }

    /// Persist the transaction and run the handler's after-save hook
    pub async fn save(
        &self,
        trs: &Transaction,
        ledger: &dyn KeyValueLedger,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        let rows = self.db_save(trs)?;
        ledger.save_rows(&rows).await?;
        handler.after_save(trs).await
    }
}

fn text_column(value: Option<&str>) -> SqlValue {
    value.map_or(SqlValue::Null, |text| SqlValue::Text(text.to_string()))
}

fn hex_column(value: Option<&str>, field: &str) -> Result<Option<Vec<u8>>, TransactionError> {
    value
        .map(|text| {
            hex::decode(text)
                .map_err(|_| TransactionError::Malformed(format!("invalid hex in {field}")))
        })
        .transpose()
}

fn parse_column<T: std::str::FromStr>(
    value: &Option<String>,
    field: &str,
) -> Result<T, TransactionError> {
    value
        .as_deref()
        .ok_or_else(|| TransactionError::Malformed(format!("missing column {field}")))?
        .parse()
        .map_err(|_| TransactionError::Malformed(format!("unparsable column {field}")))
}

fn parse_optional<T: std::str::FromStr>(
    value: &Option<String>,
    field: &str,
) -> Result<Option<T>, TransactionError> {
    value
        .as_deref()
        .map(|text| {
            text.parse()
                .map_err(|_| TransactionError::Malformed(format!("unparsable column {field}")))
        })
        .transpose()
}
