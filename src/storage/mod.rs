//! Ledger Storage Contract
//!
//! The core never talks to a database directly; it emits row operations and
//! consumes a `KeyValueLedger` that can count stored transactions by id and
//! persist a batch of rows. A lock-backed in-memory implementation is
//! provided for tests and standalone deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::account::StoreError;

/// A single column value destined for the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    BigInt(u64),
    Int(i64),
}

/// One row insert, with columns listed in table order
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub table: &'static str,
    pub fields: &'static [&'static str],
    pub values: Vec<SqlValue>,
}

/// Persistence boundary consumed by the transaction core
#[async_trait]
pub trait KeyValueLedger: Send + Sync {
    /// Number of stored transactions carrying the given id
    async fn count_by_id(&self, id: &str) -> Result<u64, StoreError>;

    /// Persist a batch of row operations atomically
    async fn save_rows(&self, rows: &[TableRow]) -> Result<(), StoreError>;
}

/// In-memory ledger keeping saved rows grouped by table
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Arc<RwLock<HashMap<&'static str, Vec<TableRow>>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows saved into the given table, in insertion order
    pub async fn rows(&self, table: &str) -> Vec<TableRow> {
        let rows = self.rows.read().await;
        rows.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl KeyValueLedger for MemoryLedger {
    async fn count_by_id(&self, id: &str) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        let count = rows
            .get("trs")
            .map(|entries| {
                entries
                    .iter()
                    .filter(|row| {
                        row.fields.first() == Some(&"id")
                            && row.values.first() == Some(&SqlValue::Text(id.to_string()))
                    })
                    .count() as u64
            })
            .unwrap_or(0);
        Ok(count)
    }

    async fn save_rows(&self, batch: &[TableRow]) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        for row in batch {
            rows.entry(row.table).or_default().push(row.clone());
        }
        Ok(())
    }
}
