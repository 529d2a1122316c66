//! Balance Transfer Handler
//!
//! Type 0: moves `amount` base units from the sender to the recipient for a
//! fixed fee. The sender side of the movement is the generic debit performed
//! by the state mutator; this handler owns the recipient credit.

use async_trait::async_trait;
use std::sync::Arc;

use crate::account::{Account, AccountDelta, AccountStore};
use crate::chain::{constants, Block};
use crate::transaction::persistence::TransactionRow;
use crate::transaction::registry::{CreateRequest, TransactionHandler};
use crate::transaction::{Transaction, TransactionError};

/// Handler for plain balance transfers
pub struct TransferHandler {
    store: Arc<dyn AccountStore>,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    fn recipient_delta(trs: &Transaction, block: &Block, sign: i64) -> Result<AccountDelta, TransactionError> {
        let amount = i64::try_from(trs.amount).map_err(|_| TransactionError::InvalidAmount)?;
        Ok(AccountDelta {
            balance: sign * amount,
            u_balance: sign * amount,
            block_id: Some(block.id.clone()),
            round: None,
        })
    }

    fn recipient<'t>(trs: &'t Transaction) -> Result<&'t str, TransactionError> {
        trs.recipient_id
            .as_deref()
            .ok_or_else(|| TransactionError::Malformed("missing recipient".to_string()))
    }
}

#[async_trait]
impl TransactionHandler for TransferHandler {
    fn calculate_fee(&self, _trs: &Transaction, _sender: &Account) -> u64 {
        constants::FEE_TRANSFER
    }

    fn create(
        &self,
        request: &CreateRequest<'_>,
        trs: &mut Transaction,
    ) -> Result<(), TransactionError> {
        trs.recipient_id = request.recipient_id.clone();
        trs.amount = request.amount;
        Ok(())
    }

    fn get_bytes(&self, _trs: &Transaction) -> Result<Vec<u8>, TransactionError> {
        Ok(Vec::new())
    }

    async fn verify(
        &self,
        trs: &Transaction,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        Self::recipient(trs)?;
        if trs.amount == 0 {
            return Err(TransactionError::InvalidAmount);
        }
        Ok(())
    }

    async fn process(
        &self,
        _trs: &Transaction,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        Ok(())
    }

    fn object_normalize(&self, trs: &mut Transaction) -> Result<(), TransactionError> {
        // A block id on an inbound transfer is a stray field, not an inclusion
        trs.block_id = None;
        Ok(())
    }

    async fn apply(
        &self,
        trs: &Transaction,
        block: &Block,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        let delta = Self::recipient_delta(trs, block, 1)?;
        self.store.merge(Self::recipient(trs)?, delta).await?;
        Ok(())
    }

    async fn undo(
        &self,
        trs: &Transaction,
        block: &Block,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        let delta = Self::recipient_delta(trs, block, -1)?;
        self.store.merge(Self::recipient(trs)?, delta).await?;
        Ok(())
    }

    async fn apply_unconfirmed(
        &self,
        _trs: &Transaction,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        Ok(())
    }

    async fn undo_unconfirmed(
        &self,
        _trs: &Transaction,
        _sender: &Account,
    ) -> Result<(), TransactionError> {
        Ok(())
    }

    fn ready(&self, trs: &Transaction, sender: &Account) -> bool {
        if sender.multisignatures.is_empty() {
            return true;
        }
        match &trs.signatures {
            Some(signatures) => {
                signatures.len() as u32 >= sender.multimin.saturating_sub(1)
            }
            None => false,
        }
    }

    fn db_read(
        &self,
        _row: &TransactionRow,
    ) -> Result<Option<serde_json::Value>, TransactionError> {
        Ok(None)
    }
}
