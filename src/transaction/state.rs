//! Balance and Asset State Transitions
//!
//! Four operations, each a two-phase merge: debit (or credit) the sender's
//! balance through the account store, then run the handler's own state
//! effects. If the handler fails, the balance delta is reversed before the
//! error is surfaced, so callers never observe a net change from a failed
//! transition. A failed reversal takes precedence over the handler error:
//! balance integrity is paramount.
//!
//! Confirmed operations record the block id and the round
//! (`ceil(height / delegates_per_round)`) on the account; unconfirmed
//! operations touch only the unconfirmed balance.

use std::sync::Arc;

use crate::account::{Account, AccountDelta, AccountStore};
use crate::chain::{Block, ChainParams};
use crate::metrics::CoreMetrics;
use crate::transaction::error::TransactionError;
use crate::transaction::registry::TypeRegistry;
use crate::transaction::Transaction;

/// Applies and undoes transaction state effects
#[derive(Clone)]
pub struct StateMutator {
    registry: Arc<TypeRegistry>,
    params: Arc<ChainParams>,
    store: Arc<dyn AccountStore>,
    metrics: Arc<CoreMetrics>,
}

impl StateMutator {
    pub fn new(
        registry: Arc<TypeRegistry>,
        params: Arc<ChainParams>,
        store: Arc<dyn AccountStore>,
        metrics: Arc<CoreMetrics>,
    ) -> Self {
        Self { registry, params, store, metrics }
    }

    /// Apply confirmed effects for a transaction included in `block`
    pub async fn apply(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        if !handler.ready(trs, sender) {
            return Err(TransactionError::NotReady);
        }

        let total = signed_total(trs)?;
        if sender.balance < total && !self.params.is_genesis_block(&block.id) {
            return Err(TransactionError::InsufficientBalance(format!(
                "{} balance: {}",
                sender.address, sender.balance
            )));
        }

        let delta = AccountDelta {
            balance: -total,
            block_id: Some(block.id.clone()),
            round: Some(self.params.round_from_height(block.height)),
            ..Default::default()
        };
        let updated = self.store.merge(&sender.address, delta.clone()).await?;

        if let Err(handler_err) = handler.apply(trs, block, &updated).await {
            return self.roll_back(trs, &sender.address, delta, handler_err).await;
        }
        self.metrics.increment_applied();
        Ok(())
    }

    /// Undo confirmed effects when `block` is rolled back
    pub async fn undo(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        let total = signed_total(trs)?;

        let delta = AccountDelta {
            balance: total,
            block_id: Some(block.id.clone()),
            round: Some(self.params.round_from_height(block.height)),
            ..Default::default()
        };
        let updated = self.store.merge(&sender.address, delta.clone()).await?;

        if let Err(handler_err) = handler.undo(trs, block, &updated).await {
            return self.roll_back(trs, &sender.address, delta, handler_err).await;
        }
        self.metrics.increment_undone();
        Ok(())
    }

    /// Apply unconfirmed effects when a transaction enters the pool
    pub async fn apply_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        self.check_second_signature_presence(trs, sender, requester)?;

        let total = signed_total(trs)?;
        if sender.u_balance < total && !self.is_genesis_transaction(trs) {
            return Err(TransactionError::InsufficientBalance(format!(
                "{} unconfirmed balance: {}",
                sender.address, sender.u_balance
            )));
        }

        let delta = AccountDelta { u_balance: -total, ..Default::default() };
        let updated = self.store.merge(&sender.address, delta.clone()).await?;

        if let Err(handler_err) = handler.apply_unconfirmed(trs, &updated).await {
            return self.roll_back(trs, &sender.address, delta, handler_err).await;
        }
        Ok(())
    }

    /// Undo unconfirmed effects when a transaction leaves the pool
    pub async fn undo_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        let total = signed_total(trs)?;

        let delta = AccountDelta { u_balance: total, ..Default::default() };
        let updated = self.store.merge(&sender.address, delta.clone()).await?;

        if let Err(handler_err) = handler.undo_unconfirmed(trs, &updated).await {
            return self.roll_back(trs, &sender.address, delta, handler_err).await;
        }
        Ok(())
    }

    /// Reverse a balance delta after a handler failure
    ///
    /// Returns the handler error on success; a failed reversal is surfaced
    /// instead of the handler error.
    async fn roll_back(
        &self,
        trs: &Transaction,
        address: &str,
        delta: AccountDelta,
        handler_err: TransactionError,
    ) -> Result<(), TransactionError> {
        self.metrics.increment_balance_rollbacks();
        tracing::error!(
            id = ?trs.id,
            error = %handler_err,
            "handler state transition failed, reversing balance delta"
        );

        match self.store.merge(address, delta.reversed()).await {
            Ok(_) => Err(handler_err),
            Err(revert_err) => {
                tracing::error!(
                    id = ?trs.id,
                    error = %revert_err,
                    "balance reversal failed"
                );
                Err(TransactionError::Store(revert_err))
            }
        }
    }

    fn check_second_signature_presence(
        &self,
        trs: &Transaction,
        sender: &Account,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        if trs.requester_public_key.is_none() {
            let missing = sender.second_signature
                && trs.sign_signature.is_none()
                && !self.is_genesis_transaction(trs);
            let unexpected = !sender.second_signature && trs.sign_signature.is_some();
            if missing || unexpected {
                return Err(TransactionError::FailedSecondSignature);
            }
        } else if let Some(requester) = requester {
            let missing = requester.second_signature && trs.sign_signature.is_none();
            let unexpected = !requester.second_signature && trs.sign_signature.is_some();
            if missing || unexpected {
                return Err(TransactionError::FailedSecondSignature);
            }
        }
        Ok(())
    }

    fn is_genesis_transaction(&self, trs: &Transaction) -> bool {
        trs.block_id
            .as_deref()
            .is_some_and(|id| self.params.is_genesis_block(id))
    }
}

fn signed_total(trs: &Transaction) -> Result<i64, TransactionError> {
    let total = trs.total_with_fee()?;
    i64::try_from(total).map_err(|_| TransactionError::InvalidAmount)
}
