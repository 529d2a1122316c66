//! Transaction Engine
//!
//! Composes the codec, signature engine, normalizer, verifier, state
//! mutator, and persistence adapter behind a single constructor and exposes
//! the full transaction lifecycle:
//!
//! ```text
//! raw object -> normalize -> process -> verify -> apply_unconfirmed
//!            -> (block inclusion) apply -> save
//! ```
//!
//! The engine owns no mutable state; the registry, chain parameters, and
//! collaborator handles it holds are all frozen at construction.

use std::sync::Arc;

use crate::account::{Account, AccountStore};
use crate::chain::{Block, ChainParams};
use crate::crypto::Keypair;
use crate::metrics::CoreMetrics;
use crate::slots::SlotCalendar;
use crate::storage::{KeyValueLedger, TableRow};
use crate::transaction::codec::TransactionCodec;
use crate::transaction::error::TransactionError;
use crate::transaction::normalize::TransactionNormalizer;
use crate::transaction::persistence::{PersistenceAdapter, TransactionRow};
use crate::transaction::registry::{CreateRequest, TypeRegistry};
use crate::transaction::signing::SignatureEngine;
use crate::transaction::state::StateMutator;
use crate::transaction::verify::TransactionVerifier;
use crate::transaction::Transaction;

/// Facade over the transaction core
#[derive(Clone)]
pub struct TransactionEngine {
    registry: Arc<TypeRegistry>,
    slots: SlotCalendar,
    codec: TransactionCodec,
    signing: SignatureEngine,
    normalizer: TransactionNormalizer,
    verifier: TransactionVerifier,
    mutator: StateMutator,
    persistence: PersistenceAdapter,
    ledger: Arc<dyn KeyValueLedger>,
}

impl TransactionEngine {
    pub fn new(
        registry: Arc<TypeRegistry>,
        params: Arc<ChainParams>,
        store: Arc<dyn AccountStore>,
        ledger: Arc<dyn KeyValueLedger>,
        metrics: Arc<CoreMetrics>,
    ) -> Self {
        let slots = SlotCalendar::new(params.epoch);
        let codec = TransactionCodec::new(registry.clone());
        let signing = SignatureEngine::new(codec.clone());
        let normalizer = TransactionNormalizer::new(registry.clone(), params.clone());
        let verifier = TransactionVerifier::new(
            signing.clone(),
            registry.clone(),
            params.clone(),
            slots.clone(),
            metrics.clone(),
        );
        let mutator = StateMutator::new(registry.clone(), params, store, metrics);
        let persistence = PersistenceAdapter::new(registry.clone());

        Self {
            registry,
            slots,
            codec,
            signing,
            normalizer,
            verifier,
            mutator,
            persistence,
            ledger,
        }
    }

    /// Build, sign, and stamp a new transaction
    pub fn create(&self, request: &CreateRequest<'_>) -> Result<Transaction, TransactionError> {
        let handler = self.registry.lookup(request.tx_type)?;
        let sender_public_key = request.sender.public_key.clone().ok_or_else(|| {
            TransactionError::Malformed("sender has no public key".to_string())
        })?;

        let mut trs = Transaction {
            tx_type: request.tx_type,
            timestamp: self.slots.epoch_time(),
            sender_public_key,
            requester_public_key: request
                .requester
                .and_then(|account| account.public_key.clone()),
            asset: serde_json::Value::Object(Default::default()),
            ..Default::default()
        };
        handler.create(request, &mut trs)?;

        trs.signature = Some(self.signing.sign(request.keypair, &trs)?);
        if request.sender.second_signature {
            if let Some(second) = request.second_keypair {
                trs.sign_signature = Some(self.signing.sign(second, &trs)?);
            }
        }
        trs.id = Some(self.codec.get_id(&trs)?);
        trs.fee = handler.calculate_fee(&trs, request.sender);
        Ok(trs)
    }

    /// Admit a transaction: recompute its id, stamp the sender address,
    /// reject replays of confirmed transactions, and run the handler's
    /// admission hook.
    pub async fn process(
        &self,
        trs: &mut Transaction,
        sender: Option<&Account>,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;

        let id = self.codec.get_id(trs)?;
        if let Some(claimed) = &trs.id {
            if claimed != &id {
                return Err(TransactionError::Malformed(
                    "transaction id mismatch".to_string(),
                ));
            }
        }
        trs.id = Some(id.clone());

        let sender = sender.ok_or(TransactionError::MissingSender)?;
        trs.sender_id = Some(sender.address.clone());

        handler.process(trs, sender).await?;

        let count = self.ledger.count_by_id(&id).await.inspect_err(|err| {
            tracing::error!(id = %id, error = %err, "confirmed-count lookup failed");
        })?;
        if count > 0 {
            return Err(TransactionError::AlreadyConfirmed(id));
        }
        Ok(())
    }

    /// Canonical byte encoding
    pub fn to_bytes(
        &self,
        trs: &Transaction,
        skip_signature: bool,
        skip_second_signature: bool,
    ) -> Result<Vec<u8>, TransactionError> {
        self.codec.to_bytes(trs, skip_signature, skip_second_signature)
    }

    /// SHA-256 of the canonical encoding
    pub fn get_hash(&self, trs: &Transaction) -> Result<[u8; 32], TransactionError> {
        self.codec.get_hash(trs)
    }

    /// Derived decimal identifier
    pub fn get_id(&self, trs: &Transaction) -> Result<String, TransactionError> {
        self.codec.get_id(trs)
    }

    /// Sign the transaction in its current form
    pub fn sign(&self, keypair: &Keypair, trs: &Transaction) -> Result<String, TransactionError> {
        self.signing.sign(keypair, trs)
    }

    /// Produce a multisignature approval
    pub fn multisign(
        &self,
        keypair: &Keypair,
        trs: &Transaction,
    ) -> Result<String, TransactionError> {
        self.signing.multisign(keypair, trs)
    }

    /// Validate an inbound raw object into a typed transaction
    pub fn normalize(&self, raw: serde_json::Value) -> Result<Transaction, TransactionError> {
        self.normalizer.normalize(raw)
    }

    /// Run the full verification pipeline
    pub async fn verify(
        &self,
        trs: &Transaction,
        sender: Option<&Account>,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        self.verifier.verify(trs, sender, requester).await
    }

    /// Apply confirmed effects
    pub async fn apply(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        self.mutator.apply(trs, block, sender).await
    }

    /// Undo confirmed effects
    pub async fn undo(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        self.mutator.undo(trs, block, sender).await
    }

    /// Apply unconfirmed effects
    pub async fn apply_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        self.mutator.apply_unconfirmed(trs, sender, requester).await
    }

    /// Undo unconfirmed effects
    pub async fn undo_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        self.mutator.undo_unconfirmed(trs, sender).await
    }

    /// Row operations persisting the transaction
    pub fn db_save(&self, trs: &Transaction) -> Result<Vec<TableRow>, TransactionError> {
        self.persistence.db_save(trs)
    }

    /// Materialize a transaction from a ledger row
    pub fn db_read(&self, row: &TransactionRow) -> Result<Option<Transaction>, TransactionError> {
        self.persistence.db_read(row)
    }

    /// Persist the transaction and run the handler's after-save hook
    pub async fn save(&self, trs: &Transaction) -> Result<(), TransactionError> {
        self.persistence.save(trs, self.ledger.as_ref()).await
    }
}
