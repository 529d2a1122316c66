//! Transaction Type Registry
//!
//! Each transaction type is served by a handler implementing the full
//! capability set below. The registry maps the numeric type tag to its
//! handler; it is populated once at startup and frozen behind an `Arc`
//! thereafter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::account::Account;
use crate::chain::Block;
use crate::crypto::Keypair;
use crate::storage::TableRow;
use crate::transaction::error::TransactionError;
use crate::transaction::persistence::TransactionRow;
use crate::transaction::Transaction;

/// Parameters for building a new transaction
pub struct CreateRequest<'a> {
    /// Numeric transaction type
    pub tx_type: u8,
    /// Sender account; its public key is stamped onto the transaction
    pub sender: &'a Account,
    /// Keypair producing the primary signature
    pub keypair: &'a Keypair,
    /// Second-factor keypair, when the sender has one registered
    pub second_keypair: Option<&'a Keypair>,
    /// Requesting co-signer account, when submitting on the sender's behalf
    pub requester: Option<&'a Account>,
    /// Recipient address for transfer-like types
    pub recipient_id: Option<String>,
    /// Amount in base units for transfer-like types
    pub amount: u64,
    /// Handler-specific construction data
    pub payload: serde_json::Value,
}

/// Capability set every transaction type handler must implement
///
/// Handlers are plug-ins: the core calls them through this trait and treats
/// their errors opaquely. `get_bytes` must be deterministic regardless of any
/// map-insertion order inside the asset payload, since its output is part of
/// the consensus pre-image.
#[async_trait]
pub trait TransactionHandler: Send + Sync {
    /// Fee in base units for this transaction; not chosen by the client
    fn calculate_fee(&self, trs: &Transaction, sender: &Account) -> u64;

    /// Populate amount, recipient, and asset on a freshly built transaction
    fn create(
        &self,
        request: &CreateRequest<'_>,
        trs: &mut Transaction,
    ) -> Result<(), TransactionError>;

    /// Asset bytes contributing to the canonical encoding; may be empty
    fn get_bytes(&self, trs: &Transaction) -> Result<Vec<u8>, TransactionError>;

    /// Type-specific verification, run after all generic checks
    async fn verify(&self, trs: &Transaction, sender: &Account)
        -> Result<(), TransactionError>;

    /// Type-specific admission hook, run during `process`
    async fn process(&self, trs: &Transaction, sender: &Account)
        -> Result<(), TransactionError>;

    /// Validate and canonicalize the asset payload
    fn object_normalize(&self, trs: &mut Transaction) -> Result<(), TransactionError>;

    /// Confirmed state effects beyond the sender balance debit
    async fn apply(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError>;

    /// Reverse the confirmed state effects
    async fn undo(
        &self,
        trs: &Transaction,
        block: &Block,
        sender: &Account,
    ) -> Result<(), TransactionError>;

    /// Unconfirmed state effects beyond the sender unconfirmed-balance debit
    async fn apply_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), TransactionError>;

    /// Reverse the unconfirmed state effects
    async fn undo_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), TransactionError>;

    /// Whether the transaction has gathered enough signatures to be applied
    fn ready(&self, trs: &Transaction, sender: &Account) -> bool;

    /// Additional rows to persist alongside the main transaction row
    fn db_save(&self, _trs: &Transaction) -> Result<Vec<TableRow>, TransactionError> {
        Ok(Vec::new())
    }

    /// Hook invoked after the row batch has been persisted
    async fn after_save(&self, _trs: &Transaction) -> Result<(), TransactionError> {
        Ok(())
    }

    /// Materialize the asset payload from a ledger row
    fn db_read(&self, row: &TransactionRow)
        -> Result<Option<serde_json::Value>, TransactionError>;
}

/// Mapping from numeric type tag to handler
#[derive(Default)]
pub struct TypeRegistry {
    handlers: HashMap<u8, Arc<dyn TransactionHandler>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a type tag; a tag can only be claimed once
    pub fn register(
        &mut self,
        tx_type: u8,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<(), TransactionError> {
        if self.handlers.contains_key(&tx_type) {
            return Err(TransactionError::DuplicateType(tx_type));
        }
        self.handlers.insert(tx_type, handler);
        Ok(())
    }

    /// Handler for the given type tag
    pub fn lookup(
        &self,
        tx_type: u8,
    ) -> Result<&Arc<dyn TransactionHandler>, TransactionError> {
        self.handlers
            .get(&tx_type)
            .ok_or(TransactionError::UnknownType(tx_type))
    }

    pub fn contains(&self, tx_type: u8) -> bool {
        self.handlers.contains_key(&tx_type)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<u8> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &types).finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Handler stub with fixed asset bytes and switchable failure points
    #[derive(Default)]
    pub struct StaticHandler {
        pub fee: u64,
        pub asset_bytes: Vec<u8>,
        pub fail_verify: bool,
        pub fail_apply: bool,
        pub fail_undo: bool,
        pub fail_apply_unconfirmed: bool,
        pub fail_undo_unconfirmed: bool,
        pub not_ready: bool,
    }

    impl StaticHandler {
        pub fn new(fee: u64) -> Self {
            Self { fee, ..Self::default() }
        }
    }

    fn forced_failure(hook: &str) -> TransactionError {
        TransactionError::Handler(anyhow::anyhow!("forced {hook} failure"))
    }

    #[async_trait]
    impl TransactionHandler for StaticHandler {
        fn calculate_fee(&self, _trs: &Transaction, _sender: &Account) -> u64 {
            self.fee
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
            Ok(self.asset_bytes.clone())
        }

        async fn verify(
            &self,
            _trs: &Transaction,
            _sender: &Account,
        ) -> Result<(), TransactionError> {
            if self.fail_verify {
                return Err(forced_failure("verify"));
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

        fn object_normalize(&self, _trs: &mut Transaction) -> Result<(), TransactionError> {
            Ok(())
        }

        async fn apply(
            &self,
            _trs: &Transaction,
            _block: &Block,
            _sender: &Account,
        ) -> Result<(), TransactionError> {
            if self.fail_apply {
                return Err(forced_failure("apply"));
            }
            Ok(())
        }

        async fn undo(
            &self,
            _trs: &Transaction,
            _block: &Block,
            _sender: &Account,
        ) -> Result<(), TransactionError> {
            if self.fail_undo {
                return Err(forced_failure("undo"));
            }
            Ok(())
        }

        async fn apply_unconfirmed(
            &self,
            _trs: &Transaction,
            _sender: &Account,
        ) -> Result<(), TransactionError> {
            if self.fail_apply_unconfirmed {
                return Err(forced_failure("apply_unconfirmed"));
            }
            Ok(())
        }

        async fn undo_unconfirmed(
            &self,
            _trs: &Transaction,
            _sender: &Account,
        ) -> Result<(), TransactionError> {
            if self.fail_undo_unconfirmed {
                return Err(forced_failure("undo_unconfirmed"));
            }
            Ok(())
        }

        fn ready(&self, _trs: &Transaction, _sender: &Account) -> bool {
            !self.not_ready
        }

        fn db_read(
            &self,
            _row: &TransactionRow,
        ) -> Result<Option<serde_json::Value>, TransactionError> {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StaticHandler;
    use super::*;

    #[test]
    fn test_lookup_unknown_type() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.lookup(7),
            Err(TransactionError::UnknownType(7))
        ));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry.register(0, Arc::new(StaticHandler::new(10))).unwrap();

        assert!(registry.contains(0));
        assert!(registry.lookup(0).is_ok());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register(0, Arc::new(StaticHandler::new(10))).unwrap();

        assert!(matches!(
            registry.register(0, Arc::new(StaticHandler::new(20))),
            Err(TransactionError::DuplicateType(0))
        ));
    }
}
