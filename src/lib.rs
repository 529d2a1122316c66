//! # DPoS Chain Core
//!
//! The consensus-critical transaction core of a delegated-proof-of-stake
//! blockchain node: building, canonicalizing, signing, verifying, and
//! applying transactions against account state.
//!
//! ## Key Components
//!
//! - **Transaction**: canonical codec, id derivation, signature engine,
//!   type-handler registry, verification pipeline, and balance mutation
//!   with compensating rollback
//! - **Account**: the additive-merge store contract consumed by state
//!   transitions
//! - **Crypto**: passphrase-derived Ed25519 keypairs and address derivation
//! - **Handlers**: the balance transfer type; further types plug in through
//!   the same trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dpos_chain_core::account::MemoryAccountStore;
//! use dpos_chain_core::chain::ChainParams;
//! use dpos_chain_core::handlers::{TransferHandler, TRANSFER};
//! use dpos_chain_core::metrics::CoreMetrics;
//! use dpos_chain_core::storage::MemoryLedger;
//! use dpos_chain_core::transaction::{TransactionEngine, TypeRegistry};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryAccountStore::new());
//! let mut registry = TypeRegistry::new();
//! registry.register(TRANSFER, Arc::new(TransferHandler::new(store.clone())))?;
//!
//! let engine = TransactionEngine::new(
//!     Arc::new(registry),
//!     Arc::new(ChainParams::default()),
//!     store,
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(CoreMetrics::new(&prometheus::Registry::new())?),
//! );
//! ```
//!
//! Every byte of the canonical encoding and every balance mutation must be
//! reproducible bit-for-bit across nodes; the codec and verifier are the
//! authoritative definition of that behavior.

pub mod account;
pub mod chain;
pub mod crypto;
pub mod handlers;
pub mod metrics;
pub mod slots;
pub mod storage;
pub mod transaction;

// Re-export commonly used types
pub use account::{Account, AccountDelta, AccountStore, MemoryAccountStore, StoreError};
pub use chain::{Block, ChainParams};
pub use crypto::{address_from_public_key, Keypair};
pub use metrics::CoreMetrics;
pub use slots::SlotCalendar;
pub use storage::{KeyValueLedger, MemoryLedger, SqlValue, TableRow};
pub use transaction::{
    CreateRequest, PersistenceAdapter, SignatureEngine, StateMutator, Transaction,
    TransactionCodec, TransactionEngine, TransactionError, TransactionHandler,
    TransactionNormalizer, TransactionRow, TransactionVerifier, TypeRegistry,
};
