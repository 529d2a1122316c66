//! Transaction Core
//!
//! The consensus-critical transaction subsystem:
//! - Transaction: the immutable-after-signing record
//! - codec: canonical byte encoding and id derivation
//! - signing: Ed25519 signatures over the canonical hash
//! - registry: transaction-type handlers and their capability set
//! - normalize: shape validation of inbound transactions
//! - verify: the ordered verification pipeline
//! - state: confirmed/unconfirmed balance mutation with rollback
//! - persistence: ledger row production and row materialization
//! - engine: facade wiring the components together
//!
//! Every byte of the canonical encoding, every signature check, and every
//! balance mutation must be reproducible bit-for-bit across nodes; a
//! deviation forks the chain.

pub mod codec;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod persistence;
pub mod registry;
pub mod signing;
pub mod state;
pub mod verify;

pub use codec::TransactionCodec;
pub use engine::TransactionEngine;
pub use error::TransactionError;
pub use normalize::TransactionNormalizer;
pub use persistence::{PersistenceAdapter, TransactionRow};
pub use registry::{CreateRequest, TransactionHandler, TypeRegistry};
pub use signing::SignatureEngine;
pub use state::StateMutator;
pub use verify::TransactionVerifier;

use serde::{Deserialize, Serialize};

/// A transaction record
///
/// Byte fields (keys and signatures) are carried hex-encoded, exactly as they
/// arrive on the wire; the codec decodes them when assembling the canonical
/// byte form. The record is never mutated after signing except by field
/// attachment (`id`, `sender_id`, `block_id`, `height`, `confirmations`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    /// Numeric type tag selecting the handler
    #[serde(rename = "type")]
    pub tx_type: u8,
    /// Seconds since the chain epoch
    pub timestamp: i32,
    /// Hex-encoded sender public key
    pub sender_public_key: String,
    /// Hex-encoded requester public key, present when a multisignature
    /// co-signer submits on the sender's behalf
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_public_key: Option<String>,
    /// Derived sender address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Recipient address, absent for self-contained transaction types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Transferred amount in base units
    pub amount: u64,
    /// Fee in base units, computed by the type handler
    pub fee: u64,
    /// Type-specific payload
    pub asset: serde_json::Value,
    /// Hex-encoded primary signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Hex-encoded second-factor signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_signature: Option<String>,
    /// Additional hex-encoded multisignature approvals, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<String>>,
    /// Derived identifier; recomputed, never trusted from input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identifier of the containing block, attached on inclusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Height of the containing block, attached on inclusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    /// Confirmation count, attached on read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

impl Transaction {
    /// Amount plus fee, rejecting 64-bit overflow
    pub fn total_with_fee(&self) -> Result<u64, TransactionError> {
        self.amount
            .checked_add(self.fee)
            .ok_or(TransactionError::InvalidAmount)
    }
}
