//! Account State
//!
//! The transaction core does not own account storage; it consumes an
//! `AccountStore` that applies additive deltas atomically. This module
//! provides:
//! - Account: the state snapshot handed to verification and state transitions
//! - AccountDelta: an additive update over balances and bookkeeping fields
//! - AccountStore: the async merge contract
//! - MemoryAccountStore: an in-memory store for tests and standalone use
//!
//! Balances are signed: the genesis sender legitimately goes negative when
//! the initial supply is distributed, so the floor is enforced by the state
//! mutator's balance checks rather than by the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors surfaced by an account store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("balance overflow for account {0}")]
    BalanceOverflow(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Snapshot of an account's state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Derived address, a decimal string with a single suffix character
    pub address: String,
    /// Hex-encoded Ed25519 public key, once revealed by an outgoing transaction
    pub public_key: Option<String>,
    /// Confirmed balance in base units
    pub balance: i64,
    /// Unconfirmed balance reflecting pool-admitted transactions
    pub u_balance: i64,
    /// Whether a second signing key is registered
    pub second_signature: bool,
    /// Hex-encoded second public key, when registered
    pub second_public_key: Option<String>,
    /// Confirmed multisignature co-signer public keys
    pub multisignatures: Vec<String>,
    /// Pending multisignature co-signer public keys
    pub u_multisignatures: Vec<String>,
    /// Minimum number of co-signatures required to forge a multisig transaction
    pub multimin: u32,
    /// Identifier of the block that last touched this account
    pub block_id: Option<String>,
    /// Round in which this account was last touched
    pub round: Option<u64>,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), ..Self::default() }
    }
}

/// Additive update applied to an account in one atomic step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountDelta {
    /// Signed change to the confirmed balance
    pub balance: i64,
    /// Signed change to the unconfirmed balance
    pub u_balance: i64,
    /// Block id to record on the account, if any
    pub block_id: Option<String>,
    /// Round to record on the account, if any
    pub round: Option<u64>,
}

impl AccountDelta {
    /// The additive inverse of this delta, used for compensating rollback
    pub fn reversed(&self) -> Self {
        Self {
            balance: self.balance.saturating_neg(),
            u_balance: self.u_balance.saturating_neg(),
            block_id: self.block_id.clone(),
            round: self.round,
        }
    }
}

/// Atomic additive account updates
///
/// Implementations must serialize merges on the same address: the balance
/// read and write of one merge may not interleave with another merge on that
/// account.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Apply `delta` to the account at `address`, creating it if absent, and
    /// return the updated snapshot.
    async fn merge(&self, address: &str, delta: AccountDelta) -> Result<Account, StoreError>;
}

/// In-memory account store
///
/// Backed by a single async lock, which also provides the per-account
/// serialization point required of a store.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, replacing any existing snapshot at its address
    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.address.clone(), account);
    }

    /// Fetch a snapshot of the account at `address`
    pub async fn get(&self, address: &str) -> Option<Account> {
        let accounts = self.accounts.read().await;
        accounts.get(address).cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn merge(&self, address: &str, delta: AccountDelta) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .entry(address.to_string())
            .or_insert_with(|| Account::new(address));

        account.balance = account
            .balance
            .checked_add(delta.balance)
            .ok_or_else(|| StoreError::BalanceOverflow(address.to_string()))?;
        account.u_balance = account
            .u_balance
            .checked_add(delta.u_balance)
            .ok_or_else(|| StoreError::BalanceOverflow(address.to_string()))?;

        if delta.block_id.is_some() {
            account.block_id = delta.block_id;
        }
        if delta.round.is_some() {
            account.round = delta.round;
        }

        Ok(account.clone())
    }
}
