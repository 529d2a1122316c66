//! Chain Parameters and Block References
//!
//! This module provides the immutable chain-level configuration consumed by
//! the transaction core:
//! - ChainParams: supply cap, genesis id, round geometry, address suffix
//! - Block: the slim block reference attached to confirmed transactions
//!
//! A `ChainParams` value is constructed once at startup and shared behind an
//! `Arc`; nothing in the core mutates it afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Protocol constants for the mainnet configuration
pub mod constants {
    /// Total token supply in base units (100,000,000 tokens at 10^8 precision)
    pub const TOTAL_SUPPLY: u64 = 10_000_000_000_000_000;

    /// Number of forging delegates per round
    pub const DELEGATES_PER_ROUND: u64 = 101;

    /// Duration of a forging slot in seconds
    pub const SLOT_INTERVAL: i64 = 10;

    /// Fixed fee for a balance transfer, in base units (0.1 token)
    pub const FEE_TRANSFER: u64 = 10_000_000;

    /// Suffix character terminating every account address
    pub const ADDRESS_SUFFIX: char = 'D';

    /// Chain epoch: 2016-05-24T17:00:00Z
    pub const EPOCH_SECONDS: i64 = 1_464_109_200;
}

/// Immutable chain configuration shared by every core component
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Total token supply in base units; upper bound for amounts and fees
    pub total_supply: u64,
    /// Identifier of the genesis block
    pub genesis_block_id: String,
    /// Number of delegates forging in one round
    pub delegates_per_round: u64,
    /// Suffix character terminating account addresses
    pub address_suffix: char,
    /// Chain epoch all transaction timestamps are relative to
    pub epoch: DateTime<Utc>,
    /// Transaction ids grandfathered from the sender public key check
    pub sender_public_key_exceptions: Vec<String>,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            total_supply: constants::TOTAL_SUPPLY,
            genesis_block_id: String::new(),
            delegates_per_round: constants::DELEGATES_PER_ROUND,
            address_suffix: constants::ADDRESS_SUFFIX,
            epoch: DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(constants::EPOCH_SECONDS),
            sender_public_key_exceptions: Vec::new(),
        }
    }
}

impl ChainParams {
    /// Round number for a block height: ceil(height / delegates_per_round)
    pub fn round_from_height(&self, height: u64) -> u64 {
        height.div_ceil(self.delegates_per_round)
    }

    /// Whether the given block id refers to the genesis block
    pub fn is_genesis_block(&self, block_id: &str) -> bool {
        block_id == self.genesis_block_id
    }
}

/// Slim block reference consumed by confirmed state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block identifier
    pub id: String,
    /// Height of the block within the chain
    pub height: u64,
}

impl Block {
    pub fn new(id: impl Into<String>, height: u64) -> Self {
        Self { id: id.into(), height }
    }
}
