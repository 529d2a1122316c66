//! Transaction Type Handlers
//!
//! Concrete implementations of the handler capability set. Only the balance
//! transfer ships in-tree; other types (votes, delegate registration, second
//! signatures, multisignature groups) plug in through the same trait.

pub mod transfer;

pub use transfer::TransferHandler;

/// Type tag of a balance transfer
pub const TRANSFER: u8 = 0;
