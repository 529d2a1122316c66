//! Transaction Error Taxonomy
//!
//! Every failure in the transaction pipeline maps to exactly one of these
//! kinds. Verification returns the first failing check; state transitions
//! surface handler errors after the compensating rollback has run.

use crate::account::StoreError;
use thiserror::Error;

/// Errors produced by the transaction core
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("unknown transaction type {0}")]
    UnknownType(u8),
    #[error("missing sender")]
    MissingSender,
    #[error("invalid sender public key")]
    InvalidSenderPublicKey,
    #[error("invalid sender address")]
    InvalidSenderAddress,
    #[error("invalid requester public key")]
    InvalidRequesterPublicKey,
    #[error("failed to verify signature")]
    FailedSignature,
    #[error("failed to verify second signature")]
    FailedSecondSignature,
    #[error("encountered duplicate signature in transaction")]
    DuplicateSignature,
    #[error("failed to verify multisignature")]
    FailedMultisignature,
    #[error("invalid transaction fee")]
    InvalidFee,
    #[error("invalid transaction amount")]
    InvalidAmount,
    #[error("invalid transaction timestamp")]
    InvalidTimestamp,
    #[error("malformed transaction: {0}")]
    Malformed(String),
    #[error("account does not have enough funds: {0}")]
    InsufficientBalance(String),
    #[error("transaction is not ready")]
    NotReady,
    #[error("transaction is already confirmed: {0}")]
    AlreadyConfirmed(String),
    #[error("transaction type {0} already registered")]
    DuplicateType(u8),
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TransactionError {
    /// Stable label for metrics and structured logging
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::UnknownType(_) => "unknown_type",
            Self::MissingSender => "missing_sender",
            Self::InvalidSenderPublicKey => "invalid_sender_public_key",
            Self::InvalidSenderAddress => "invalid_sender_address",
            Self::InvalidRequesterPublicKey => "invalid_requester_public_key",
            Self::FailedSignature => "failed_signature",
            Self::FailedSecondSignature => "failed_second_signature",
            Self::DuplicateSignature => "duplicate_signature",
            Self::FailedMultisignature => "failed_multisignature",
            Self::InvalidFee => "invalid_fee",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::Malformed(_) => "malformed",
            Self::InsufficientBalance(_) => "insufficient_balance",
            Self::NotReady => "not_ready",
            Self::AlreadyConfirmed(_) => "already_confirmed",
            Self::DuplicateType(_) => "duplicate_type",
            Self::Handler(_) => "handler",
            Self::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            TransactionError::UnknownType(9).to_string(),
            "unknown transaction type 9"
        );
        assert_eq!(
            TransactionError::FailedSignature.to_string(),
            "failed to verify signature"
        );
        assert_eq!(
            TransactionError::AlreadyConfirmed("15".to_string()).to_string(),
            "transaction is already confirmed: 15"
        );
    }

    #[test]
    fn test_kind_labels_are_stable() {
        assert_eq!(TransactionError::InvalidFee.kind_label(), "invalid_fee");
        assert_eq!(
            TransactionError::Handler(anyhow::anyhow!("boom")).kind_label(),
            "handler"
        );
    }
}
