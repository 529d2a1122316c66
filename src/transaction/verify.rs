//! Transaction Verification Pipeline
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. type is registered
//! 2. sender account is present
//! 3. sender public key matches the account (grandfathered ids excepted)
//! 4. sender address matches, case-insensitively
//! 5. requester, if any, belongs to the sender's multisignature group
//! 6. primary signature verifies against the submitting key
//! 7. second signature verifies when one is registered
//! 8. multisignature approvals contain no duplicates
//! 9. every approval verifies against some non-requester group key
//! 10. fee equals the handler's computed fee
//! 11. amount does not exceed the total supply
//! 12. timestamp does not resolve to a future slot
//! 13. handler-specific verification

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::account::Account;
use crate::chain::ChainParams;
use crate::metrics::CoreMetrics;
use crate::slots::SlotCalendar;
use crate::transaction::error::TransactionError;
use crate::transaction::registry::TypeRegistry;
use crate::transaction::signing::SignatureEngine;
use crate::transaction::Transaction;

/// Runs the ordered verification pipeline
#[derive(Clone)]
pub struct TransactionVerifier {
    signing: SignatureEngine,
    registry: Arc<TypeRegistry>,
    params: Arc<ChainParams>,
    slots: SlotCalendar,
    metrics: Arc<CoreMetrics>,
}

impl TransactionVerifier {
    pub fn new(
        signing: SignatureEngine,
        registry: Arc<TypeRegistry>,
        params: Arc<ChainParams>,
        slots: SlotCalendar,
        metrics: Arc<CoreMetrics>,
    ) -> Self {
        Self { signing, registry, params, slots, metrics }
    }

    /// Verify a transaction against its sender (and requester, if present)
    pub async fn verify(
        &self,
        trs: &Transaction,
        sender: Option<&Account>,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        self.metrics.increment_verifications();
        let started = Instant::now();

        let result = self.run_checks(trs, sender, requester).await;
        self.metrics.observe_verification(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            self.metrics.increment_verification_failure(err.kind_label());
            tracing::debug!(id = ?trs.id, error = %err, "transaction verification failed");
        }
        result
    }

    async fn run_checks(
        &self,
        trs: &Transaction,
        sender: Option<&Account>,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        let handler = self.registry.lookup(trs.tx_type)?;
        let sender = sender.ok_or(TransactionError::MissingSender)?;

        if sender.public_key.as_deref() != Some(trs.sender_public_key.as_str()) {
            let grandfathered = trs.id.as_deref().is_some_and(|id| {
                self.params.sender_public_key_exceptions.iter().any(|excepted| excepted == id)
            });
            if grandfathered {
                tracing::debug!(id = ?trs.id, "admitting legacy sender public key mismatch");
            } else {
                return Err(TransactionError::InvalidSenderPublicKey);
            }
        }

        let sender_id = trs.sender_id.as_deref().unwrap_or_default();
        if !sender_id.eq_ignore_ascii_case(&sender.address) {
            return Err(TransactionError::InvalidSenderAddress);
        }

        if let Some(requester_key) = trs.requester_public_key.as_deref() {
            if !sender.multisignatures.iter().any(|key| key == requester_key) {
                return Err(TransactionError::InvalidRequesterPublicKey);
            }
        }

        let submitting_key =
            trs.requester_public_key.as_deref().unwrap_or(&trs.sender_public_key);
        if !self.signing.verify_signature(trs, submitting_key, trs.signature.as_deref())? {
            return Err(TransactionError::FailedSignature);
        }

        self.check_second_signature(trs, sender, requester)?;

        if let Some(signatures) = &trs.signatures {
            let mut seen = HashSet::new();
            for signature in signatures {
                if !seen.insert(signature.as_str()) {
                    return Err(TransactionError::DuplicateSignature);
                }
            }
        }
        self.check_multisignatures(trs, sender)?;

        if trs.fee != handler.calculate_fee(trs, sender) {
            return Err(TransactionError::InvalidFee);
        }
        if trs.amount > self.params.total_supply {
            return Err(TransactionError::InvalidAmount);
        }
        if self.slots.slot_number(trs.timestamp) > self.slots.current_slot() {
            return Err(TransactionError::InvalidTimestamp);
        }

        handler.verify(trs, sender).await
    }

    fn check_second_signature(
        &self,
        trs: &Transaction,
        sender: &Account,
        requester: Option<&Account>,
    ) -> Result<(), TransactionError> {
        let second_signer = match trs.requester_public_key {
            None if sender.second_signature => Some(sender),
            None => None,
            Some(_) => requester.filter(|account| account.second_signature),
        };
        let Some(account) = second_signer else {
            return Ok(());
        };

        let key = account.second_public_key.as_deref().unwrap_or_default();
        if !self.signing.verify_second_signature(trs, key, trs.sign_signature.as_deref())? {
            return Err(TransactionError::FailedSecondSignature);
        }
        Ok(())
    }

    /// Every approval must verify against some group key other than the
    /// requester's. The group is the confirmed multisignature set, falling
    /// back to the pending set, falling back to the keysgroup of a
    /// multisignature registration being applied (action prefix stripped).
    fn check_multisignatures(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), TransactionError> {
        let Some(signatures) = &trs.signatures else {
            return Ok(());
        };

        let mut keys: Vec<String> = if !sender.multisignatures.is_empty() {
            sender.multisignatures.clone()
        } else {
            sender.u_multisignatures.clone()
        };
        if keys.is_empty() {
            if let Some(group) = trs
                .asset
                .get("multisignature")
                .and_then(|m| m.get("keysgroup"))
                .and_then(|k| k.as_array())
            {
                keys = group
                    .iter()
                    .filter_map(|entry| entry.as_str())
                    .map(|entry| entry.get(1..).unwrap_or_default().to_string())
                    .collect();
            }
        }
        if trs.requester_public_key.is_some() {
            keys.push(trs.sender_public_key.clone());
        }

        for signature in signatures {
            let mut verified = false;
            for key in &keys {
                if trs.requester_public_key.as_deref() == Some(key.as_str()) {
                    continue;
                }
                if self.signing.verify_signature(trs, key, Some(signature.as_str()))? {
                    verified = true;
                    break;
                }
            }
            if !verified {
                return Err(TransactionError::FailedMultisignature);
            }
        }
        Ok(())
    }
}
