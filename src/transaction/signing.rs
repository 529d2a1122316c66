//! Transaction Signatures
//!
//! All signatures are Ed25519 over the SHA-256 of a canonical byte form:
//!
//! - primary signature: over the encoding with both signatures omitted
//! - second signature: over the encoding with only the second omitted, so it
//!   covers the primary signature
//! - multisignature approvals: over the fully unsigned encoding
//!
//! `sign` hashes the transaction as it currently stands, so signing an
//! unsigned record produces the primary signature and signing once the
//! primary is attached produces the second one.
//!
//! Verifying a missing or empty signature yields false, never an error.

use sha2::{Digest, Sha256};

use crate::crypto::{self, Keypair};
use crate::transaction::codec::TransactionCodec;
use crate::transaction::error::TransactionError;
use crate::transaction::Transaction;

/// Produces and verifies transaction signatures
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    codec: TransactionCodec,
}

impl SignatureEngine {
    pub fn new(codec: TransactionCodec) -> Self {
        Self { codec }
    }

    /// Sign the transaction in its current form
    pub fn sign(&self, keypair: &Keypair, trs: &Transaction) -> Result<String, TransactionError> {
        let hash = self.codec.get_hash(trs)?;
        Ok(hex::encode(keypair.sign(&hash)))
    }

    /// Produce a multisignature approval over the unsigned form
    pub fn multisign(
        &self,
        keypair: &Keypair,
        trs: &Transaction,
    ) -> Result<String, TransactionError> {
        let bytes = self.codec.to_bytes(trs, true, true)?;
        let hash: [u8; 32] = Sha256::digest(&bytes).into();
        Ok(hex::encode(keypair.sign(&hash)))
    }

    /// Verify a primary or multisignature approval
    pub fn verify_signature(
        &self,
        trs: &Transaction,
        public_key: &str,
        signature: Option<&str>,
    ) -> Result<bool, TransactionError> {
        let bytes = self.codec.to_bytes(trs, true, true)?;
        Ok(verify_over(&bytes, public_key, signature))
    }

    /// Verify the second signature, which covers the primary one
    pub fn verify_second_signature(
        &self,
        trs: &Transaction,
        public_key: &str,
        signature: Option<&str>,
    ) -> Result<bool, TransactionError> {
        let bytes = self.codec.to_bytes(trs, false, true)?;
        Ok(verify_over(&bytes, public_key, signature))
    }
}

fn verify_over(bytes: &[u8], public_key: &str, signature: Option<&str>) -> bool {
    let Some(signature) = signature.filter(|sig| !sig.is_empty()) else {
        return false;
    };
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let Ok(public_key) = hex::decode(public_key) else {
        return false;
    };

    let hash = Sha256::digest(bytes);
    crypto::verify_detached(&hash, &signature, &public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::registry::test_support::StaticHandler;
    use crate::transaction::registry::TypeRegistry;
    use std::sync::Arc;

    fn engine() -> SignatureEngine {
        let mut registry = TypeRegistry::new();
        registry.register(0, Arc::new(StaticHandler::new(10_000_000))).unwrap();
        SignatureEngine::new(TransactionCodec::new(Arc::new(registry)))
    }

    fn unsigned_transfer(keypair: &Keypair) -> Transaction {
        Transaction {
            tx_type: 0,
            timestamp: 141738,
            sender_public_key: keypair.public_key_hex(),
            recipient_id: Some("58191285901858109D".to_string()),
            amount: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_then_verify_primary() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let mut trs = unsigned_transfer(&keypair);

        trs.signature = Some(engine.sign(&keypair, &trs).unwrap());

        let valid = engine
            .verify_signature(&trs, &keypair.public_key_hex(), trs.signature.as_deref())
            .unwrap();
        assert!(valid);
    }

    #[test]
    fn test_second_signature_covers_primary() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let second = Keypair::from_passphrase("second signer");
        let mut trs = unsigned_transfer(&keypair);

        trs.signature = Some(engine.sign(&keypair, &trs).unwrap());
        trs.sign_signature = Some(engine.sign(&second, &trs).unwrap());

        let valid = engine
            .verify_second_signature(&trs, &second.public_key_hex(), trs.sign_signature.as_deref())
            .unwrap();
        assert!(valid);

        // Re-signing a tampered primary signature must not verify
        let mut tampered = trs.clone();
        tampered.signature = Some("00".repeat(64));
        let valid = engine
            .verify_second_signature(
                &tampered,
                &second.public_key_hex(),
                tampered.sign_signature.as_deref(),
            )
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_multisign_matches_unsigned_preimage() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let cosigner = Keypair::from_passphrase("cosigner");
        let mut trs = unsigned_transfer(&keypair);

        trs.signature = Some(engine.sign(&keypair, &trs).unwrap());
        let approval = engine.multisign(&cosigner, &trs).unwrap();

        // Approvals verify over the unsigned form regardless of the primary
        let valid = engine
            .verify_signature(&trs, &cosigner.public_key_hex(), Some(approval.as_str()))
            .unwrap();
        assert!(valid);
    }

    #[test]
    fn test_missing_signature_is_false_not_error() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let trs = unsigned_transfer(&keypair);

        assert!(!engine.verify_signature(&trs, &keypair.public_key_hex(), None).unwrap());
        assert!(!engine.verify_signature(&trs, &keypair.public_key_hex(), Some("")).unwrap());
        assert!(!engine
            .verify_signature(&trs, &keypair.public_key_hex(), Some("not hex"))
            .unwrap());
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let mut trs = unsigned_transfer(&keypair);
        trs.signature = Some(engine.sign(&keypair, &trs).unwrap());

        trs.amount = 2000;
        let valid = engine
            .verify_signature(&trs, &keypair.public_key_hex(), trs.signature.as_deref())
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let engine = engine();
        let keypair = Keypair::from_passphrase("primary signer");
        let other = Keypair::from_passphrase("someone else");
        let mut trs = unsigned_transfer(&keypair);
        trs.signature = Some(engine.sign(&keypair, &trs).unwrap());

        let valid = engine
            .verify_signature(&trs, &other.public_key_hex(), trs.signature.as_deref())
            .unwrap();
        assert!(!valid);
    }
}
