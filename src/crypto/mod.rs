//! Cryptographic Primitives
//!
//! Ed25519 key handling for the transaction core:
//! - Keypair: signing key derived from a passphrase or generated at random
//! - Address derivation from a public key
//! - Detached signature verification over message hashes
//!
//! ## Key Derivation
//!
//! A keypair is derived deterministically from a passphrase: the SHA-256
//! digest of the passphrase bytes is used as the Ed25519 seed. The seed copy
//! is scrubbed from memory once the signing key has been constructed.
//!
//! ## Address Derivation
//!
//! ```text
//! address = decimal(u64_le(SHA-256(public_key)[0..8])) + suffix
//! ```
//!
//! The first eight digest bytes are read as a little-endian unsigned integer
//! and rendered in base 10, followed by the chain's suffix character.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// Errors that can occur during key and signature handling
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature")]
    InvalidSignature,
}

/// Ed25519 keypair used for signing transactions
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Derive a keypair from a passphrase
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut seed: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        let signing = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing }
    }

    /// Generate a random keypair
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self { signing: SigningKey::generate(&mut csprng) }
    }

    /// Raw public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Hex-encoded public key
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Sign a message, returning the raw 64-byte signature
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Derive an account address from a hex-encoded public key
pub fn address_from_public_key(public_key: &str, suffix: char) -> Result<String, CryptoError> {
    let bytes = hex::decode(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidPublicKey);
    }

    let digest = Sha256::digest(&bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Ok(format!("{}{}", u64::from_le_bytes(head), suffix))
}

/// Verify a detached Ed25519 signature over a message
///
/// Returns false for malformed keys or signatures rather than erroring; the
/// verification pipeline treats every undecodable input as a failed check.
pub fn verify_detached(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(pk_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&pk_bytes) else {
        return false;
    };

    verifying.verify(message, &Signature::from_bytes(&sig_bytes)).is_ok()
}
