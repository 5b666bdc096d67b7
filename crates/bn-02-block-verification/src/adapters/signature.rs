//! # Signature Verifiers

use crate::domain::errors::SignatureError;
use crate::ports::outbound::SignatureVerifier;
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};
use shared_types::Hash;
use tracing::trace;

/// Accepts every signature. For networks without block signing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummySignatureVerifier;

impl SignatureVerifier for DummySignatureVerifier {
    fn verify(&self, _block_hash: &Hash, _signature: &[u8]) -> Result<bool, SignatureError> {
        Ok(true)
    }
}

/// Verifies Ed25519 signatures over the block hash with the ledger key.
#[derive(Debug, Clone)]
pub struct Ed25519SignatureVerifier {
    ledger_key: VerifyingKey,
}

impl Ed25519SignatureVerifier {
    pub fn new(ledger_key: VerifyingKey) -> Self {
        Self { ledger_key }
    }

    /// Build from the raw 32-byte ledger public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            SignatureError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Build from the hex-encoded ledger public key.
    pub fn from_hex(encoded: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(&self, block_hash: &Hash, signature: &[u8]) -> Result<bool, SignatureError> {
        // A malformed signature cannot match: that is a verdict, not a failure.
        let Ok(signature) = Signature::from_slice(signature) else {
            trace!(length = signature.len(), "Malformed block signature");
            return Ok(false);
        };
        Ok(self.ledger_key.verify(block_hash, &signature).is_ok())
    }
}
