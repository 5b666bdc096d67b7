//! # Outbound Ports

use crate::domain::errors::{SignatureError, VerificationError};
use shared_types::{BlockItem, Hash};

/// Checks a block signature against the computed block hash.
///
/// A mismatch is `Ok(false)`; `Err` means the check could not run.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, block_hash: &Hash, signature: &[u8]) -> Result<bool, SignatureError>;
}

/// Produces the Merkle leaf hash of a block item.
pub trait ItemHasher: Send + Sync {
    fn leaf_hash(&self, item: &BlockItem) -> Result<Hash, VerificationError>;
}
