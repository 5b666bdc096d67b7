//! # Verification Errors
//!
//! Signature mismatch is not an error: it is the terminal status
//! `InvalidHashOrSignature`. These types cover verification that could not
//! run at all.

use shared_types::{EncodingError, HASH_LENGTH};
use thiserror::Error;

/// Errors raised by a streaming tree hasher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HasherError {
    /// Leaves are fixed-length digests.
    #[error("Invalid leaf length: expected {expected} bytes, got {actual}")]
    InvalidLeafLength { expected: usize, actual: usize },

    /// The tree is sealed once its root was requested.
    #[error("Cannot add leaves after the root hash was requested")]
    RootAlreadyRequested,

    /// A combine task on the hashing pool panicked or was dropped.
    #[error("Combine task failed at level {level}")]
    CombineTaskFailed { level: usize },
}

impl HasherError {
    pub(crate) fn invalid_leaf(actual: usize) -> Self {
        Self::InvalidLeafLength {
            expected: HASH_LENGTH,
            actual,
        }
    }
}

/// Errors raised by a signature verifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The configured ledger public key is not a valid point.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The verifier backend could not be reached or failed internally.
    #[error("Signature backend failure: {0}")]
    Backend(String),
}

/// Errors that fail a verification session (or the feed driving it).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Tree hashing failed: {0}")]
    Hasher(#[from] HasherError),

    #[error("Signature check failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("Item encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// The verification feed received a batch with no items.
    #[error("Received an empty block item batch")]
    EmptyBatch,

    /// A session was dropped before its block proof arrived.
    #[error("Session for block {block_number} was abandoned before its proof arrived")]
    SessionAbandoned { block_number: u64 },

    /// The dedicated worker of an async session could not be started.
    #[error("Failed to start verification worker for block {block_number}: {reason}")]
    WorkerUnavailable { block_number: u64, reason: String },

    /// The shared service status stopped accepting work.
    #[error("Verification is not accepting new sessions")]
    NotAccepting,

    /// The verification feed panicked while processing a batch.
    #[error("Verification feed panicked: {0}")]
    FeedPanicked(String),
}

impl VerificationError {
    /// Protocol violations are unrecoverable for the whole stream; every
    /// other error only fails its own session.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::EmptyBatch)
    }
}
