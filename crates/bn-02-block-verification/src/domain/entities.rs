//! # Verification Entities

use crate::domain::merkle::BlockMerkleTreeInfo;
use shared_types::{hash_hex, BlockItemKind, Hash};
use std::fmt;

/// Terminal status of a session that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockVerificationStatus {
    Verified,
    /// The block hash was computed but the signature does not match it.
    InvalidHashOrSignature,
}

impl fmt::Display for BlockVerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("VERIFIED"),
            Self::InvalidHashOrSignature => f.write_str("INVALID_HASH_OR_SIGNATURE"),
        }
    }
}

/// Outcome of verifying one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub block_number: u64,
    pub block_hash: Hash,
    pub status: BlockVerificationStatus,
    /// Present only when Merkle diagnostics are enabled.
    pub merkle_tree_info: Option<BlockMerkleTreeInfo>,
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        self.status == BlockVerificationStatus::Verified
    }

    pub fn block_hash_hex(&self) -> String {
        hash_hex(&self.block_hash)
    }
}

/// Which tree a block item's leaf hash belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafTree {
    Input,
    Output,
}

impl LeafTree {
    /// Route an item kind to its tree. Block headers and block proofs are
    /// not leaves.
    pub fn for_kind(kind: BlockItemKind) -> Option<Self> {
        match kind {
            BlockItemKind::EventHeader | BlockItemKind::EventTransaction => Some(Self::Input),
            BlockItemKind::TransactionResult
            | BlockItemKind::TransactionOutput
            | BlockItemKind::StateChanges => Some(Self::Output),
            BlockItemKind::BlockHeader | BlockItemKind::BlockProof => None,
        }
    }
}
