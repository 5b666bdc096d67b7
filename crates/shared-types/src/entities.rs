//! # Block Stream Entities
//!
//! The block stream is an ordered sequence of block items. A block starts with
//! a `BlockHeader` item and ends with a `BlockProof` item; everything between
//! is either an input item (events) or an output item (results, outputs and
//! state changes).
//!
//! Items arrive from the producer in batches. The core never owns or mutates a
//! batch after publication, so batches travel as `Arc<BlockItemBatch>`.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::errors::EncodingError;

/// Length in bytes of every hash in the block stream (SHA-384).
pub const HASH_LENGTH: usize = 48;

/// A 48-byte SHA-384 digest.
pub type Hash = [u8; HASH_LENGTH];

/// Hex rendering for log fields.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// The header item that opens every block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash of the previous block, as claimed by the producer.
    #[serde_as(as = "Bytes")]
    pub previous_block_hash: Hash,
    /// Consensus timestamp in seconds.
    pub timestamp_secs: u64,
    /// Version of the software that produced the block.
    pub software_version: String,
}

impl BlockHeader {
    /// Header for `number` with a zeroed previous hash.
    pub fn new(number: u64) -> Self {
        Self {
            number,
            previous_block_hash: [0u8; HASH_LENGTH],
            timestamp_secs: 0,
            software_version: String::new(),
        }
    }

    /// Set the claimed previous block hash.
    pub fn with_previous_block_hash(mut self, hash: Hash) -> Self {
        self.previous_block_hash = hash;
        self
    }
}

/// The terminal item of a block.
///
/// Carries the signature over the block hash and the two linkage hashes that
/// are folded into the block hash together with the input and output roots.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProof {
    /// Block number this proof closes.
    pub block: u64,
    /// Root hash of the previous block.
    #[serde_as(as = "Bytes")]
    pub previous_block_root_hash: Hash,
    /// State root hash at the start of this block.
    #[serde_as(as = "Bytes")]
    pub start_of_block_state_root_hash: Hash,
    /// Signature over the block hash.
    pub block_signature: Vec<u8>,
}

/// Kind tag of a block item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockItemKind {
    BlockHeader,
    EventHeader,
    EventTransaction,
    TransactionResult,
    TransactionOutput,
    StateChanges,
    BlockProof,
}

impl fmt::Display for BlockItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BlockHeader => "block_header",
            Self::EventHeader => "event_header",
            Self::EventTransaction => "event_transaction",
            Self::TransactionResult => "transaction_result",
            Self::TransactionOutput => "transaction_output",
            Self::StateChanges => "state_changes",
            Self::BlockProof => "block_proof",
        };
        f.write_str(name)
    }
}

/// One record of the block stream.
///
/// Opaque item bodies are kept as raw bytes: the core only hashes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockItem {
    BlockHeader(BlockHeader),
    EventHeader(Vec<u8>),
    EventTransaction(Vec<u8>),
    TransactionResult(Vec<u8>),
    TransactionOutput(Vec<u8>),
    StateChanges(Vec<u8>),
    BlockProof(BlockProof),
}

impl BlockItem {
    /// The kind tag of this item.
    pub fn kind(&self) -> BlockItemKind {
        match self {
            Self::BlockHeader(_) => BlockItemKind::BlockHeader,
            Self::EventHeader(_) => BlockItemKind::EventHeader,
            Self::EventTransaction(_) => BlockItemKind::EventTransaction,
            Self::TransactionResult(_) => BlockItemKind::TransactionResult,
            Self::TransactionOutput(_) => BlockItemKind::TransactionOutput,
            Self::StateChanges(_) => BlockItemKind::StateChanges,
            Self::BlockProof(_) => BlockItemKind::BlockProof,
        }
    }

    pub fn block_header(&self) -> Option<&BlockHeader> {
        match self {
            Self::BlockHeader(header) => Some(header),
            _ => None,
        }
    }

    pub fn block_proof(&self) -> Option<&BlockProof> {
        match self {
            Self::BlockProof(proof) => Some(proof),
            _ => None,
        }
    }

    /// Canonical byte encoding of the item; leaf hashes are taken over this.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        bincode::serialize(self).map_err(|e| EncodingError::Encode(e.to_string()))
    }

    /// Decode an item previously produced by [`BlockItem::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        bincode::deserialize(bytes).map_err(|e| EncodingError::Decode(e.to_string()))
    }
}

/// An ordered batch of block items as published by the producer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockItemBatch {
    items: Vec<BlockItem>,
}

impl BlockItemBatch {
    pub fn new(items: Vec<BlockItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[BlockItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&BlockItem> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&BlockItem> {
        self.items.last()
    }

    /// The header if this batch opens a block.
    pub fn block_header(&self) -> Option<&BlockHeader> {
        self.first().and_then(BlockItem::block_header)
    }

    /// The proof if this batch closes a block.
    pub fn block_proof(&self) -> Option<&BlockProof> {
        self.last().and_then(BlockItem::block_proof)
    }

    pub fn into_items(self) -> Vec<BlockItem> {
        self.items
    }
}

impl From<Vec<BlockItem>> for BlockItemBatch {
    fn from(items: Vec<BlockItem>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<BlockItem> for BlockItemBatch {
    fn from_iter<I: IntoIterator<Item = BlockItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
