//! # Test Utilities
//!
//! Block fixtures and a scripted signature verifier, shared with the
//! workspace integration tests.

use crate::adapters::item_hasher::Sha384ItemHasher;
use crate::domain::entities::LeafTree;
use crate::domain::errors::SignatureError;
use crate::domain::hashing::{block_hash, sha384};
use crate::domain::merkle::tree_levels;
use crate::ports::outbound::{ItemHasher, SignatureVerifier};
use bn_01_live_stream::BatchEvent;
use shared_types::{BlockHeader, BlockItem, BlockItemBatch, BlockProof, Hash, HASH_LENGTH};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Signature verifier returning a fixed verdict.
#[derive(Debug)]
pub struct StubSignatureVerifier {
    verdict: Result<bool, SignatureError>,
    panics: bool,
    calls: AtomicUsize,
}

impl StubSignatureVerifier {
    pub fn accepting() -> Self {
        Self::with_verdict(Ok(true))
    }

    pub fn rejecting() -> Self {
        Self::with_verdict(Ok(false))
    }

    /// Every check fails as if the backend were down.
    pub fn failing() -> Self {
        Self::with_verdict(Err(SignatureError::Backend("stub failure".to_string())))
    }

    /// Every check panics.
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::accepting()
        }
    }

    fn with_verdict(verdict: Result<bool, SignatureError>) -> Self {
        Self {
            verdict,
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignatureVerifier for StubSignatureVerifier {
    fn verify(&self, _block_hash: &Hash, _signature: &[u8]) -> Result<bool, SignatureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("stub signature verifier panicked");
        }
        self.verdict.clone()
    }
}

/// The batches of block `number` with a zeroed previous block hash.
pub fn block_batches(number: u64, batch_count: usize, items_per_batch: usize) -> Vec<BatchEvent> {
    block_batches_with_parent(number, [0u8; HASH_LENGTH], batch_count, items_per_batch)
}

/// The batches of one block: the first opens with the header, the last ends
/// with the proof, and the bodies alternate between input and output items.
pub fn block_batches_with_parent(
    number: u64,
    previous_block_hash: Hash,
    batch_count: usize,
    items_per_batch: usize,
) -> Vec<BatchEvent> {
    let batch_count = batch_count.max(1);
    let mut batches = Vec::with_capacity(batch_count);
    let mut counter = 0u64;

    for index in 0..batch_count {
        let mut items = Vec::with_capacity(items_per_batch + 2);
        if index == 0 {
            items.push(BlockItem::BlockHeader(
                BlockHeader::new(number).with_previous_block_hash(previous_block_hash),
            ));
        }
        for _ in 0..items_per_batch {
            items.push(body_item(number, counter));
            counter += 1;
        }
        if index + 1 == batch_count {
            items.push(BlockItem::BlockProof(block_proof(number)));
        }
        batches.push(Arc::new(BlockItemBatch::new(items)));
    }
    batches
}

fn body_item(number: u64, counter: u64) -> BlockItem {
    let mut body = number.to_be_bytes().to_vec();
    body.extend_from_slice(&counter.to_be_bytes());
    match counter % 4 {
        0 => BlockItem::EventHeader(body),
        1 => BlockItem::EventTransaction(body),
        2 => BlockItem::TransactionResult(body),
        _ => BlockItem::StateChanges(body),
    }
}

/// The proof closing fixture block `number`.
pub fn block_proof(number: u64) -> BlockProof {
    BlockProof {
        block: number,
        previous_block_root_hash: sha384(format!("root-{}", number.saturating_sub(1)).as_bytes()),
        start_of_block_state_root_hash: sha384(format!("state-{number}").as_bytes()),
        block_signature: vec![number as u8; 64],
    }
}

/// Block hash of a complete block, computed level by level.
pub fn block_hash_of(batches: &[BatchEvent]) -> Hash {
    let hasher = Sha384ItemHasher;
    let mut input = Vec::new();
    let mut output = Vec::new();
    let mut proof = None;

    for item in batches.iter().flat_map(|batch| batch.items()) {
        match LeafTree::for_kind(item.kind()) {
            Some(LeafTree::Input) => input.push(leaf(&hasher, item)),
            Some(LeafTree::Output) => output.push(leaf(&hasher, item)),
            None => {
                if let Some(block_proof) = item.block_proof() {
                    proof = Some(block_proof.clone());
                }
            }
        }
    }

    let root = |leaves: &[Hash]| {
        tree_levels(leaves)
            .last()
            .map(|level| level[0])
            .unwrap_or([0u8; HASH_LENGTH])
    };
    let proof = proof.unwrap_or_else(|| block_proof(0));
    block_hash(&root(&input), &root(&output), &proof)
}

fn leaf(hasher: &Sha384ItemHasher, item: &BlockItem) -> Hash {
    hasher
        .leaf_hash(item)
        .unwrap_or_else(|e| panic!("fixture item must encode: {e}"))
}
