//! # Block Stream Hashing
//!
//! SHA-384 primitives shared by both tree hashers and the session.
//!
//! ## Padded Merkle trees
//!
//! Trees are perfect binary trees padded on the right with empty subtrees:
//!
//! ```text
//! EMPTY_HASHES[0] = SHA384("")
//! EMPTY_HASHES[i] = combine(EMPTY_HASHES[i-1], EMPTY_HASHES[i-1])
//! combine(l, r)   = SHA384(l || r)
//! ```
//!
//! A tree of zero leaves has root `EMPTY_HASHES[0]`; a tree of one leaf has
//! the leaf itself as root.

use lazy_static::lazy_static;
use sha2::{Digest, Sha384};
use shared_types::{BlockProof, Hash, HASH_LENGTH};

/// Deepest tree level with a precomputed empty subtree.
pub const MAX_TREE_HEIGHT: usize = 64;

lazy_static! {
    /// Root of an all-empty subtree, per height.
    pub static ref EMPTY_HASHES: [Hash; MAX_TREE_HEIGHT] = {
        let mut hashes = [[0u8; HASH_LENGTH]; MAX_TREE_HEIGHT];
        hashes[0] = sha384(&[]);
        for i in 1..MAX_TREE_HEIGHT {
            hashes[i] = combine(&hashes[i - 1], &hashes[i - 1]);
        }
        hashes
    };
}

/// SHA-384 of `data`.
pub fn sha384(data: &[u8]) -> Hash {
    to_hash(Sha384::digest(data).as_slice())
}

/// Hash of two child nodes: `SHA384(left || right)`.
pub fn combine(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha384::new();
    hasher.update(left);
    hasher.update(right);
    to_hash(hasher.finalize().as_slice())
}

fn to_hash(digest: &[u8]) -> Hash {
    let mut hash = [0u8; HASH_LENGTH];
    hash.copy_from_slice(digest);
    hash
}

/// Root of the empty subtree of `height`.
pub fn empty_hash(height: usize) -> Hash {
    EMPTY_HASHES[height]
}

/// Height of the smallest perfect tree holding `leaf_count` leaves.
pub fn root_height(leaf_count: u64) -> usize {
    if leaf_count <= 1 {
        return 0;
    }
    (u64::BITS - (leaf_count - 1).leading_zeros()) as usize
}

/// Convert a leaf slice to a `Hash`, rejecting wrong lengths.
pub(crate) fn leaf_from_slice(leaf: &[u8]) -> Option<Hash> {
    leaf.try_into().ok()
}

/// Block hash folding the two tree roots with the proof's linkage hashes:
///
/// ```text
/// combine(
///     combine(previous_block_root_hash, input_root),
///     combine(output_root, start_of_block_state_root_hash),
/// )
/// ```
pub fn block_hash(input_root: &Hash, output_root: &Hash, proof: &BlockProof) -> Hash {
    let left = combine(&proof.previous_block_root_hash, input_root);
    let right = combine(output_root, &proof.start_of_block_state_root_hash);
    combine(&left, &right)
}
