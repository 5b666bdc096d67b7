//! # Streaming Tree Hashers
//!
//! Incremental Merkle accumulators over fixed-length leaf digests.
//!
//! - `sequential`: carry stack on the caller's thread
//! - `parallel`: level batches combined on a shared rayon pool
//!
//! Both reduce the same leaf sequence to the same root.

mod parallel;
mod sequential;

pub use parallel::{ParallelTreeHasher, MIN_TO_SCHEDULE};
pub use sequential::SequentialTreeHasher;

use crate::domain::errors::HasherError;
use shared_types::Hash;

/// Append-only Merkle accumulator.
///
/// Leaves are appended in call order. Requesting the root seals the tree:
/// later `add_leaf` calls fail with [`HasherError::RootAlreadyRequested`],
/// later `root_hash` calls return the same root.
pub trait StreamingTreeHasher: Send {
    /// Append one `HASH_LENGTH`-byte leaf.
    fn add_leaf(&mut self, leaf: &[u8]) -> Result<(), HasherError>;

    /// Root of the padded tree over every leaf added so far.
    fn root_hash(&mut self) -> Result<Hash, HasherError>;

    /// Number of leaves added.
    fn leaf_count(&self) -> u64;
}
