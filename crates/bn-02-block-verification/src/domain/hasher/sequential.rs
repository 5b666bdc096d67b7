//! # Sequential Tree Hasher
//!
//! Binary-counter accumulator: `carries[level]` holds the root of a complete
//! subtree of `2^level` leaves still waiting for its right sibling. Adding a
//! leaf ripples carries upward like an increment.

use super::StreamingTreeHasher;
use crate::domain::errors::HasherError;
use crate::domain::hashing::{combine, empty_hash, leaf_from_slice, root_height};
use shared_types::Hash;

#[derive(Debug, Clone, Default)]
pub struct SequentialTreeHasher {
    carries: Vec<Option<Hash>>,
    leaf_count: u64,
    root: Option<Hash>,
}

impl SequentialTreeHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the carries into the padded root.
    ///
    /// Walking up from the leaves, the partial subtree built so far is always
    /// the rightmost node of its level: it is paired with a carry on its left
    /// when one exists, otherwise with an empty subtree on its right.
    fn fold(&self) -> Hash {
        if self.leaf_count == 0 {
            return empty_hash(0);
        }

        let height = root_height(self.leaf_count);
        let mut partial: Option<Hash> = None;
        for level in 0..height {
            let carry = self.carries.get(level).copied().flatten();
            partial = match (carry, partial) {
                (Some(left), Some(right)) => Some(combine(&left, &right)),
                (Some(left), None) => Some(combine(&left, &empty_hash(level))),
                (None, Some(left)) => Some(combine(&left, &empty_hash(level))),
                (None, None) => None,
            };
        }

        // No partial subtree means the leaf count is a power of two.
        partial
            .or_else(|| self.carries.get(height).copied().flatten())
            .unwrap_or_else(|| empty_hash(height))
    }
}

impl StreamingTreeHasher for SequentialTreeHasher {
    fn add_leaf(&mut self, leaf: &[u8]) -> Result<(), HasherError> {
        if self.root.is_some() {
            return Err(HasherError::RootAlreadyRequested);
        }
        let mut node = leaf_from_slice(leaf).ok_or_else(|| HasherError::invalid_leaf(leaf.len()))?;

        let mut level = 0;
        loop {
            if level == self.carries.len() {
                self.carries.push(None);
            }
            match self.carries[level].take() {
                Some(left) => {
                    node = combine(&left, &node);
                    level += 1;
                }
                None => {
                    self.carries[level] = Some(node);
                    break;
                }
            }
        }

        self.leaf_count += 1;
        Ok(())
    }

    fn root_hash(&mut self) -> Result<Hash, HasherError> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root = self.fold();
        self.root = Some(root);
        Ok(root)
    }

    fn leaf_count(&self) -> u64 {
        self.leaf_count
    }
}
