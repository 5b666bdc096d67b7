//! Leaf hashing of block items.

use crate::domain::errors::VerificationError;
use crate::domain::hashing::sha384;
use crate::ports::outbound::ItemHasher;
use shared_types::{BlockItem, Hash};

/// SHA-384 over the canonical item encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha384ItemHasher;

impl ItemHasher for Sha384ItemHasher {
    fn leaf_hash(&self, item: &BlockItem) -> Result<Hash, VerificationError> {
        Ok(sha384(&item.encode()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_hash_covers_kind_and_body() {
        let hasher = Sha384ItemHasher;
        let input = hasher.leaf_hash(&BlockItem::EventHeader(vec![1, 2])).unwrap();
        let output = hasher.leaf_hash(&BlockItem::StateChanges(vec![1, 2])).unwrap();
        assert_ne!(input, output);
        assert_eq!(
            input,
            sha384(&BlockItem::EventHeader(vec![1, 2]).encode().unwrap())
        );
    }
}
