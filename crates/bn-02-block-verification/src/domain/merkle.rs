//! # Merkle Diagnostics
//!
//! Full level-by-level trees for a verified block, recorded only when
//! diagnostics are enabled. Useful when a producer disputes a block hash.

use crate::domain::hashing::{combine, empty_hash};
use shared_types::{hash_hex, Hash};

/// Every level of a padded Merkle tree, leaves first, root last.
///
/// Levels below the root with an odd node count are padded with the empty
/// subtree of that level. A tree without leaves is a single level holding
/// the empty-tree constant.
pub fn tree_levels(leaves: &[Hash]) -> Vec<Vec<Hash>> {
    if leaves.is_empty() {
        return vec![vec![empty_hash(0)]];
    }

    let mut levels = vec![leaves.to_vec()];
    let mut height = 0;
    while levels[height].len() > 1 {
        let current = &mut levels[height];
        if current.len() % 2 == 1 {
            current.push(empty_hash(height));
        }
        let next = current
            .chunks(2)
            .map(|pair| combine(&pair[0], &pair[1]))
            .collect();
        levels.push(next);
        height += 1;
    }
    levels
}

/// Trees and linkage hashes behind one block hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMerkleTreeInfo {
    pub input_tree: Vec<Vec<Hash>>,
    pub output_tree: Vec<Vec<Hash>>,
    pub previous_block_root_hash: Hash,
    pub start_of_block_state_root_hash: Hash,
    pub block_hash: Hash,
}

impl BlockMerkleTreeInfo {
    pub fn input_root(&self) -> Option<&Hash> {
        self.input_tree.last().and_then(|level| level.first())
    }

    pub fn output_root(&self) -> Option<&Hash> {
        self.output_tree.last().and_then(|level| level.first())
    }

    /// Hex dump of both trees, one level per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, tree) in [("input", &self.input_tree), ("output", &self.output_tree)] {
            out.push_str(name);
            out.push_str(" tree:\n");
            for (height, level) in tree.iter().enumerate() {
                let hashes: Vec<String> = level.iter().map(hash_hex).collect();
                out.push_str(&format!("  {height}: [{}]\n", hashes.join(", ")));
            }
        }
        out.push_str(&format!("block hash: {}\n", hash_hex(&self.block_hash)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hashing::sha384;

    #[test]
    fn test_levels_of_five_leaves() {
        let leaves: Vec<Hash> = (0u8..5).map(|i| sha384(&[i])).collect();
        let levels = tree_levels(&leaves);

        // 5 (+1 pad) -> 3 (+1 pad) -> 2 -> 1
        assert_eq!(
            levels.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![6, 4, 2, 1]
        );
        assert_eq!(levels[0][5], empty_hash(0));
        assert_eq!(levels[1][3], empty_hash(1));
    }

    #[test]
    fn test_levels_of_empty_and_single_trees() {
        assert_eq!(tree_levels(&[]), vec![vec![empty_hash(0)]]);

        let leaf = sha384(b"leaf");
        assert_eq!(tree_levels(&[leaf]), vec![vec![leaf]]);
    }

    #[test]
    fn test_render_lists_every_level() {
        let leaves = [sha384(b"a"), sha384(b"b")];
        let tree = tree_levels(&leaves);
        let info = BlockMerkleTreeInfo {
            input_tree: tree.clone(),
            output_tree: tree_levels(&[]),
            previous_block_root_hash: [0u8; 48],
            start_of_block_state_root_hash: [0u8; 48],
            block_hash: [1u8; 48],
        };

        let rendered = info.render();
        assert!(rendered.contains("input tree:\n  0: ["));
        assert!(rendered.contains("  1: ["));
        assert_eq!(info.input_root(), Some(&tree[1][0]));
    }
}
