//! Trie node representation: Empty, Leaf, Extension, Branch. Every non-empty
//! node's identity in the node store is `hash = BLAKE3(canonical(node))`,
//! mirroring the content-addressing convention used throughout the stack.

use basalt_types::Hash256;
use parity_scale_codec::{Decode, Encode};

pub type NodeHash = Hash256;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Node {
    /// A terminal node: the remaining key nibbles and the stored value.
    Leaf { key_end: Vec<u8>, value: Vec<u8> },
    /// A single-child node covering a shared nibble run, pointing at a
    /// Branch (extensions never point at another extension or a leaf,
    /// which is folded into the extension's own `key_end`... except a
    /// leaf, which an extension may point to directly when the branch
    /// beneath it would otherwise have exactly one occupied slot).
    Extension { shared: Vec<u8>, child: NodeHash },
    /// Sixteen child slots, one per nibble value, plus an optional value
    /// for a key that terminates exactly at this branch.
    Branch { children: [Option<NodeHash>; 16], value: Option<Vec<u8>> },
}

impl Node {
    pub fn hash(&self) -> NodeHash {
        basalt_crypto::hash::blake3(&self.encode())
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_content_bound() {
        let leaf_a = Node::Leaf { key_end: vec![1, 2], value: vec![9] };
        let leaf_b = Node::Leaf { key_end: vec![1, 2], value: vec![9] };
        let leaf_c = Node::Leaf { key_end: vec![1, 2], value: vec![10] };
        assert_eq!(leaf_a.hash(), leaf_b.hash());
        assert_ne!(leaf_a.hash(), leaf_c.hash());
    }
}
