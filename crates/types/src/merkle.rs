//! The binary Merkle tree over transaction and receipt hashes used for
//! `BlockHeader::transactions_root` and `BlockHeader::receipts_root`
//! (spec.md §3 "BlockHeader").

use crate::primitives::Hash256;

/// Root of a binary Merkle tree over `leaves`, pairwise-hashed with BLAKE3.
/// An odd node at any level is carried up unchanged rather than duplicated,
/// so no single-leaf subtree can be mistaken for a two-leaf one. The empty
/// tree's root is the zero hash (spec.md "Empty block invariant").
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return Hash256::ZERO;
    }
    let mut level: Vec<Hash256> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut pair = level.chunks(2);
        while let Some(chunk) = pair.next() {
            match chunk {
                [a, b] => {
                    let mut preimage = Vec::with_capacity(64);
                    preimage.extend_from_slice(a.as_ref());
                    preimage.extend_from_slice(b.as_ref());
                    next.push(crate::hash_api::blake3_hash(&preimage).into());
                }
                [a] => next.push(*a),
                _ => {}
            }
        }
        level = next;
    }
    level.first().copied().unwrap_or(Hash256::ZERO)
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_leaves_yield_zero_root() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let leaf = Hash256([7u8; 32]);
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn root_changes_with_leaf_order() {
        let a = Hash256([1u8; 32]);
        let b = Hash256([2u8; 32]);
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn odd_leaf_count_is_deterministic() {
        let leaves = vec![Hash256([1u8; 32]), Hash256([2u8; 32]), Hash256([3u8; 32])];
        let root1 = merkle_root(&leaves);
        let root2 = merkle_root(&leaves);
        assert_eq!(root1, root2);
    }
}
