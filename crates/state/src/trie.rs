//! A hash-addressed Merkle-Patricia Trie: the authenticated key-value
//! structure backing both the account trie and each contract's storage
//! subtrie (spec.md §5 "AuthenticatedState").
//!
//! Nodes are immutable once hashed; mutation always produces new nodes and
//! rewires parents down to a new root, the same copy-on-write discipline the
//! rest of the state layer depends on for safe pruning by reachability.

// Nibble-path slicing is load-bearing throughout this module and every
// bound is already bounds-checked by the preceding `if`; the crate-wide
// indexing lint is relaxed here rather than rewritten through `.get()`.
#![allow(clippy::indexing_slicing)]

use crate::nibble::{bytes_to_nibbles, common_prefix_len, nibbles_to_bytes};
use crate::node::{Node, NodeHash};
use basalt_api::storage::NodeStore;
use basalt_types::{Hash256, StateError};
use std::collections::HashMap;

/// An inclusion or absence proof: every node visited on the path from root
/// to the target key, in root-to-leaf order, as raw encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieProof {
    pub nodes: Vec<Vec<u8>>,
}

/// Outcome of a subtree delete: distinguishes "key absent, nothing changed"
/// from "key present and removed", which a plain `Option<NodeHash>` cannot —
/// both a missing key and a collapsed-to-nothing subtree would otherwise
/// decode to `None`.
#[derive(Debug, PartialEq, Eq)]
enum DeleteOutcome {
    NotFound,
    Removed(Option<NodeHash>),
}

pub struct Trie<'s> {
    store: &'s dyn NodeStore,
    root: Option<NodeHash>,
    /// Nodes created or loaded during this trie's lifetime, keyed by hash.
    /// Flushed to `store` on `commit`.
    cache: HashMap<NodeHash, Node>,
}

impl<'s> Trie<'s> {
    pub fn new(store: &'s dyn NodeStore, root: Option<NodeHash>) -> Self {
        Trie { store, root, cache: HashMap::new() }
    }

    pub fn root_hash(&self) -> Hash256 {
        self.root.unwrap_or(Hash256::ZERO)
    }

    fn load(&mut self, hash: &NodeHash) -> Result<Node, StateError> {
        if let Some(node) = self.cache.get(hash) {
            return Ok(node.clone());
        }
        let bytes = self
            .store
            .get_node(hash)
            .map_err(|e| StateError::Backend(e.to_string()))?
            .ok_or(StateError::KeyNotFound)?;
        let node: Node = parity_scale_codec::Decode::decode(&mut &bytes[..])
            .map_err(|e| StateError::Decode(e.to_string()))?;
        self.cache.insert(*hash, node.clone());
        Ok(node)
    }

    fn insert_cache(&mut self, node: Node) -> NodeHash {
        let hash = node.hash();
        self.cache.insert(hash, node);
        hash
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let Some(root) = self.root else { return Ok(None) };
        let nibbles = bytes_to_nibbles(key);
        self.get_at(root, &nibbles)
    }

    fn get_at(&mut self, hash: NodeHash, nibbles: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let node = self.load(&hash)?;
        match node {
            Node::Leaf { key_end, value } => {
                if key_end == nibbles {
                    Ok(Some(value))
                } else {
                    Ok(None)
                }
            }
            Node::Extension { shared, child } => {
                if nibbles.len() >= shared.len() && nibbles[..shared.len()] == shared[..] {
                    self.get_at(child, &nibbles[shared.len()..])
                } else {
                    Ok(None)
                }
            }
            Node::Branch { children, value } => {
                if nibbles.is_empty() {
                    return Ok(value);
                }
                let idx = nibbles[0] as usize;
                match children.get(idx).copied().flatten() {
                    Some(child) => self.get_at(child, &nibbles[1..]),
                    None => Ok(None),
                }
            }
        }
    }

    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StateError> {
        let nibbles = bytes_to_nibbles(key);
        let new_root = match self.root {
            Some(root) => self.put_at(root, &nibbles, value)?,
            None => self.insert_cache(Node::Leaf { key_end: nibbles, value }),
        };
        self.root = Some(new_root);
        Ok(())
    }

    fn put_at(&mut self, hash: NodeHash, nibbles: &[u8], value: Vec<u8>) -> Result<NodeHash, StateError> {
        let node = self.load(&hash)?;
        match node {
            Node::Leaf { key_end, value: existing } => {
                if key_end == nibbles {
                    return Ok(self.insert_cache(Node::Leaf { key_end, value }));
                }
                let shared = common_prefix_len(&key_end, nibbles);
                let branch_hash = self.split_into_branch(
                    &key_end[shared..],
                    existing,
                    &nibbles[shared..],
                    value,
                )?;
                Ok(self.wrap_with_extension(&key_end[..shared], branch_hash))
            }
            Node::Extension { shared, child } => {
                let common = common_prefix_len(&shared, nibbles);
                if common == shared.len() {
                    let new_child = self.put_at(child, &nibbles[common..], value)?;
                    Ok(self.wrap_with_extension(&shared, new_child))
                } else {
                    // Diverges partway through the extension: split it.
                    let remaining_shared = &shared[common..];
                    let tail_extension_hash = self.wrap_with_extension(&remaining_shared[1..], child);
                    let branch_hash = self.split_into_branch_with_child(
                        remaining_shared[0],
                        tail_extension_hash,
                        &nibbles[common..],
                        value,
                    )?;
                    Ok(self.wrap_with_extension(&shared[..common], branch_hash))
                }
            }
            Node::Branch { mut children, value: branch_value } => {
                if nibbles.is_empty() {
                    return Ok(self.insert_cache(Node::Branch { children, value: Some(value) }));
                }
                let idx = nibbles[0] as usize;
                let new_child = match children.get(idx).copied().flatten() {
                    Some(existing_child) => self.put_at(existing_child, &nibbles[1..], value)?,
                    None => self.insert_cache(Node::Leaf { key_end: nibbles[1..].to_vec(), value }),
                };
                if let Some(slot) = children.get_mut(idx) {
                    *slot = Some(new_child);
                }
                Ok(self.insert_cache(Node::Branch { children, value: branch_value }))
            }
        }
    }

    /// Builds a branch node from two diverging leaf-style (tail, value)
    /// pairs that disagree on their very first nibble.
    fn split_into_branch(
        &mut self,
        tail_a: &[u8],
        value_a: Vec<u8>,
        tail_b: &[u8],
        value_b: Vec<u8>,
    ) -> Result<NodeHash, StateError> {
        let mut children: [Option<NodeHash>; 16] = [None; 16];
        let mut branch_value = None;
        if tail_a.is_empty() {
            branch_value = Some(value_a);
        } else {
            let idx = tail_a[0] as usize;
            let leaf = self.insert_cache(Node::Leaf { key_end: tail_a[1..].to_vec(), value: value_a });
            if let Some(slot) = children.get_mut(idx) {
                *slot = Some(leaf);
            }
        }
        if tail_b.is_empty() {
            branch_value = Some(value_b);
        } else {
            let idx = tail_b[0] as usize;
            let leaf = self.insert_cache(Node::Leaf { key_end: tail_b[1..].to_vec(), value: value_b });
            if let Some(slot) = children.get_mut(idx) {
                *slot = Some(leaf);
            }
        }
        Ok(self.insert_cache(Node::Branch { children, value: branch_value }))
    }

    /// Like `split_into_branch`, but one side is an already-built subtree
    /// hash sitting at nibble `existing_nibble`, not a fresh leaf.
    fn split_into_branch_with_child(
        &mut self,
        existing_nibble: u8,
        existing_child: NodeHash,
        new_tail: &[u8],
        new_value: Vec<u8>,
    ) -> Result<NodeHash, StateError> {
        let mut children: [Option<NodeHash>; 16] = [None; 16];
        if let Some(slot) = children.get_mut(existing_nibble as usize) {
            *slot = Some(existing_child);
        }
        let mut branch_value = None;
        if new_tail.is_empty() {
            branch_value = Some(new_value);
        } else {
            let idx = new_tail[0] as usize;
            let leaf = self.insert_cache(Node::Leaf { key_end: new_tail[1..].to_vec(), value: new_value });
            if let Some(slot) = children.get_mut(idx) {
                *slot = Some(leaf);
            }
        }
        Ok(self.insert_cache(Node::Branch { children, value: branch_value }))
    }

    /// Wraps `child` behind an extension over `shared`, or skips the
    /// wrapper entirely when there is no shared nibble run to record.
    fn wrap_with_extension(&mut self, shared: &[u8], child: NodeHash) -> NodeHash {
        if shared.is_empty() {
            child
        } else {
            self.insert_cache(Node::Extension { shared: shared.to_vec(), child })
        }
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<bool, StateError> {
        let Some(root) = self.root else { return Ok(false) };
        let nibbles = bytes_to_nibbles(key);
        match self.delete_at(root, &nibbles)? {
            DeleteOutcome::NotFound => Ok(false),
            DeleteOutcome::Removed(Some(new_root)) => {
                self.root = Some(new_root);
                Ok(true)
            }
            DeleteOutcome::Removed(None) => {
                self.root = None;
                Ok(true)
            }
        }
    }

    /// Returns `NotFound` when `nibbles` is absent from this subtree (the
    /// hash is unchanged and the caller must not treat this as a deletion),
    /// or `Removed(new_root)` when it was present: `Some(hash)` if the
    /// subtree survives with a new hash, `None` if it collapsed to nothing.
    fn delete_at(&mut self, hash: NodeHash, nibbles: &[u8]) -> Result<DeleteOutcome, StateError> {
        let node = self.load(&hash)?;
        match node {
            Node::Leaf { key_end, .. } => {
                if key_end == nibbles {
                    Ok(DeleteOutcome::Removed(None))
                } else {
                    Ok(DeleteOutcome::NotFound)
                }
            }
            Node::Extension { shared, child } => {
                if nibbles.len() < shared.len() || nibbles[..shared.len()] != shared[..] {
                    return Ok(DeleteOutcome::NotFound);
                }
                match self.delete_at(child, &nibbles[shared.len()..])? {
                    DeleteOutcome::NotFound => Ok(DeleteOutcome::NotFound),
                    DeleteOutcome::Removed(Some(new_child)) => {
                        Ok(DeleteOutcome::Removed(Some(self.wrap_with_extension(&shared, new_child))))
                    }
                    DeleteOutcome::Removed(None) => Ok(DeleteOutcome::Removed(None)),
                }
            }
            Node::Branch { mut children, value } => {
                if nibbles.is_empty() {
                    if value.is_none() {
                        return Ok(DeleteOutcome::NotFound);
                    }
                    return Ok(DeleteOutcome::Removed(Some(self.compact_branch(children, None)?)));
                }
                let idx = nibbles[0] as usize;
                let Some(existing_child) = children.get(idx).copied().flatten() else {
                    return Ok(DeleteOutcome::NotFound);
                };
                let updated = match self.delete_at(existing_child, &nibbles[1..])? {
                    DeleteOutcome::NotFound => return Ok(DeleteOutcome::NotFound),
                    DeleteOutcome::Removed(updated_child) => updated_child,
                };
                if let Some(slot) = children.get_mut(idx) {
                    *slot = updated;
                }
                Ok(DeleteOutcome::Removed(Some(self.compact_branch(children, value)?)))
            }
        }
    }

    /// After a branch loses a child or its own value, collapse it if it now
    /// has only one remaining occupant (spec.md §5 "re-compaction on
    /// delete"): a single child with no branch value becomes an extension
    /// (or is merged into one), and no children with a value becomes a leaf.
    fn compact_branch(
        &mut self,
        children: [Option<NodeHash>; 16],
        value: Option<Vec<u8>>,
    ) -> Result<NodeHash, StateError> {
        let occupied: Vec<(usize, NodeHash)> = children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|h| (i, h)))
            .collect();

        if occupied.is_empty() {
            if let Some(v) = value {
                return Ok(self.insert_cache(Node::Leaf { key_end: vec![], value: v }));
            }
            // An empty branch with no value should never be constructed by
            // this trie's insert path; treat it as a degenerate empty leaf.
            return Ok(self.insert_cache(Node::Leaf { key_end: vec![], value: vec![] }));
        }

        if occupied.len() == 1 && value.is_none() {
            let (nibble, child_hash) = occupied[0];
            let child_node = self.load(&child_hash)?;
            return Ok(match child_node {
                Node::Leaf { key_end, value: leaf_value } => {
                    let mut full_key = vec![nibble as u8];
                    full_key.extend_from_slice(&key_end);
                    self.insert_cache(Node::Leaf { key_end: full_key, value: leaf_value })
                }
                Node::Extension { shared, child } => {
                    let mut full_shared = vec![nibble as u8];
                    full_shared.extend_from_slice(&shared);
                    self.insert_cache(Node::Extension { shared: full_shared, child })
                }
                Node::Branch { .. } => {
                    self.insert_cache(Node::Extension { shared: vec![nibble as u8], child: child_hash })
                }
            });
        }

        Ok(self.insert_cache(Node::Branch { children, value }))
    }

    /// Walks the path from root to `key`, collecting every node's encoded
    /// bytes for an inclusion or absence proof.
    pub fn prove(&mut self, key: &[u8]) -> Result<TrieProof, StateError> {
        let mut nodes = Vec::new();
        let Some(mut cursor) = self.root else {
            return Ok(TrieProof { nodes });
        };
        let mut nibbles = bytes_to_nibbles(key);
        loop {
            let node = self.load(&cursor)?;
            nodes.push(parity_scale_codec::Encode::encode(&node));
            match node {
                Node::Leaf { .. } => break,
                Node::Extension { shared, child } => {
                    if nibbles.len() < shared.len() || nibbles[..shared.len()] != shared[..] {
                        break;
                    }
                    nibbles = nibbles[shared.len()..].to_vec();
                    cursor = child;
                }
                Node::Branch { children, .. } => {
                    if nibbles.is_empty() {
                        break;
                    }
                    let idx = nibbles[0] as usize;
                    match children.get(idx).copied().flatten() {
                        Some(next) => {
                            nibbles = nibbles[1..].to_vec();
                            cursor = next;
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(TrieProof { nodes })
    }

    /// Verifies a proof against an expected root without requiring access
    /// to a `NodeStore`: each proof node must hash to the value referenced
    /// by its parent, chained back to `root`.
    pub fn verify(root: Hash256, key: &[u8], proof: &TrieProof, expected_value: Option<&[u8]>) -> bool {
        if proof.nodes.is_empty() {
            return root.is_zero() && expected_value.is_none();
        }
        let mut nibbles = bytes_to_nibbles(key);
        let mut expected_hash = root;
        for (i, encoded) in proof.nodes.iter().enumerate() {
            let actual_hash = basalt_crypto::hash::blake3(encoded);
            if actual_hash != expected_hash {
                return false;
            }
            let Ok(node) = <Node as parity_scale_codec::Decode>::decode(&mut &encoded[..]) else {
                return false;
            };
            let is_last = i + 1 == proof.nodes.len();
            match node {
                Node::Leaf { key_end, value } => {
                    let matches = key_end == nibbles;
                    return matches == (expected_value == Some(value.as_slice()))
                        && (matches || expected_value.is_none());
                }
                Node::Extension { shared, child } => {
                    if nibbles.len() < shared.len() || nibbles[..shared.len()] != shared[..] {
                        return is_last && expected_value.is_none();
                    }
                    nibbles = nibbles[shared.len()..].to_vec();
                    expected_hash = child;
                }
                Node::Branch { children, value } => {
                    if nibbles.is_empty() {
                        return is_last && value.as_deref() == expected_value;
                    }
                    let idx = nibbles[0] as usize;
                    match children.get(idx).copied().flatten() {
                        Some(next) => {
                            nibbles = nibbles[1..].to_vec();
                            expected_hash = next;
                        }
                        None => return is_last && expected_value.is_none(),
                    }
                }
            }
        }
        expected_value.is_none()
    }

    /// Flushes every cached node to the backing store and clears the cache,
    /// returning the committed root.
    pub fn commit(&mut self) -> Result<Hash256, StateError> {
        let batch: Vec<(NodeHash, Vec<u8>)> = self
            .cache
            .drain()
            .map(|(hash, node)| (hash, parity_scale_codec::Encode::encode(&node)))
            .collect();
        if !batch.is_empty() {
            self.store.put_nodes(batch).map_err(|e| StateError::Backend(e.to_string()))?;
        }
        Ok(self.root_hash())
    }

    /// Collects every node hash reachable from `root`, used to distinguish
    /// live nodes from prunable garbage across multiple retained roots.
    pub fn collect_reachable(&mut self, root: NodeHash, out: &mut std::collections::BTreeSet<NodeHash>) -> Result<(), StateError> {
        if !out.insert(root) {
            return Ok(());
        }
        let node = self.load(&root)?;
        match node {
            Node::Leaf { .. } => {}
            Node::Extension { child, .. } => self.collect_reachable(child, out)?,
            Node::Branch { children, .. } => {
                for child in children.into_iter().flatten() {
                    self.collect_reachable(child, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Converts a nibble-path leaf key back into the original byte key, for
/// callers that walk a trie's full keyspace (used by reachability pruning
/// and test fixtures only; the hot insert/get paths never need this).
pub fn leaf_key_to_bytes(key_end: &[u8]) -> Vec<u8> {
    nibbles_to_bytes(key_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_storage::memory::MemoryNodeStore;

    #[test]
    fn put_get_roundtrip_single_key() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        trie.put(b"hello", b"world".to_vec()).unwrap();
        assert_eq!(trie.get(b"hello").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn put_many_keys_and_read_back() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        let entries: Vec<(Vec<u8>, Vec<u8>)> = (0u32..50)
            .map(|i| (format!("key{i}").into_bytes(), format!("value{i}").into_bytes()))
            .collect();
        for (k, v) in &entries {
            trie.put(k, v.clone()).unwrap();
        }
        for (k, v) in &entries {
            assert_eq!(trie.get(k).unwrap().as_ref(), Some(v));
        }
    }

    #[test]
    fn root_is_order_independent() {
        let store_a = MemoryNodeStore::new();
        let store_b = MemoryNodeStore::new();
        let mut trie_a = Trie::new(&store_a, None);
        let mut trie_b = Trie::new(&store_b, None);
        let pairs = [(b"alpha".to_vec(), b"1".to_vec()), (b"beta".to_vec(), b"2".to_vec()), (b"gamma".to_vec(), b"3".to_vec())];
        for (k, v) in pairs.iter() {
            trie_a.put(k, v.clone()).unwrap();
        }
        for (k, v) in pairs.iter().rev() {
            trie_b.put(k, v.clone()).unwrap();
        }
        assert_eq!(trie_a.root_hash(), trie_b.root_hash());
    }

    #[test]
    fn delete_removes_key_and_others_survive() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        trie.put(b"alpha", b"1".to_vec()).unwrap();
        trie.put(b"beta", b"2".to_vec()).unwrap();
        assert!(trie.delete(b"alpha").unwrap());
        assert_eq!(trie.get(b"alpha").unwrap(), None);
        assert_eq!(trie.get(b"beta").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn delete_missing_key_returns_false_and_leaves_trie_unchanged() {
        let store = MemoryNodeStore::new();
        let mut empty = Trie::new(&store, None);
        assert!(!empty.delete(b"nonexistent").unwrap());

        let mut trie = Trie::new(&store, None);
        trie.put(b"alpha", b"1".to_vec()).unwrap();
        let root_before = trie.root_hash();
        assert!(!trie.delete(b"nonexistent").unwrap());
        assert_eq!(trie.root_hash(), root_before);
        assert_eq!(trie.get(b"alpha").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn delete_all_keys_empties_root() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        trie.put(b"alpha", b"1".to_vec()).unwrap();
        trie.delete(b"alpha").unwrap();
        assert!(trie.root_hash().is_zero());
    }

    #[test]
    fn commit_persists_nodes_for_fresh_trie_to_reload() {
        let store = MemoryNodeStore::new();
        let root = {
            let mut trie = Trie::new(&store, None);
            trie.put(b"persisted", b"value".to_vec()).unwrap();
            trie.commit().unwrap()
        };
        let mut reopened = Trie::new(&store, Some(root));
        assert_eq!(reopened.get(b"persisted").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn proof_verifies_inclusion() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        trie.put(b"alpha", b"1".to_vec()).unwrap();
        trie.put(b"beta", b"2".to_vec()).unwrap();
        let proof = trie.prove(b"alpha").unwrap();
        assert!(Trie::verify(trie.root_hash(), b"alpha", &proof, Some(b"1")));
    }
}
