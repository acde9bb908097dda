//! A copy-on-write overlay over a `Trie`: writes accumulate in memory and
//! are only pushed into the underlying trie (and from there, the node
//! store) at `flush`. Every touched key is tracked so nothing is silently
//! dropped on commit (spec.md §5 "Copy-on-write overlays must track dirty
//! keys — forgetting this is a class of consensus-breaking bug").

use crate::trie::Trie;
use basalt_types::StateError;
use std::collections::{BTreeMap, BTreeSet};

enum Pending {
    Put(Vec<u8>),
    Delete,
}

pub struct Overlay<'t, 's> {
    trie: &'t mut Trie<'s>,
    pending: BTreeMap<Vec<u8>, Pending>,
    dirty: BTreeSet<Vec<u8>>,
}

impl<'t, 's> Overlay<'t, 's> {
    pub fn new(trie: &'t mut Trie<'s>) -> Self {
        Overlay { trie, pending: BTreeMap::new(), dirty: BTreeSet::new() }
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.pending.get(key) {
            Some(Pending::Put(value)) => Ok(Some(value.clone())),
            Some(Pending::Delete) => Ok(None),
            None => self.trie.get(key),
        }
    }

    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        self.pending.insert(key.to_vec(), Pending::Put(value));
        self.dirty.insert(key.to_vec());
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.pending.insert(key.to_vec(), Pending::Delete);
        self.dirty.insert(key.to_vec());
    }

    pub fn dirty_keys(&self) -> &BTreeSet<Vec<u8>> {
        &self.dirty
    }

    /// Applies every pending write to the underlying trie and clears the
    /// overlay, returning the new root. Does not persist to the node store;
    /// call `Trie::commit` on the underlying trie for that.
    pub fn flush(mut self) -> Result<basalt_types::Hash256, StateError> {
        for (key, op) in std::mem::take(&mut self.pending) {
            match op {
                Pending::Put(value) => self.trie.put(&key, value)?,
                Pending::Delete => {
                    self.trie.delete(&key)?;
                }
            }
        }
        Ok(self.trie.root_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_storage::memory::MemoryNodeStore;

    #[test]
    fn overlay_reads_own_writes_before_flush() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        let mut overlay = Overlay::new(&mut trie);
        overlay.put(b"a", b"1".to_vec());
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(overlay.dirty_keys().len(), 1);
    }

    #[test]
    fn flush_applies_writes_to_underlying_trie() {
        let store = MemoryNodeStore::new();
        let mut trie = Trie::new(&store, None);
        {
            let mut overlay = Overlay::new(&mut trie);
            overlay.put(b"a", b"1".to_vec());
            overlay.flush().unwrap();
        }
        assert_eq!(trie.get(b"a").unwrap(), Some(b"1".to_vec()));
    }
}
