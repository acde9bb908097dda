//! An in-memory reference `KvStore`/`NodeStore`, used in tests and by the
//! in-process node harness where durability is not required.

use basalt_api::storage::{KvStore, NodeStore, StorageError, WriteOp};
use basalt_types::Hash256;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.inner.read().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<(), StorageError> {
        let mut guard = self.inner.write().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        for op in batch {
            match op {
                WriteOp::Put(k, v) => {
                    guard.insert(k, v);
                }
                WriteOp::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError> {
        let guard = self.inner.read().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        let matches: Vec<(Vec<u8>, Vec<u8>)> = guard
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(matches.into_iter()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<BTreeMap<Hash256, Vec<u8>>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeStore for MemoryNodeStore {
    fn get_node(&self, hash: &Hash256) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.nodes.read().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        Ok(guard.get(hash).cloned())
    }

    fn put_nodes(&self, nodes: Vec<(Hash256, Vec<u8>)>) -> Result<(), StorageError> {
        let mut guard = self.nodes.write().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        for (hash, bytes) in nodes {
            guard.entry(hash).or_insert(bytes);
        }
        Ok(())
    }

    fn prune_nodes(&self, hashes: &[Hash256]) -> Result<usize, StorageError> {
        let mut guard = self.nodes.write().map_err(|_| StorageError::Backend("poisoned lock".into()))?;
        let mut removed = 0;
        for hash in hashes {
            if guard.remove(hash).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
