//! A durable `KvStore`/`NodeStore` pair backed by `redb`, grounded in the
//! teacher's epoch-sharded `RedbEpochStore` table-definition pattern.

use basalt_api::storage::{KvStore, NodeStore, StorageError, WriteOp};
use basalt_types::Hash256;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

const KV_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("basalt_kv");
const NODE_TABLE: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("basalt_nodes");

pub struct RedbKvStore {
    db: Database,
}

impl RedbKvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        let write_txn = db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            write_txn
                .open_table(KV_TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(RedbKvStore { db })
    }
}

impl std::fmt::Debug for RedbKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbKvStore").finish_non_exhaustive()
    }
}

impl KvStore for RedbKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read().map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = read_txn
            .open_table(KV_TABLE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(table
            .get(key)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map(|v| v.value().to_vec()))
    }

    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for op in &batch {
                match op {
                    WriteOp::Put(k, v) => {
                        table
                            .insert(k.as_slice(), v.as_slice())
                            .map_err(|e| StorageError::Backend(e.to_string()))?;
                    }
                    WriteOp::Delete(k) => {
                        table
                            .remove(k.as_slice())
                            .map_err(|e| StorageError::Backend(e.to_string()))?;
                    }
                }
            }
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        tracing::trace!(ops = batch.len(), "kv write batch committed");
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError> {
        let read_txn = self.db.begin_read().map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = read_txn
            .open_table(KV_TABLE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut out = Vec::new();
        let range = table
            .range(prefix.to_vec().as_slice()..)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        for entry in range {
            let (k, v) = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            if !k.value().starts_with(prefix) {
                break;
            }
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(Box::new(out.into_iter()))
    }
}

pub struct RedbNodeStore {
    db: Database,
}

impl RedbNodeStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        let write_txn = db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            write_txn
                .open_table(NODE_TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(RedbNodeStore { db })
    }
}

impl std::fmt::Debug for RedbNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbNodeStore").finish_non_exhaustive()
    }
}

impl NodeStore for RedbNodeStore {
    fn get_node(&self, hash: &Hash256) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read().map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = read_txn
            .open_table(NODE_TABLE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(table
            .get(&hash.0)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map(|v| v.value().to_vec()))
    }

    fn put_nodes(&self, nodes: Vec<(Hash256, Vec<u8>)>) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(NODE_TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for (hash, bytes) in &nodes {
                // Content-addressed: skip writing if already present.
                if table
                    .get(&hash.0)
                    .map_err(|e| StorageError::Backend(e.to_string()))?
                    .is_none()
                {
                    table
                        .insert(&hash.0, bytes.as_slice())
                        .map_err(|e| StorageError::Backend(e.to_string()))?;
                }
            }
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn prune_nodes(&self, hashes: &[Hash256]) -> Result<usize, StorageError> {
        let write_txn = self.db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut removed = 0;
        {
            let mut table = write_txn
                .open_table(NODE_TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for hash in hashes {
                if table
                    .remove(&hash.0)
                    .map_err(|e| StorageError::Backend(e.to_string()))?
                    .is_some()
                {
                    removed += 1;
                }
            }
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn kv_roundtrip_through_redb() {
        let dir = tempdir().unwrap();
        let store = RedbKvStore::open(dir.path().join("kv.redb")).unwrap();
        store.write_batch(vec![WriteOp::Put(b"a".to_vec(), b"1".to_vec())]).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn node_store_is_content_addressed_idempotent() {
        let dir = tempdir().unwrap();
        let store = RedbNodeStore::open(dir.path().join("nodes.redb")).unwrap();
        let hash = Hash256([1u8; 32]);
        store.put_nodes(vec![(hash, b"first".to_vec())]).unwrap();
        store.put_nodes(vec![(hash, b"second".to_vec())]).unwrap();
        assert_eq!(store.get_node(&hash).unwrap(), Some(b"first".to_vec()));
    }
}
