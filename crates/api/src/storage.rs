//! Contract for the durable key-value backend every storage implementation
//! must satisfy (spec.md §5 "external KV-store contract").

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found")]
    NotFound,
}

/// A single put/delete to be applied atomically with others in the same batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A minimal ordered byte-string key-value store. Every Basalt storage
/// backend (in-memory reference, `redb`-backed) implements this trait;
/// nothing above it knows which backend is in use.
pub trait KvStore: Send + Sync + Debug {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Applies every operation in `batch` atomically: either all take effect
    /// or none do, even across a crash.
    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<(), StorageError>;

    /// Iterates every key with the given prefix in ascending key order.
    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError>;
}

/// A content-addressed store for Merkle-Patricia Trie nodes, keyed by node
/// hash. Distinct from `KvStore` because nodes are immutable and
/// reference-counted by reachability rather than overwritten in place.
pub trait NodeStore: Send + Sync + Debug {
    fn get_node(&self, hash: &basalt_types::Hash256) -> Result<Option<Vec<u8>>, StorageError>;

    /// Persists a batch of newly-created nodes. Nodes already present are
    /// left untouched (content-addressing makes this idempotent).
    fn put_nodes(&self, nodes: Vec<(basalt_types::Hash256, Vec<u8>)>) -> Result<(), StorageError>;

    /// Deletes nodes that are no longer reachable from any retained root.
    fn prune_nodes(&self, hashes: &[basalt_types::Hash256]) -> Result<usize, StorageError>;
}
