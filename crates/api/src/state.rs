//! Contracts for the authenticated state layer (spec.md §5 "AuthenticatedState").
//!
//! Every read here takes `&mut self`: trie nodes are lazily loaded from the
//! backing `NodeStore` into an in-memory cache on first touch, so even a
//! "read" mutates that cache (see DESIGN.md).

use basalt_types::{AccountState, Address, Hash256, StateError};
use std::collections::BTreeMap;

/// A Merkle inclusion or absence proof: the full chain of encoded trie
/// nodes from root to the target key, in root-to-leaf order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StateProof {
    pub nodes: Vec<Vec<u8>>,
}

/// Read/write access to a single authenticated key-value mapping, with a
/// root commitment that changes deterministically with every mutation
/// (spec.md §5 "Core invariants").
pub trait StateAccess {
    fn get_raw(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    fn put_raw(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StateError>;
    fn delete_raw(&mut self, key: &[u8]) -> Result<(), StateError>;
    fn root(&self) -> Hash256;

    /// The set of keys touched (put or deleted) since the last commit,
    /// mandatory because a forgotten mutation here is a consensus-breaking
    /// bug (spec.md §5 "Copy-on-write overlays must track dirty keys").
    fn dirty_keys(&self) -> &std::collections::BTreeSet<Vec<u8>>;
}

pub trait ProofProvider {
    fn prove(&mut self, key: &[u8]) -> Result<StateProof, StateError>;
    fn verify(root: Hash256, key: &[u8], proof: &StateProof, expected_value: Option<&[u8]>) -> bool
    where
        Self: Sized;
}

/// The umbrella trait a full account-and-storage state database implements:
/// versioned commits, account-level reads/writes, and pruning by reachability.
pub trait StateManager: ProofProvider {
    fn get_account(&mut self, address: &Address) -> Result<Option<AccountState>, StateError>;
    fn put_account(&mut self, address: &Address, account: AccountState) -> Result<(), StateError>;
    fn get_storage_slot(&mut self, address: &Address, slot: &Hash256) -> Result<Hash256, StateError>;
    fn put_storage_slot(
        &mut self,
        address: &Address,
        slot: &Hash256,
        value: Hash256,
    ) -> Result<(), StateError>;

    /// Seals the pending overlay into a new, immutable version and returns
    /// its root. Idempotent replays of the same height must be rejected by
    /// the caller, not by this trait.
    fn commit_version(&mut self, height: u64) -> Result<Hash256, StateError>;

    fn root(&self) -> Hash256;

    /// Prunes any trie node unreachable from a retained root.
    fn prune(&mut self, retained_roots: &BTreeMap<u64, Hash256>) -> Result<usize, StateError>;
}
