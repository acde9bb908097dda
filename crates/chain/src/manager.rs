//! The chain manager: append invariants, hash/number indexing, and
//! ancient-body eviction (spec.md §4.6 "Chain manager").

use crate::error::ChainError;
use basalt_types::{Block, BlockHeader, ChainParams, Hash256, Receipt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Keeps the canonical header chain plus a retained window of full bodies
/// (transactions + receipts); anything older than `retained_bodies` blocks
/// behind the tip is evicted, keeping only its header (spec.md §4.6 "ancient
/// body eviction").
pub struct ChainManager {
    params: ChainParams,
    headers_by_number: BTreeMap<u64, BlockHeader>,
    hash_to_number: BTreeMap<Hash256, u64>,
    bodies: BTreeMap<u64, (Vec<basalt_types::Transaction>, Vec<Receipt>)>,
    tip: u64,
}

impl ChainManager {
    pub fn new(genesis: BlockHeader, params: ChainParams) -> Self {
        let mut hash_to_number = BTreeMap::new();
        hash_to_number.insert(genesis.hash(), genesis.number);
        let tip = genesis.number;
        let mut headers_by_number = BTreeMap::new();
        headers_by_number.insert(genesis.number, genesis);
        ChainManager { params, headers_by_number, hash_to_number, bodies: BTreeMap::new(), tip }
    }

    pub fn tip_number(&self) -> u64 {
        self.tip
    }

    pub fn tip_header(&self) -> &BlockHeader {
        self.headers_by_number
            .get(&self.tip)
            .unwrap_or_else(|| unreachable_tip_missing())
    }

    pub fn header_by_number(&self, number: u64) -> Option<&BlockHeader> {
        self.headers_by_number.get(&number)
    }

    pub fn header_by_hash(&self, hash: &Hash256) -> Option<&BlockHeader> {
        self.hash_to_number.get(hash).and_then(|n| self.headers_by_number.get(n))
    }

    pub fn body(&self, number: u64) -> Option<&(Vec<basalt_types::Transaction>, Vec<Receipt>)> {
        self.bodies.get(&number)
    }

    /// Appends `block` as the new tip. Checked invariants (spec.md §4.6):
    /// the parent hash must match the current tip, the number must be
    /// `tip + 1`, and the timestamp must strictly exceed the parent's.
    pub fn append(&mut self, block: Block, receipts: Vec<Receipt>) -> Result<(), ChainError> {
        let tip_header = self.tip_header().clone();
        if block.header.parent_hash != tip_header.hash() {
            return Err(ChainError::InvalidParentHash);
        }
        if block.header.number != tip_header.number + 1 {
            return Err(ChainError::InvalidBlockNumber {
                expected: tip_header.number + 1,
                got: block.header.number,
            });
        }
        if block.header.timestamp <= tip_header.timestamp {
            return Err(ChainError::InvalidTimestamp {
                parent: tip_header.timestamp,
                got: block.header.timestamp,
            });
        }

        let number = block.header.number;
        let hash = block.header.hash();
        self.hash_to_number.insert(hash, number);
        self.headers_by_number.insert(number, block.header);
        self.bodies.insert(number, (block.transactions, receipts));
        self.tip = number;
        debug!(number, %hash, "appended block");

        self.evict_ancient_bodies();
        Ok(())
    }

    fn evict_ancient_bodies(&mut self) {
        if self.tip < self.params.retained_bodies {
            return;
        }
        let cutoff = self.tip - self.params.retained_bodies;
        let stale: Vec<u64> = self.bodies.range(..cutoff).map(|(n, _)| *n).collect();
        for number in stale {
            self.bodies.remove(&number);
        }
        if !stale_is_empty(&self.bodies, cutoff) {
            info!(cutoff, "evicted ancient block bodies");
        }
    }
}

fn stale_is_empty(bodies: &BTreeMap<u64, (Vec<basalt_types::Transaction>, Vec<Receipt>)>, cutoff: u64) -> bool {
    bodies.range(..cutoff).next().is_none()
}

fn unreachable_tip_missing() -> &'static BlockHeader {
    // The tip entry is inserted in `new` and only ever replaced, never
    // removed, by `append`; this path is structurally unreachable.
    static ZERO: std::sync::OnceLock<BlockHeader> = std::sync::OnceLock::new();
    ZERO.get_or_init(|| BlockHeader {
        version: 1,
        number: 0,
        parent_hash: Hash256::ZERO,
        state_root: Hash256::ZERO,
        transactions_root: Hash256::ZERO,
        receipts_root: Hash256::ZERO,
        proposer: basalt_types::Address::ZERO,
        timestamp: 0,
        chain_id: 0,
        gas_used: 0,
        gas_limit: 0,
        base_fee: basalt_types::UInt256::ZERO,
        extra_data: vec![],
        bls_aggregate_signature: vec![],
        signer_bitfield: vec![],
        view: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::Address;

    fn header(number: u64, parent_hash: Hash256, timestamp: u64) -> BlockHeader {
        BlockHeader {
            version: 1,
            number,
            parent_hash,
            state_root: Hash256::ZERO,
            transactions_root: Hash256::ZERO,
            receipts_root: Hash256::ZERO,
            proposer: Address::ZERO,
            timestamp,
            chain_id: 1,
            gas_used: 0,
            gas_limit: 30_000_000,
            base_fee: basalt_types::UInt256::ZERO,
            extra_data: vec![],
            bls_aggregate_signature: vec![],
            signer_bitfield: vec![],
            view: 0,
        }
    }

    #[test]
    fn appends_a_well_formed_chain() {
        let genesis = header(0, Hash256::ZERO, 0);
        let mut manager = ChainManager::new(genesis.clone(), ChainParams::default());
        let block1 = Block { header: header(1, genesis.hash(), 1), transactions: vec![], slashing_evidence: vec![] };
        manager.append(block1.clone(), vec![]).unwrap();
        assert_eq!(manager.tip_number(), 1);
        assert!(manager.header_by_hash(&block1.header.hash()).is_some());
    }

    #[test]
    fn rejects_wrong_parent_hash() {
        let genesis = header(0, Hash256::ZERO, 0);
        let mut manager = ChainManager::new(genesis, ChainParams::default());
        let bogus = Block { header: header(1, Hash256([9u8; 32]), 1), transactions: vec![], slashing_evidence: vec![] };
        assert!(matches!(manager.append(bogus, vec![]), Err(ChainError::InvalidParentHash)));
    }

    #[test]
    fn rejects_non_increasing_timestamp() {
        let genesis = header(0, Hash256::ZERO, 100);
        let mut manager = ChainManager::new(genesis.clone(), ChainParams::default());
        let block1 = Block { header: header(1, genesis.hash(), 100), transactions: vec![], slashing_evidence: vec![] };
        assert!(matches!(manager.append(block1, vec![]), Err(ChainError::InvalidTimestamp { .. })));
    }

    #[test]
    fn evicts_bodies_beyond_retention_window() {
        let genesis = header(0, Hash256::ZERO, 0);
        let params = ChainParams { retained_bodies: 2, ..ChainParams::default() };
        let mut manager = ChainManager::new(genesis.clone(), params);
        let mut parent = genesis;
        for n in 1..=5u64 {
            let block = Block { header: header(n, parent.hash(), n), transactions: vec![], slashing_evidence: vec![] };
            parent = block.header.clone();
            manager.append(block, vec![]).unwrap();
        }
        assert!(manager.body(1).is_none());
        assert!(manager.body(2).is_none());
        assert!(manager.body(5).is_some());
        assert!(manager.header_by_number(1).is_some());
    }
}
