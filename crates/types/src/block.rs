//! Block header and block (spec.md §3 "BlockHeader", "Block").

use crate::primitives::{Address, Hash256, UInt256};
use crate::tx::Transaction;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Maximum size of a header's free-form extra-data field.
pub const MAX_EXTRA_DATA_LEN: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub number: u64,
    pub parent_hash: Hash256,
    pub state_root: Hash256,
    pub transactions_root: Hash256,
    pub receipts_root: Hash256,
    pub proposer: Address,
    /// Milliseconds since epoch; must be strictly greater than the parent's.
    pub timestamp: u64,
    pub chain_id: u32,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub base_fee: UInt256,
    pub extra_data: Vec<u8>,
    /// BLS12-381 G2 aggregate signature over the COMMIT quorum (96 bytes once sealed).
    pub bls_aggregate_signature: Vec<u8>,
    /// One bit per validator in the active set at this height, signer/absent.
    pub signer_bitfield: Vec<u8>,
    pub view: u64,
}

impl BlockHeader {
    /// `blockHash = BLAKE3(canonical(header))` (spec.md §8 quantified invariant).
    pub fn hash(&self) -> Hash256 {
        Hash256(crate::hash_api::blake3_hash(&crate::codec::to_bytes_canonical(self)))
    }
}

/// Two signed PREPARE votes for the same (height, view) with conflicting
/// block hashes — slashable equivocation evidence (spec.md §4.8 "Safety").
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct EquivocationEvidence {
    pub height: u64,
    pub view: u64,
    pub offender: Address,
    pub block_hash_a: Hash256,
    pub signature_a: Vec<u8>,
    pub block_hash_b: Hash256,
    pub signature_b: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub slashing_evidence: Vec<EquivocationEvidence>,
}

impl Block {
    pub fn tx_hashes(&self) -> Vec<Hash256> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}
