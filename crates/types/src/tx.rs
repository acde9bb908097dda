//! Transaction model, canonical signing payload, and receipts (spec.md §3, §6).

use crate::primitives::{Address, Hash256, UInt256};
use crate::error::ErrorCode;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum TxType {
    Transfer,
    ContractDeploy,
    ContractCall,
    ValidatorRegister,
    ValidatorExit,
    StakeDeposit,
    StakeWithdraw,
    System,
}

impl TxType {
    /// Per-type intrinsic base gas cost (spec.md §4.4 precondition 4).
    pub fn intrinsic_gas(&self) -> u64 {
        match self {
            TxType::Transfer => 21_000,
            TxType::ContractDeploy => 53_000,
            TxType::ContractCall => 21_000,
            TxType::ValidatorRegister | TxType::ValidatorExit => 30_000,
            TxType::StakeDeposit | TxType::StakeWithdraw => 25_000,
            TxType::System => 0,
        }
    }

    /// Per-type data length cap in bytes (spec.md §4.4 precondition 7).
    pub fn data_cap(&self) -> usize {
        match self {
            TxType::ContractDeploy => 2 * 1024 * 1024,
            TxType::ContractCall => 128 * 1024,
            _ => 0,
        }
    }
}

/// Either a legacy single gas price or an EIP-1559 fee pair. Never both.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum FeeFields {
    Legacy { gas_price: UInt256 },
    Eip1559 { max_fee_per_gas: UInt256, max_priority_fee_per_gas: UInt256 },
}

impl FeeFields {
    /// The maximum price the sender could possibly pay per unit of gas —
    /// used for the balance precheck (spec.md §4.4 precondition 6).
    pub fn max_effective_price(&self) -> UInt256 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// `effectiveGasPrice` per spec.md Glossary: `gasPrice` under legacy,
    /// `min(maxFeePerGas, baseFee + maxPriorityFeePerGas)` under EIP-1559.
    pub fn effective_gas_price(&self, base_fee: UInt256) -> UInt256 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => {
                let tip_plus_base = base_fee.saturating_add(max_priority_fee_per_gas);
                if tip_plus_base.0 < max_fee_per_gas.0 {
                    tip_plus_base
                } else {
                    *max_fee_per_gas
                }
            }
        }
    }
}

/// A single required-proof slot satisfying one compliance-policy ZK
/// requirement (spec.md §4.7 "ZK proof path").
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ComplianceProof {
    pub schema_id: u32,
    /// Groth16 proof bytes, always exactly 192 bytes when well-formed.
    pub proof_bytes: Vec<u8>,
    /// Public inputs, a positive multiple of 32 bytes. The first 32-byte
    /// chunk is reserved as the proof's nullifier (see DESIGN.md).
    pub public_inputs: Vec<u8>,
}

impl ComplianceProof {
    pub fn nullifier(&self) -> Option<Hash256> {
        self.public_inputs.get(0..32).and_then(Hash256::from_slice)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_type: TxType,
    pub nonce: u64,
    pub sender: Address,
    pub to: Address,
    pub value: UInt256,
    pub gas_limit: u64,
    pub fee: FeeFields,
    pub data: Vec<u8>,
    pub priority: bool,
    pub chain_id: u32,
    pub compliance_proofs: Vec<ComplianceProof>,
    pub sender_public_key: [u8; 32],
    #[serde(with = "signature_serde")]
    pub signature: [u8; 64],
}

/// serde support for `[u8; 64]`, which serde's derive does not cover
/// natively (only arrays up to 32 elements implement `Serialize`/`Deserialize`).
mod signature_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        value.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        <[u8; 64]>::try_from(bytes.as_slice())
            .map_err(|_| D::Error::custom("expected 64 bytes for signature"))
    }
}

impl Transaction {
    /// The canonical bytes that are signed: every field except the
    /// signature itself (spec.md §3 Transaction invariant). The public key
    /// is included because the signature must bind the declared sender's
    /// key material too.
    pub fn signing_payload(&self) -> Vec<u8> {
        #[derive(Encode)]
        struct SignedPart<'a> {
            tx_type: TxType,
            nonce: u64,
            sender: Address,
            to: Address,
            value: UInt256,
            gas_limit: u64,
            fee: &'a FeeFields,
            data: &'a [u8],
            priority: bool,
            chain_id: u32,
            compliance_proofs: &'a [ComplianceProof],
            sender_public_key: [u8; 32],
        }
        let part = SignedPart {
            tx_type: self.tx_type,
            nonce: self.nonce,
            sender: self.sender,
            to: self.to,
            value: self.value,
            gas_limit: self.gas_limit,
            fee: &self.fee,
            data: &self.data,
            priority: self.priority,
            chain_id: self.chain_id,
            compliance_proofs: &self.compliance_proofs,
            sender_public_key: self.sender_public_key,
        };
        crate::codec::to_bytes_canonical(&part)
    }

    pub fn hash(&self) -> Hash256 {
        Hash256(crate::hash_api::blake3_hash(&crate::codec::to_bytes_canonical(self)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Log {
    pub contract: Address,
    pub signature: Hash256,
    pub topics: Vec<Hash256>,
    pub data: Vec<u8>,
}

/// The maximum number of indexed topics a single log entry may carry
/// (spec.md §3 "up to N indexed topics").
pub const MAX_LOG_TOPICS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: Hash256,
    /// Zero until back-patched by the block builder at seal time.
    pub block_hash: Hash256,
    pub block_number: u64,
    pub index: u32,
    pub sender: Address,
    pub to: Address,
    pub success: bool,
    pub gas_used: u64,
    pub error_code: Option<ErrorCode>,
    pub events: Vec<Log>,
    pub post_state_root: Hash256,
    pub effective_gas_price: UInt256,
}

impl Receipt {
    pub fn hash(&self) -> Hash256 {
        Hash256(crate::hash_api::blake3_hash(&crate::codec::to_bytes_canonical(self)))
    }
}

/// A flattened view of per-token compliance policy state, keyed by token
/// address in consensus state (not part of the wire Transaction itself).
pub type ComplianceProofsBySchema = BTreeMap<u32, ComplianceProof>;
