//! Core wire types, canonical codec, and the closed error surface shared by
//! every Basalt crate. Nothing in this crate touches I/O, cryptography, or
//! storage — it is the vocabulary the rest of the workspace is written in.

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

pub mod account;
pub mod block;
pub mod codec;
pub mod compliance;
pub mod error;
pub mod genesis;
pub mod hash_api;
pub mod merkle;
pub mod primitives;
pub mod tx;

pub use account::{AccountKind, AccountState};
pub use block::{Block, BlockHeader, EquivocationEvidence, MAX_EXTRA_DATA_LEN};
pub use compliance::{ComplianceCheck, CompliancePolicy, ZkSchemaRequirement};
pub use error::{ComplianceError, ConsensusError, ErrorCode, ExecError, StateError, TxError};
pub use genesis::{ChainParams, GenesisConfig, GenesisKycGrant, GenesisValidator};
pub use merkle::merkle_root;
pub use primitives::{Address, Hash256, UInt256};
pub use tx::{
    ComplianceProof, ComplianceProofsBySchema, FeeFields, Log, Receipt, Transaction, TxType,
    MAX_LOG_TOPICS,
};
