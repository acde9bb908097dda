//! Genesis and chain parameter configuration (SPEC_FULL.md §3.3, spec.md §6).
//!
//! Loaded from TOML at node startup, the same way the teacher's validator
//! configuration is loaded: `serde` derive plus `toml::from_str`.

use crate::account::AccountState;
use crate::compliance::CompliancePolicy;
use crate::primitives::{Address, UInt256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain_id: u32,
    pub block_gas_limit: u64,
    pub initial_base_fee: UInt256,
    /// Maximum fractional base-fee move per block, in basis points of 10_000
    /// (spec.md §6 "bounded ±12.5% per block").
    pub base_fee_max_change_bps: u32,
    pub min_block_interval_ms: u64,
    pub view_timeout_initial_ms: u64,
    pub view_timeout_max_ms: u64,
    pub retained_bodies: u64,
    pub mempool_per_sender_limit: usize,
    pub mempool_global_limit: usize,
    pub min_validator_stake: UInt256,
    /// Blocks an exited validator's stake remains locked before `StakeWithdraw`
    /// may pay it out (spec.md §4.5 staking transactions).
    pub unbonding_period_blocks: u64,
    /// Default activation delay, in blocks, for a validator BLS key
    /// rotation request (spec.md §6 genesis "key rotation epoch"), passed
    /// as `activation_window` to `basalt_consensus::key_rotation::request_rotation`.
    pub key_rotation_epoch_blocks: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        ChainParams {
            chain_id: 1,
            block_gas_limit: 30_000_000,
            initial_base_fee: UInt256::from_u64(1_000_000_000),
            base_fee_max_change_bps: 1_250,
            min_block_interval_ms: 1_000,
            view_timeout_initial_ms: 2_000,
            view_timeout_max_ms: 60_000,
            retained_bodies: 128,
            mempool_per_sender_limit: 64,
            mempool_global_limit: 50_000,
            min_validator_stake: UInt256::from_u64(100_000),
            unbonding_period_blocks: 604_800,
            key_rotation_epoch_blocks: 201_600,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub address: Address,
    pub bls_public_key: Vec<u8>,
    pub stake: UInt256,
}

/// A genesis KYC grant: a provider attesting a party's KYC tier from block
/// zero, before any on-chain attestation transaction has run (spec.md §6
/// genesis "initial KYC providers").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisKycGrant {
    pub provider: Address,
    pub party: Address,
    pub kyc_level: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub params: ChainParams,
    pub validators: Vec<GenesisValidator>,
    pub accounts: BTreeMap<Address, AccountState>,
    pub compliance_policies: Vec<CompliancePolicy>,
    /// Genesis "initial KYC providers" (spec.md §6): KYC tiers pre-granted
    /// at block zero, before any attestation transaction runs.
    pub initial_kyc_grants: Vec<GenesisKycGrant>,
    /// Genesis "initial sanctions list" (spec.md §6): addresses sanctioned
    /// from block zero.
    pub initial_sanctions_list: Vec<Address>,
    pub timestamp: u64,
}

impl GenesisConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
