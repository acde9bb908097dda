//! The closed error-code surface published as the node's ABI (spec.md §6),
//! plus the richer Rust error enums used internally. Receipts and rejection
//! responses only ever carry an `ErrorCode` — never a formatted string that
//! could leak internal state.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A closed, numeric set of error codes. Stable across versions: existing
/// discriminants are never renumbered, only appended to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum ErrorCode {
    InvalidSignature = 0,
    NonceTooLow = 1,
    NonceTooHigh = 2,
    InsufficientBalance = 3,
    GasLimitExceeded = 4,
    DataTooLarge = 5,
    InvalidChainId = 6,
    ContractNotFound = 7,
    OutOfGas = 8,
    StackOverflow = 9,
    Revert = 10,
    SandboxViolation = 11,
    ComplianceKycMissing = 12,
    ComplianceSanctioned = 13,
    ComplianceGeoRestricted = 14,
    ComplianceHoldingLimit = 15,
    ComplianceLockup = 16,
    ComplianceProofInvalid = 17,
    ComplianceProofMissing = 18,
    StakingNotAvailable = 19,
    StakeBelowMinimum = 20,
    ValidatorNotRegistered = 21,
    NonceOverflow = 22,
    InvalidParentHash = 23,
    InvalidBlockNumber = 24,
    InvalidTimestamp = 25,
    ComplianceTravelRuleMissing = 26,
    ComplianceTokenPaused = 27,
}

/// Pure, stateless-against-policy validation rejections (spec.md §4.4).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid chain id")]
    InvalidChainId,
    #[error("nonce too low")]
    NonceTooLow,
    #[error("nonce too high")]
    NonceTooHigh,
    #[error("gas limit {got} exceeds block gas limit {max}")]
    GasLimitExceedsBlock { got: u64, max: u64 },
    #[error("gas limit {got} below intrinsic cost {min}")]
    GasLimitBelowIntrinsic { got: u64, min: u64 },
    #[error("fee field invalid")]
    InvalidFee,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("data length {got} exceeds cap {max}")]
    DataTooLarge { got: usize, max: usize },
    #[error("compliance rejection: {0:?}")]
    Compliance(ErrorCode),
}

impl TxError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TxError::InvalidSignature => ErrorCode::InvalidSignature,
            TxError::InvalidChainId => ErrorCode::InvalidChainId,
            TxError::NonceTooLow => ErrorCode::NonceTooLow,
            TxError::NonceTooHigh => ErrorCode::NonceTooHigh,
            TxError::GasLimitExceedsBlock { .. } => ErrorCode::GasLimitExceeded,
            TxError::GasLimitBelowIntrinsic { .. } => ErrorCode::GasLimitExceeded,
            TxError::InvalidFee => ErrorCode::InvalidSignature,
            TxError::InsufficientBalance => ErrorCode::InsufficientBalance,
            TxError::DataTooLarge { .. } => ErrorCode::DataTooLarge,
            TxError::Compliance(c) => *c,
        }
    }
}

/// Errors surfaced by the execution engine. These never abort the block;
/// they become a failed receipt with the matching `ErrorCode`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("contract not found")]
    ContractNotFound,
    #[error("out of gas")]
    OutOfGas,
    #[error("stack overflow")]
    StackOverflow,
    #[error("reverted: {0}")]
    Revert(String),
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),
    #[error("staking not available")]
    StakingNotAvailable,
    #[error("stake below minimum")]
    StakeBelowMinimum,
    #[error("validator not registered")]
    ValidatorNotRegistered,
    #[error("nonce overflow")]
    NonceOverflow,
    #[error("compliance check failed: {0}")]
    ComplianceRejected(#[from] ComplianceError),
}

impl ExecError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExecError::ContractNotFound => ErrorCode::ContractNotFound,
            ExecError::OutOfGas => ErrorCode::OutOfGas,
            ExecError::StackOverflow => ErrorCode::StackOverflow,
            ExecError::Revert(_) => ErrorCode::Revert,
            ExecError::SandboxViolation(_) => ErrorCode::SandboxViolation,
            ExecError::StakingNotAvailable => ErrorCode::StakingNotAvailable,
            ExecError::StakeBelowMinimum => ErrorCode::StakeBelowMinimum,
            ExecError::ValidatorNotRegistered => ErrorCode::ValidatorNotRegistered,
            ExecError::NonceOverflow => ErrorCode::NonceOverflow,
            ExecError::ComplianceRejected(inner) => inner.code(),
        }
    }

    /// Whether this is an "abnormal termination" (full gas charged) as
    /// opposed to a clean revert (actual consumption charged). See
    /// SPEC_FULL.md §6 open-question decision (i).
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExecError::Revert(_))
    }
}

/// State-trie and state-db level failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("key not found")]
    KeyNotFound,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("proof verification failed")]
    InvalidProof,
}

/// Compliance gate rejections (spec.md §4.7).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ComplianceError {
    #[error("token paused")]
    Paused,
    #[error("kyc level missing")]
    KycMissing,
    #[error("sanctioned party")]
    Sanctioned,
    #[error("geo restricted")]
    GeoRestricted,
    #[error("holding limit exceeded")]
    HoldingLimit,
    #[error("lockup in effect")]
    Lockup,
    #[error("travel rule data missing")]
    TravelRuleMissing,
    #[error("proof missing for required schema")]
    ProofMissing,
    #[error("proof invalid: {0}")]
    ProofInvalid(String),
}

impl ComplianceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ComplianceError::Paused => ErrorCode::ComplianceTokenPaused,
            ComplianceError::KycMissing => ErrorCode::ComplianceKycMissing,
            ComplianceError::Sanctioned => ErrorCode::ComplianceSanctioned,
            ComplianceError::GeoRestricted => ErrorCode::ComplianceGeoRestricted,
            ComplianceError::HoldingLimit => ErrorCode::ComplianceHoldingLimit,
            ComplianceError::Lockup => ErrorCode::ComplianceLockup,
            ComplianceError::TravelRuleMissing => ErrorCode::ComplianceTravelRuleMissing,
            ComplianceError::ProofMissing => ErrorCode::ComplianceProofMissing,
            ComplianceError::ProofInvalid(_) => ErrorCode::ComplianceProofInvalid,
        }
    }
}

/// Chain-manager append-invariant and consensus-safety failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("invalid parent hash")]
    InvalidParentHash,
    #[error("invalid block number")]
    InvalidBlockNumber,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("block verification failed: {0}")]
    BlockVerificationFailed(String),
    #[error("expected leader {expected:?}, got {got:?}")]
    InvalidLeader { expected: crate::Address, got: crate::Address },
    #[error("state access error: {0}")]
    StateAccess(#[from] StateError),
    #[error("no quorum")]
    NoQuorum,
}

impl ConsensusError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ConsensusError::InvalidParentHash => Some(ErrorCode::InvalidParentHash),
            ConsensusError::InvalidBlockNumber => Some(ErrorCode::InvalidBlockNumber),
            ConsensusError::InvalidTimestamp => Some(ErrorCode::InvalidTimestamp),
            _ => None,
        }
    }
}
