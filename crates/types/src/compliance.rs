//! Compliance policy configuration (spec.md §3 "CompliancePolicy", §4.7).

use crate::primitives::{Address, UInt256};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single regulator-defined rule a transfer of a policy-gated token must
/// satisfy before the execution engine will apply it.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum ComplianceCheck {
    KycRequired,
    NotSanctioned,
    AllowedJurisdictionsOnly { allowed: BTreeSet<u32> },
    MaxHoldingBalance { limit: UInt256 },
    LockupUntil { unlock_height: u64 },
    TravelRuleAboveThreshold { threshold: UInt256 },
}

/// A ZK schema the policy will accept as an alternative to the traditional
/// attestation path, identified by the verifying key it was registered with.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ZkSchemaRequirement {
    pub schema_id: u32,
    pub verifying_key: Vec<u8>,
}

/// Per-token compliance configuration, owned by the token's governance
/// address and mutable only by that address (spec.md §4.7 "Policy
/// ownership").
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct CompliancePolicy {
    pub token: Address,
    pub owner: Address,
    pub checks: Vec<ComplianceCheck>,
    pub zk_schemas: Vec<ZkSchemaRequirement>,
    /// When true, a satisfied ZK proof may substitute for every traditional
    /// check in `checks` for that transfer.
    pub zk_path_enabled: bool,
    /// Governance-set circuit breaker: while true, every transfer of this
    /// token is rejected before any other check runs (spec.md §4.7).
    pub paused: bool,
}

impl CompliancePolicy {
    pub fn accepts_schema(&self, schema_id: u32) -> bool {
        self.zk_path_enabled && self.zk_schemas.iter().any(|s| s.schema_id == schema_id)
    }
}
