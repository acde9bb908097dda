//! The compliance gate: evaluates a transfer of a policy-governed token
//! against its owning [`CompliancePolicy`], either through the traditional
//! ordered attestation checks or, when the policy allows it, a single
//! verified ZK proof substituting for all of them (spec.md §4.7).

use crate::attestation::{Attestation, AttestationSource, NullifierSet};
use basalt_types::{Address, ComplianceCheck, ComplianceError, ComplianceProof, CompliancePolicy, UInt256};

/// Evaluates both parties to a transfer against the policy in the fixed
/// order spec.md §4.7 mandates — paused, KYC, sanctions, jurisdiction,
/// holding limit, lockup, travel rule — stopping at the first failure.
/// The order is hardcoded here rather than driven by `policy.checks`'
/// iteration order, so a policy author choosing which checks apply cannot
/// also choose which failure is reported first. KYC, sanctions, and
/// jurisdiction are dual-party (either party failing rejects the
/// transfer); holding limit, lockup, and travel rule are evaluated
/// against the transfer itself, not a single party's attestation.
pub fn check_traditional(
    policy: &CompliancePolicy,
    sender: &Address,
    receiver: &Address,
    attestations: &dyn AttestationSource,
    holdings_after_transfer: UInt256,
    current_height: u64,
    transfer_amount: UInt256,
) -> Result<(), ComplianceError> {
    if policy.paused {
        return Err(ComplianceError::Paused);
    }
    let sender_attestation = attestations.attestation(sender).unwrap_or_default();
    let receiver_attestation = attestations.attestation(receiver).unwrap_or_default();

    if has_check(policy, |c| matches!(c, ComplianceCheck::KycRequired))
        && (sender_attestation.kyc_level == 0 || receiver_attestation.kyc_level == 0)
    {
        return Err(ComplianceError::KycMissing);
    }
    if has_check(policy, |c| matches!(c, ComplianceCheck::NotSanctioned))
        && (sender_attestation.sanctioned || receiver_attestation.sanctioned)
    {
        return Err(ComplianceError::Sanctioned);
    }
    if let Some(ComplianceCheck::AllowedJurisdictionsOnly { allowed }) =
        find_check(policy, |c| matches!(c, ComplianceCheck::AllowedJurisdictionsOnly { .. }))
    {
        if !allowed.contains(&sender_attestation.jurisdiction) || !allowed.contains(&receiver_attestation.jurisdiction) {
            return Err(ComplianceError::GeoRestricted);
        }
    }
    if let Some(ComplianceCheck::MaxHoldingBalance { limit }) =
        find_check(policy, |c| matches!(c, ComplianceCheck::MaxHoldingBalance { .. }))
    {
        if holdings_after_transfer.0 > limit.0 {
            return Err(ComplianceError::HoldingLimit);
        }
    }
    if let Some(ComplianceCheck::LockupUntil { unlock_height }) =
        find_check(policy, |c| matches!(c, ComplianceCheck::LockupUntil { .. }))
    {
        if current_height < *unlock_height {
            return Err(ComplianceError::Lockup);
        }
    }
    if let Some(ComplianceCheck::TravelRuleAboveThreshold { threshold }) =
        find_check(policy, |c| matches!(c, ComplianceCheck::TravelRuleAboveThreshold { .. }))
    {
        if transfer_amount.0 > threshold.0 && !sender_attestation.travel_rule_data_present {
            return Err(ComplianceError::TravelRuleMissing);
        }
    }
    Ok(())
}

fn has_check(policy: &CompliancePolicy, pred: impl Fn(&ComplianceCheck) -> bool) -> bool {
    policy.checks.iter().any(pred)
}

fn find_check(policy: &CompliancePolicy, pred: impl Fn(&ComplianceCheck) -> bool) -> Option<&ComplianceCheck> {
    policy.checks.iter().find(|c| pred(c))
}

/// Verifies a ZK proof against the policy's registered schema and enforces
/// nullifier uniqueness. On success, the nullifier is marked consumed and
/// the caller may treat every traditional check as satisfied for this
/// transfer (spec.md §4.7 "nullifier consumed only after verification").
pub fn check_zk(
    policy: &CompliancePolicy,
    proof: &ComplianceProof,
    nullifiers: &mut dyn NullifierSet,
) -> Result<(), ComplianceError> {
    if !policy.accepts_schema(proof.schema_id) {
        return Err(ComplianceError::ProofMissing);
    }
    let schema = policy
        .zk_schemas
        .iter()
        .find(|s| s.schema_id == proof.schema_id)
        .ok_or(ComplianceError::ProofMissing)?;
    let nullifier = proof.nullifier().ok_or_else(|| ComplianceError::ProofInvalid("missing nullifier".into()))?;
    if nullifiers.is_consumed(&nullifier) {
        return Err(ComplianceError::ProofInvalid("nullifier already consumed this block".into()));
    }
    if !basalt_crypto::zk::verify_groth16(&schema.verifying_key, &proof.public_inputs, &proof.proof_bytes) {
        return Err(ComplianceError::ProofInvalid("proof failed verification".into()));
    }
    nullifiers.mark_consumed(nullifier);
    Ok(())
}

/// Evaluates a transfer against its policy: the ZK path if the sender
/// supplied an accepted proof, otherwise the full traditional path.
pub fn check_transfer(
    policy: &CompliancePolicy,
    sender: &Address,
    receiver: &Address,
    proofs: &[ComplianceProof],
    attestations: &dyn AttestationSource,
    nullifiers: &mut dyn NullifierSet,
    holdings_after_transfer: UInt256,
    current_height: u64,
    transfer_amount: UInt256,
) -> Result<(), ComplianceError> {
    if policy.zk_path_enabled {
        if let Some(proof) = proofs.iter().find(|p| policy.accepts_schema(p.schema_id)) {
            return check_zk(policy, proof, nullifiers);
        }
    }
    check_traditional(policy, sender, receiver, attestations, holdings_after_transfer, current_height, transfer_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::ZkSchemaRequirement;
    use std::collections::{BTreeSet, HashMap};

    const SENDER: Address = Address([3u8; 20]);
    const RECEIVER: Address = Address([4u8; 20]);

    struct FixedAttestations(Attestation);
    impl AttestationSource for FixedAttestations {
        fn attestation(&self, _address: &Address) -> Option<Attestation> {
            Some(self.0.clone())
        }
    }

    /// Per-address attestations, for tests that need the sender and
    /// receiver to differ.
    struct PerPartyAttestations(HashMap<Address, Attestation>);
    impl AttestationSource for PerPartyAttestations {
        fn attestation(&self, address: &Address) -> Option<Attestation> {
            self.0.get(address).cloned()
        }
    }

    fn token_policy() -> CompliancePolicy {
        CompliancePolicy {
            token: Address([1u8; 20]),
            owner: Address([2u8; 20]),
            checks: vec![
                ComplianceCheck::KycRequired,
                ComplianceCheck::NotSanctioned,
                ComplianceCheck::AllowedJurisdictionsOnly { allowed: BTreeSet::from([1, 2]) },
            ],
            zk_schemas: vec![],
            zk_path_enabled: false,
            paused: false,
        }
    }

    #[test]
    fn passes_when_every_check_satisfied() {
        let policy = token_policy();
        let attestations = FixedAttestations(Attestation { kyc_level: 1, sanctioned: false, jurisdiction: 1, travel_rule_data_present: false });
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_kyc_rejected_first() {
        let policy = token_policy();
        let attestations = FixedAttestations(Attestation { kyc_level: 0, sanctioned: true, jurisdiction: 99, travel_rule_data_present: false });
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert_eq!(result, Err(ComplianceError::KycMissing));
    }

    #[test]
    fn geo_restricted_when_jurisdiction_not_allowed() {
        let policy = token_policy();
        let attestations = FixedAttestations(Attestation { kyc_level: 1, sanctioned: false, jurisdiction: 99, travel_rule_data_present: false });
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert_eq!(result, Err(ComplianceError::GeoRestricted));
    }

    #[test]
    fn paused_policy_rejects_before_any_other_check() {
        let mut policy = token_policy();
        policy.paused = true;
        // Attestation would pass every other check; only the pause gate
        // should be able to reject it.
        let attestations = FixedAttestations(Attestation { kyc_level: 1, sanctioned: false, jurisdiction: 1, travel_rule_data_present: false });
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert_eq!(result, Err(ComplianceError::Paused));
    }

    #[test]
    fn receiver_missing_kyc_rejects_even_when_sender_is_clean() {
        let policy = token_policy();
        let attestations = PerPartyAttestations(HashMap::from([
            (SENDER, Attestation { kyc_level: 1, sanctioned: false, jurisdiction: 1, travel_rule_data_present: false }),
            (RECEIVER, Attestation { kyc_level: 0, sanctioned: false, jurisdiction: 1, travel_rule_data_present: false }),
        ]));
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert_eq!(result, Err(ComplianceError::KycMissing));
    }

    #[test]
    fn receiver_sanctioned_rejects_even_when_sender_is_clean() {
        let policy = token_policy();
        let attestations = PerPartyAttestations(HashMap::from([
            (SENDER, Attestation { kyc_level: 1, sanctioned: false, jurisdiction: 1, travel_rule_data_present: false }),
            (RECEIVER, Attestation { kyc_level: 1, sanctioned: true, jurisdiction: 1, travel_rule_data_present: false }),
        ]));
        let result = check_traditional(&policy, &SENDER, &RECEIVER, &attestations, UInt256::ZERO, 0, UInt256::ZERO);
        assert_eq!(result, Err(ComplianceError::Sanctioned));
    }

    #[test]
    fn zk_path_requires_registered_schema() {
        let mut policy = token_policy();
        policy.zk_path_enabled = true;
        policy.zk_schemas = vec![ZkSchemaRequirement { schema_id: 7, verifying_key: vec![] }];
        let proof = ComplianceProof { schema_id: 99, proof_bytes: vec![], public_inputs: vec![0u8; 32] };
        let mut nullifiers = crate::attestation::InMemoryNullifierSet::default();
        let result = check_zk(&policy, &proof, &mut nullifiers);
        assert_eq!(result, Err(ComplianceError::ProofMissing));
    }
}
