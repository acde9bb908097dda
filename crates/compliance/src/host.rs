//! The narrow interface the execution engine needs from the compliance
//! gate, kept separate from [`crate::gate`]'s pure functions so the
//! executor can depend on one trait object instead of threading policy
//! storage, attestation sourcing, and nullifier tracking through
//! separately (spec.md §4.7, consumed at "executor entry").

use crate::attestation::{Attestation, AttestationSource, NullifierSet};
use basalt_types::{Address, CompliancePolicy, GenesisConfig, Hash256};
use std::collections::BTreeMap;

pub trait ComplianceHost {
    /// The policy governing transfers of `token`, if any. A `None` return
    /// means the token is ungated and every transfer to it passes freely.
    fn policy_for(&self, token: &Address) -> Option<CompliancePolicy>;
    fn attestation(&self, address: &Address) -> Option<Attestation>;
    fn is_nullifier_consumed(&self, nullifier: &Hash256) -> bool;
    fn mark_nullifier_consumed(&mut self, nullifier: Hash256);
}

/// A host with no registered policies — every transfer passes unchecked.
/// Used where compliance gating is genuinely out of scope (tests, the
/// sandboxed deploy/call paths, which never reach `policy_for`).
#[derive(Default)]
pub struct NullComplianceHost;

impl ComplianceHost for NullComplianceHost {
    fn policy_for(&self, _token: &Address) -> Option<CompliancePolicy> {
        None
    }

    fn attestation(&self, _address: &Address) -> Option<Attestation> {
        None
    }

    fn is_nullifier_consumed(&self, _nullifier: &Hash256) -> bool {
        false
    }

    fn mark_nullifier_consumed(&mut self, _nullifier: Hash256) {}
}

/// Lets any `ComplianceHost` feed [`crate::gate::check_transfer`] directly,
/// without callers wiring up separate attestation/nullifier adapters.
impl AttestationSource for dyn ComplianceHost + '_ {
    fn attestation(&self, address: &Address) -> Option<Attestation> {
        ComplianceHost::attestation(self, address)
    }
}

impl NullifierSet for dyn ComplianceHost + '_ {
    fn is_consumed(&self, nullifier: &Hash256) -> bool {
        self.is_nullifier_consumed(nullifier)
    }

    fn mark_consumed(&mut self, nullifier: Hash256) {
        self.mark_nullifier_consumed(nullifier)
    }
}

/// The compliance host backing a running chain: policies, KYC grants, and
/// sanctions loaded once from [`GenesisConfig`] at startup (spec.md §6
/// genesis "compliance policies" / "initial KYC providers" / "initial
/// sanctions list"), plus the in-memory nullifier set consensus only needs
/// scoped to the current block.
pub struct GenesisComplianceHost {
    policies: BTreeMap<Address, CompliancePolicy>,
    attestations: BTreeMap<Address, Attestation>,
    consumed_nullifiers: std::collections::BTreeSet<Hash256>,
}

impl GenesisComplianceHost {
    /// A later KYC grant for the same party raises its tier rather than
    /// overwriting it outright, so a lower-tier re-attestation can never
    /// downgrade a party already cleared by an earlier, higher-tier one.
    pub fn from_genesis(genesis: &GenesisConfig) -> Self {
        let policies = genesis.compliance_policies.iter().map(|policy| (policy.token, policy.clone())).collect();
        let mut attestations: BTreeMap<Address, Attestation> = BTreeMap::new();
        for grant in &genesis.initial_kyc_grants {
            let entry = attestations.entry(grant.party).or_default();
            entry.kyc_level = entry.kyc_level.max(grant.kyc_level);
        }
        for sanctioned in &genesis.initial_sanctions_list {
            attestations.entry(*sanctioned).or_default().sanctioned = true;
        }
        GenesisComplianceHost { policies, attestations, consumed_nullifiers: std::collections::BTreeSet::new() }
    }
}

impl ComplianceHost for GenesisComplianceHost {
    fn policy_for(&self, token: &Address) -> Option<CompliancePolicy> {
        self.policies.get(token).cloned()
    }

    fn attestation(&self, address: &Address) -> Option<Attestation> {
        self.attestations.get(address).cloned()
    }

    fn is_nullifier_consumed(&self, nullifier: &Hash256) -> bool {
        self.consumed_nullifiers.contains(nullifier)
    }

    fn mark_nullifier_consumed(&mut self, nullifier: Hash256) {
        self.consumed_nullifiers.insert(nullifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::{ChainParams, GenesisKycGrant, GenesisValidator};

    fn genesis_with(policies: Vec<CompliancePolicy>, grants: Vec<GenesisKycGrant>, sanctions: Vec<Address>) -> GenesisConfig {
        GenesisConfig {
            params: ChainParams::default(),
            validators: Vec::<GenesisValidator>::new(),
            accounts: std::collections::BTreeMap::new(),
            compliance_policies: policies,
            initial_kyc_grants: grants,
            initial_sanctions_list: sanctions,
            timestamp: 0,
        }
    }

    #[test]
    fn loads_policy_by_token() {
        let token = Address([7u8; 20]);
        let policy = CompliancePolicy {
            token,
            owner: Address([8u8; 20]),
            checks: vec![],
            zk_schemas: vec![],
            zk_path_enabled: false,
            paused: false,
        };
        let host = GenesisComplianceHost::from_genesis(&genesis_with(vec![policy.clone()], vec![], vec![]));
        assert_eq!(host.policy_for(&token), Some(policy));
        assert_eq!(host.policy_for(&Address([9u8; 20])), None);
    }

    #[test]
    fn kyc_grant_and_sanction_populate_attestation() {
        let kyc_party = Address([1u8; 20]);
        let sanctioned_party = Address([2u8; 20]);
        let grant = GenesisKycGrant { provider: Address([3u8; 20]), party: kyc_party, kyc_level: 2 };
        let host = GenesisComplianceHost::from_genesis(&genesis_with(vec![], vec![grant], vec![sanctioned_party]));

        let kyc_attestation = host.attestation(&kyc_party).expect("attestation recorded");
        assert_eq!(kyc_attestation.kyc_level, 2);
        assert!(!kyc_attestation.sanctioned);

        let sanctioned_attestation = host.attestation(&sanctioned_party).expect("attestation recorded");
        assert!(sanctioned_attestation.sanctioned);

        assert!(host.attestation(&Address([99u8; 20])).is_none());
    }

    #[test]
    fn repeated_kyc_grant_never_downgrades_tier() {
        let party = Address([4u8; 20]);
        let grants = vec![
            GenesisKycGrant { provider: Address([5u8; 20]), party, kyc_level: 3 },
            GenesisKycGrant { provider: Address([6u8; 20]), party, kyc_level: 1 },
        ];
        let host = GenesisComplianceHost::from_genesis(&genesis_with(vec![], grants, vec![]));
        assert_eq!(host.attestation(&party).expect("attestation recorded").kyc_level, 3);
    }
}
