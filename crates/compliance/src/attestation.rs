//! Off-chain attestation data a compliance policy checks a party against.
//! Sourced from wherever the node's operator feeds in KYC/sanctions data;
//! this crate only consumes it through the [`AttestationSource`] trait.

use basalt_types::Address;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attestation {
    pub kyc_level: u8,
    pub sanctioned: bool,
    pub jurisdiction: u32,
    pub travel_rule_data_present: bool,
}

pub trait AttestationSource {
    fn attestation(&self, address: &Address) -> Option<Attestation>;
}

/// Tracks ZK proof nullifiers already consumed, scoped to the current
/// block, so the same proof cannot be replayed twice in one block (spec.md
/// §4.7 "nullifier uniqueness per block").
pub trait NullifierSet {
    fn is_consumed(&self, nullifier: &basalt_types::Hash256) -> bool;
    fn mark_consumed(&mut self, nullifier: basalt_types::Hash256);
}

#[derive(Default, Debug)]
pub struct InMemoryNullifierSet(std::collections::BTreeSet<basalt_types::Hash256>);

impl NullifierSet for InMemoryNullifierSet {
    fn is_consumed(&self, nullifier: &basalt_types::Hash256) -> bool {
        self.0.contains(nullifier)
    }

    fn mark_consumed(&mut self, nullifier: basalt_types::Hash256) {
        self.0.insert(nullifier);
    }
}
