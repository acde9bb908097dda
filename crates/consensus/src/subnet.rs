//! Subnet anchoring (spec.md §4.8 "Subnets"): a subnet's own BFT quorum is
//! periodically anchored into the mainnet as a transaction carrying the
//! subnet block hash and the aggregate proof of that quorum.

use crate::validator::ValidatorSet;
use basalt_types::{Address, ConsensusError, Hash256};

/// A subnet anchor, ready to be carried by a mainnet transaction.
#[derive(Clone, Debug)]
pub struct SubnetAnchor {
    pub subnet_id: u32,
    pub subnet_height: u64,
    pub subnet_block_hash: Hash256,
    pub aggregate_signature: [u8; 96],
    pub signer_addresses: Vec<Address>,
}

fn anchor_preimage(anchor: &SubnetAnchor) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(4 + 8 + 32);
    preimage.extend_from_slice(&anchor.subnet_id.to_be_bytes());
    preimage.extend_from_slice(&anchor.subnet_height.to_be_bytes());
    preimage.extend_from_slice(anchor.subnet_block_hash.as_ref());
    preimage
}

/// The cadence an anchor is actually expected at: the spec names two
/// configured intervals and anchors at whichever is tighter.
pub fn effective_anchor_cadence(anchor_every: u64, anchor_interval: u64) -> u64 {
    anchor_every.min(anchor_interval).max(1)
}

pub fn is_anchor_due(subnet_height: u64, last_anchor_height: u64, anchor_every: u64, anchor_interval: u64) -> bool {
    subnet_height >= last_anchor_height + effective_anchor_cadence(anchor_every, anchor_interval)
}

/// Verifies the anchor's aggregate signature against the subnet's own
/// validator set and that the signer weight crosses that subnet's quorum.
pub fn verify_anchor(anchor: &SubnetAnchor, subnet_validators: &ValidatorSet) -> Result<(), ConsensusError> {
    let signer_weight: u128 = anchor
        .signer_addresses
        .iter()
        .filter_map(|addr| subnet_validators.get(addr))
        .map(|v| v.weight())
        .sum();
    if signer_weight < subnet_validators.quorum_threshold() {
        return Err(ConsensusError::NoQuorum);
    }

    let mut public_keys = Vec::with_capacity(anchor.signer_addresses.len());
    for addr in &anchor.signer_addresses {
        let validator = subnet_validators.get(addr).ok_or(ConsensusError::NoQuorum)?;
        let key = <[u8; 48]>::try_from(validator.bls_public_key.as_slice())
            .map_err(|_| ConsensusError::BlockVerificationFailed("malformed subnet validator key".into()))?;
        public_keys.push(key);
    }

    let preimage = anchor_preimage(anchor);
    if !basalt_crypto::bls::verify_aggregate(&public_keys, &preimage, &anchor.aggregate_signature) {
        return Err(ConsensusError::BlockVerificationFailed("subnet anchor aggregate invalid".into()));
    }
    Ok(())
}
