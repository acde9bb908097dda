//! Validator BLS key rotation (spec.md §4.8 "Key rotation"): a rotation is
//! authorized by signatures from both the outgoing and incoming keys, takes
//! effect only after an activation delay, and the outgoing key is rejected
//! once activation has passed.

use crate::validator::ValidatorSet;
use basalt_types::{Address, ConsensusError};

fn rotation_preimage(validator: &Address, new_key: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(20 + new_key.len());
    preimage.extend_from_slice(validator.as_ref());
    preimage.extend_from_slice(new_key);
    preimage
}

/// A rotation request, queued until `activation_height`.
#[derive(Clone, Debug)]
pub struct PendingRotation {
    pub validator: Address,
    pub new_key: Vec<u8>,
    pub activation_height: u64,
}

/// Verifies a rotation request is co-signed by both the current key
/// (`old_key`) and the proposed key (`new_key`) over the same preimage,
/// and schedules it to activate `activation_window` blocks from now.
pub fn request_rotation(
    validator: Address,
    old_key: &[u8],
    new_key: &[u8],
    old_signature: &[u8; 96],
    new_signature: &[u8; 96],
    current_height: u64,
    activation_window: u64,
) -> Result<PendingRotation, ConsensusError> {
    let preimage = rotation_preimage(&validator, new_key);
    if !basalt_crypto::bls::verify(old_key, &preimage, old_signature) {
        return Err(ConsensusError::BlockVerificationFailed("rotation not signed by outgoing key".into()));
    }
    if !basalt_crypto::bls::verify(new_key, &preimage, new_signature) {
        return Err(ConsensusError::BlockVerificationFailed("rotation not signed by incoming key".into()));
    }
    Ok(PendingRotation {
        validator,
        new_key: new_key.to_vec(),
        activation_height: current_height.saturating_add(activation_window),
    })
}

/// Swaps in every rotation whose activation height has arrived, rejecting
/// the old key from that point on (the swap itself is the rejection: the
/// set no longer has the old key on file for this validator).
pub fn activate_due_rotations(set: &mut ValidatorSet, pending: &mut Vec<PendingRotation>, height: u64) {
    pending.retain(|rotation| {
        if height < rotation.activation_height {
            return true;
        }
        if let Some(validator) = set.get_mut(&rotation.validator) {
            validator.bls_public_key = rotation.new_key.clone();
        }
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ReputationComponents, Validator};
    use basalt_crypto::bls::BlsKeyPair;
    use basalt_types::UInt256;

    #[test]
    fn rotation_requires_both_signatures_and_activates_after_window() {
        let validator_addr = Address([9u8; 20]);
        let old_kp = BlsKeyPair::from_seed(&[1u8; 32]).unwrap();
        let new_kp = BlsKeyPair::from_seed(&[2u8; 32]).unwrap();
        let old_key = old_kp.public_key_bytes();
        let new_key = new_kp.public_key_bytes();
        let preimage = rotation_preimage(&validator_addr, &new_key);
        let old_sig = old_kp.sign(&preimage);
        let new_sig = new_kp.sign(&preimage);

        let pending = request_rotation(validator_addr, &old_key, &new_key, &old_sig, &new_sig, 100, 50).unwrap();
        assert_eq!(pending.activation_height, 150);

        let mut set = ValidatorSet::new(vec![Validator {
            address: validator_addr,
            bls_public_key: old_key.to_vec(),
            stake: UInt256::from_u64(1_000),
            reputation: ReputationComponents::perfect(),
        }]);
        let mut queue = vec![pending];
        activate_due_rotations(&mut set, &mut queue, 140);
        assert_eq!(set.get(&validator_addr).unwrap().bls_public_key, old_key.to_vec());
        assert!(!queue.is_empty());

        activate_due_rotations(&mut set, &mut queue, 150);
        assert_eq!(set.get(&validator_addr).unwrap().bls_public_key, new_key.to_vec());
        assert!(queue.is_empty());
    }

    #[test]
    fn rotation_rejected_without_outgoing_key_signature() {
        let validator_addr = Address([9u8; 20]);
        let old_kp = BlsKeyPair::from_seed(&[1u8; 32]).unwrap();
        let new_kp = BlsKeyPair::from_seed(&[2u8; 32]).unwrap();
        let wrong_sig = new_kp.sign(b"wrong preimage");
        let result = request_rotation(
            validator_addr,
            &old_kp.public_key_bytes(),
            &new_kp.public_key_bytes(),
            &wrong_sig,
            &new_kp.sign(&rotation_preimage(&validator_addr, &new_kp.public_key_bytes())),
            100,
            50,
        );
        assert!(result.is_err());
    }
}
