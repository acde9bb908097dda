//! Groth16 proof verification over BLS12-381, used by the compliance gate's
//! ZK path (spec.md §4.7 "ZK proof path").

use crate::error::CryptoError;
use ark_bls12_381::{Bls12_381, Fr};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;

/// Splits a raw public-input byte string into field elements, 32 bytes each,
/// big-endian, matching `ComplianceProof::public_inputs` layout.
fn decode_public_inputs(bytes: &[u8]) -> Result<Vec<Fr>, CryptoError> {
    if bytes.is_empty() || bytes.len() % 32 != 0 {
        return Err(CryptoError::InvalidProofEncoding);
    }
    Ok(bytes
        .chunks_exact(32)
        .map(Fr::from_be_bytes_mod_order)
        .collect())
}

/// Verifies a 192-byte Groth16 proof against a compressed verifying key and
/// a flat public-input byte string. Any malformed input verifies as `false`
/// rather than propagating an error — the compliance gate treats a bad proof
/// exactly like a missing one.
pub fn verify_groth16(verifying_key_bytes: &[u8], public_inputs: &[u8], proof_bytes: &[u8]) -> bool {
    let Ok(vk) = VerifyingKey::<Bls12_381>::deserialize_compressed(verifying_key_bytes) else {
        return false;
    };
    let Ok(proof) = Proof::<Bls12_381>::deserialize_compressed(proof_bytes) else {
        return false;
    };
    let Ok(inputs) = decode_public_inputs(public_inputs) else {
        return false;
    };
    let pvk = ark_groth16::prepare_verifying_key(&vk);
    Groth16::<Bls12_381>::verify_proof(&pvk, &proof, &inputs)
        .unwrap_or(false)
}

/// A thin wrapper so `basalt-api::crypto::Verifier` has a concrete
/// zero-sized implementor to bind the associated types to.
pub struct Groth16Bls381Verifier;

impl basalt_api::crypto::Verifier for Groth16Bls381Verifier {
    type VerifyingKey = Vec<u8>;
    type Proof = Vec<u8>;

    fn verify(verifying_key: &Vec<u8>, public_inputs: &[u8], proof: &Vec<u8>) -> bool {
        verify_groth16(verifying_key, public_inputs, proof)
    }
}
