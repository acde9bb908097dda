//! BLS12-381 signing, aggregation, and verification for consensus votes
//! (spec.md §7 "BLS aggregate signature with signer bitfield").
//!
//! Uses the `min_pk` variant: public keys live in G1 (48 bytes), signatures
//! in G2 (96 bytes) — signatures are larger but verification, which happens
//! far more often than signing, is cheaper.

use crate::error::CryptoError;
use blst::min_pk::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;

/// Domain separation tag, unique to this chain's consensus signatures.
const DST: &[u8] = b"BASALT_CONSENSUS_BLS_SIG_V1";

pub struct BlsKeyPair(SecretKey);

impl BlsKeyPair {
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        SecretKey::key_gen(seed, &[])
            .map(BlsKeyPair)
            .map_err(|_| CryptoError::InvalidSignatureEncoding)
    }

    pub fn public_key_bytes(&self) -> [u8; 48] {
        self.0.sk_to_pk().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 96] {
        self.0.sign(message, DST, &[]).to_bytes()
    }
}

pub fn verify(public_key_bytes: &[u8], message: &[u8], signature_bytes: &[u8]) -> bool {
    let (Ok(pk), Ok(sig)) = (
        PublicKey::from_bytes(public_key_bytes),
        Signature::from_bytes(signature_bytes),
    ) else {
        return false;
    };
    sig.verify(true, message, DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
}

/// Aggregates per-validator signatures over a single shared message (the
/// block hash at a given phase) into one G2 point.
pub fn aggregate_signatures(signatures: &[[u8; 96]]) -> Result<[u8; 96], CryptoError> {
    let parsed: Result<Vec<Signature>, _> = signatures.iter().map(|s| Signature::from_bytes(s)).collect();
    let parsed = parsed.map_err(|_| CryptoError::InvalidSignatureEncoding)?;
    let refs: Vec<&Signature> = parsed.iter().collect();
    let agg = AggregateSignature::aggregate(&refs, true)
        .map_err(|e| CryptoError::AggregationFailed(format!("{e:?}")))?;
    Ok(agg.to_signature().to_bytes())
}

pub fn aggregate_public_keys(public_keys: &[[u8; 48]]) -> Result<[u8; 48], CryptoError> {
    let parsed: Result<Vec<PublicKey>, _> =
        public_keys.iter().map(|p| PublicKey::from_bytes(p)).collect();
    let parsed = parsed.map_err(|_| CryptoError::InvalidPublicKeyEncoding)?;
    let refs: Vec<&PublicKey> = parsed.iter().collect();
    let agg = AggregatePublicKey::aggregate(&refs, true)
        .map_err(|e| CryptoError::AggregationFailed(format!("{e:?}")))?;
    Ok(agg.to_public_key().to_bytes())
}

/// Verifies an aggregate signature against a single message signed by every
/// key in `public_keys` (the common case in a quorum certificate, where
/// every signer attests to the same block hash).
pub fn verify_aggregate(public_keys: &[[u8; 48]], message: &[u8], agg_sig: &[u8]) -> bool {
    let Ok(agg_pk_bytes) = aggregate_public_keys(public_keys) else {
        return false;
    };
    verify(&agg_pk_bytes, message, agg_sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = BlsKeyPair::from_seed(&[3u8; 32]).unwrap();
        let msg = b"block hash bytes";
        let sig = kp.sign(msg);
        assert!(verify(&kp.public_key_bytes(), msg, &sig));
    }

    #[test]
    fn aggregate_quorum_verifies() {
        let kps: Vec<BlsKeyPair> = (0u8..4)
            .map(|i| BlsKeyPair::from_seed(&[i + 1; 32]).unwrap())
            .collect();
        let msg = b"quorum message";
        let sigs: Vec<[u8; 96]> = kps.iter().map(|kp| kp.sign(msg)).collect();
        let pks: Vec<[u8; 48]> = kps.iter().map(|kp| kp.public_key_bytes()).collect();
        let agg = aggregate_signatures(&sigs).unwrap();
        assert!(verify_aggregate(&pks, msg, &agg));
    }
}
