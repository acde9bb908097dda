//! Ed25519 signing and verification, used for transaction authentication
//! (spec.md §4.4 precondition 1 "signature valid").

use crate::error::CryptoError;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

pub struct Ed25519KeyPair(SigningKey);

impl Ed25519KeyPair {
    pub fn generate<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        Ed25519KeyPair(SigningKey::generate(rng))
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Ed25519KeyPair(SigningKey::from_bytes(bytes))
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.0.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }
}

/// Verifies an Ed25519 signature over `message`, returning `false` rather
/// than an error on any malformed input — verification is a boolean gate on
/// a transaction's admission, never a fatal path.
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

pub fn try_verify(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), CryptoError> {
    if verify(public_key, message, signature) {
        Ok(())
    } else {
        Err(CryptoError::VerificationFailed)
    }
}
