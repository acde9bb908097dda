//! Unified traits over the concrete algorithms `basalt-crypto` implements,
//! so higher crates depend on capability rather than on a specific library.

use basalt_types::Hash256;

pub trait Hasher {
    fn hash(bytes: &[u8]) -> Hash256;
}

pub trait Signer {
    type PublicKey;
    type Signature;

    fn sign(&self, message: &[u8]) -> Self::Signature;
    fn public_key(&self) -> Self::PublicKey;
}

pub trait SignatureVerifier {
    type PublicKey;
    type Signature;

    fn verify(public_key: &Self::PublicKey, message: &[u8], signature: &Self::Signature) -> bool;
}

/// Aggregatable signature scheme, used by the consensus engine to combine a
/// quorum of PREPARE/COMMIT votes into one signature plus a signer bitfield.
pub trait AggregateSignatureScheme: SignatureVerifier {
    fn aggregate(signatures: &[Self::Signature]) -> Option<Self::Signature>;
    fn aggregate_public_keys(keys: &[Self::PublicKey]) -> Option<Self::PublicKey>;
}

/// A succinct-proof verifier, implemented over Groth16/BLS12-381 by
/// `basalt-crypto` for the compliance gate's ZK path (spec.md §4.7).
pub trait Verifier {
    type VerifyingKey;
    type Proof;

    fn verify(
        verifying_key: &Self::VerifyingKey,
        public_inputs: &[u8],
        proof: &Self::Proof,
    ) -> bool;
}
