//! Hash functions used across the consensus core. BLAKE3 is canonical for
//! every state/wire hash; Keccak-256 is used only for address derivation
//! from an Ed25519 public key, matching the spec's chosen convention.

use basalt_types::{Address, Hash256};
use sha3::{Digest, Keccak256};

pub fn blake3(bytes: &[u8]) -> Hash256 {
    Hash256(*blake3::hash(bytes).as_bytes())
}

/// Derives a 20-byte address as the last 20 bytes of `Keccak256(pubkey)`.
pub fn address_from_public_key(pubkey: &[u8]) -> Address {
    let digest = Keccak256::digest(pubkey);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..32]);
    Address(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_is_deterministic() {
        assert_eq!(blake3(b"basalt"), blake3(b"basalt"));
        assert_ne!(blake3(b"basalt"), blake3(b"basalt2"));
    }

    #[test]
    fn address_derivation_is_20_bytes_of_keccak() {
        let pubkey = [7u8; 32];
        let addr = address_from_public_key(&pubkey);
        let digest = Keccak256::digest(pubkey);
        assert_eq!(&addr.0[..], &digest[12..32]);
    }
}
