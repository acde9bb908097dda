//! The canonical, deterministic binary codec for all consensus-critical data.
//!
//! Every implementation of Basalt must produce identical bytes for the same
//! logical value, because these bytes are what gets hashed and signed. We
//! build on `parity-scale-codec` for its compact (varint) integer encoding
//! and length-prefixed collections, the same choice the IOI Kernel makes in
//! `ioi-types::codec`. Fields that spec.md calls out as varint-prefixed use
//! `Compact<T>`; fields that must be fixed-width (hashes, addresses, curve
//! points) are plain byte arrays, which SCALE encodes as-is with no prefix.
//! Maps that participate in a hash are always `BTreeMap`, which SCALE
//! encodes in iteration (i.e. key) order — satisfying the "sorted map keys"
//! requirement without extra bookkeeping.

use parity_scale_codec::{Compact, Decode, DecodeAll, Encode};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("canonical decode failed: {0}")]
    Decode(String),
}

/// Encodes a value into its canonical byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation. Fails fast and
/// rejects trailing bytes, since a finalized block with trailing junk after a
/// field is an encoding invariant violation (byzantine peer, not a warning).
pub fn from_bytes_canonical<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    T::decode_all(&mut &*bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes a `u64` as a SCALE compact integer — the varint representation
/// spec.md requires for lengths, gas, nonces, and heights.
pub fn encode_varint_u64(v: u64) -> Vec<u8> {
    Compact(v).encode()
}

pub fn decode_varint_u64(bytes: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut cursor = bytes;
    let before = cursor.len();
    let Compact(v) = Compact::<u64>::decode(&mut cursor).map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok((v, before - cursor.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Encode, Decode, Debug, PartialEq, Eq)]
    struct Sample {
        a: Compact<u64>,
        b: Vec<u8>,
        m: BTreeMap<[u8; 4], u8>,
    }

    #[test]
    fn roundtrip() {
        let mut m = BTreeMap::new();
        m.insert([3, 0, 0, 0], 1);
        m.insert([1, 0, 0, 0], 2);
        let s = Sample {
            a: Compact(42),
            b: vec![1, 2, 3],
            m,
        };
        let encoded = to_bytes_canonical(&s);
        let decoded: Sample = from_bytes_canonical(&encoded).unwrap();
        assert_eq!(s, decoded);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let s = Sample {
            a: Compact(1),
            b: vec![],
            m: BTreeMap::new(),
        };
        let mut encoded = to_bytes_canonical(&s);
        encoded.push(0xFF);
        assert!(from_bytes_canonical::<Sample>(&encoded).is_err());
    }

    #[test]
    fn varint_roundtrip() {
        for v in [0u64, 1, 127, 128, 65535, 1_000_000, u64::MAX] {
            let bytes = encode_varint_u64(v);
            let (decoded, consumed) = decode_varint_u64(&bytes).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn map_ordering_is_deterministic_regardless_of_insertion_order() {
        let mut m1 = BTreeMap::new();
        m1.insert([1, 0, 0, 0], 1u8);
        m1.insert([2, 0, 0, 0], 2u8);
        let mut m2 = BTreeMap::new();
        m2.insert([2, 0, 0, 0], 2u8);
        m2.insert([1, 0, 0, 0], 1u8);
        assert_eq!(m1.encode(), m2.encode());
    }
}
