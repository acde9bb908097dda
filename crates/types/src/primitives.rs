//! Address, Hash256 and UInt256 — the fixed-width primitives every
//! consensus-critical structure is built from.
#![allow(clippy::indexing_slicing)]

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account identifier. System addresses have their first 18 bytes zero.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_system(&self) -> bool {
        self.0[..18].iter().all(|b| *b == 0)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 20 {
            return None;
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(bytes);
        Some(Address(out))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A 32-byte digest. BLAKE3 unless a field is explicitly Keccak-256 (address derivation).
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Some(Hash256(out))
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A 256-bit unsigned integer with checked arithmetic, backed by four
/// little-endian-ordered 64-bit limbs. Used for every balance, fee, and gas
/// price on a consensus path — no floating point is ever involved.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode)]
pub struct UInt256(pub [u64; 4]);

impl UInt256 {
    pub const ZERO: UInt256 = UInt256([0, 0, 0, 0]);
    pub const MAX: UInt256 = UInt256([u64::MAX; 4]);

    pub fn from_u64(v: u64) -> Self {
        UInt256([v, 0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Big-endian 32-byte serialization, for wire/hash inclusion.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            let be = limb.to_be_bytes();
            let start = 24 - i * 8;
            out[start..start + 8].copy_from_slice(&be);
        }
        out
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let start = 24 - i * 8;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&bytes[start..start + 8]);
            limbs[i] = u64::from_be_bytes(arr);
        }
        UInt256(limbs)
    }

    pub fn checked_add(&self, other: &UInt256) -> Option<UInt256> {
        let mut out = [0u64; 4];
        let mut carry: u128 = 0;
        for i in 0..4 {
            let sum = self.0[i] as u128 + other.0[i] as u128 + carry;
            out[i] = sum as u64;
            carry = sum >> 64;
        }
        if carry != 0 {
            None
        } else {
            Some(UInt256(out))
        }
    }

    pub fn checked_sub(&self, other: &UInt256) -> Option<UInt256> {
        let mut out = [0u64; 4];
        let mut borrow: i128 = 0;
        for i in 0..4 {
            let diff = self.0[i] as i128 - other.0[i] as i128 - borrow;
            if diff < 0 {
                out[i] = (diff + (1i128 << 64)) as u64;
                borrow = 1;
            } else {
                out[i] = diff as u64;
                borrow = 0;
            }
        }
        if borrow != 0 {
            None
        } else {
            Some(UInt256(out))
        }
    }

    /// Checked multiplication by a `u64` scalar (the only multiplication shape
    /// consensus math needs: gas * price).
    pub fn checked_mul_u64(&self, scalar: u64) -> Option<UInt256> {
        let mut out = [0u64; 4];
        let mut carry: u128 = 0;
        for i in 0..4 {
            let prod = self.0[i] as u128 * scalar as u128 + carry;
            out[i] = prod as u64;
            carry = prod >> 64;
        }
        if carry != 0 {
            None
        } else {
            Some(UInt256(out))
        }
    }

    pub fn saturating_add(&self, other: &UInt256) -> UInt256 {
        self.checked_add(other).unwrap_or(UInt256::MAX)
    }

    pub fn saturating_sub(&self, other: &UInt256) -> UInt256 {
        self.checked_sub(other).unwrap_or(UInt256::ZERO)
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Decimal rendering via repeated division by 10, fine off the hot path.
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut digits = Vec::new();
        let mut cur = *self;
        let ten = UInt256::from_u64(10);
        while !cur.is_zero() {
            let (q, r) = cur.div_rem_u64(10).unwrap_or((UInt256::ZERO, 0));
            digits.push(b'0' + r as u8);
            cur = q;
            let _ = ten;
        }
        digits.reverse();
        // Safety: digits are all ASCII '0'..='9'.
        write!(f, "{}", String::from_utf8_lossy(&digits))
    }
}

impl UInt256 {
    /// Long division by a small divisor; returns (quotient, remainder).
    fn div_rem_u64(&self, divisor: u64) -> Option<(UInt256, u64)> {
        if divisor == 0 {
            return None;
        }
        let mut quotient = [0u64; 4];
        let mut remainder: u128 = 0;
        for i in (0..4).rev() {
            let cur = (remainder << 64) | self.0[i] as u128;
            quotient[i] = (cur / divisor as u128) as u64;
            remainder = cur % divisor as u128;
        }
        Some((UInt256(quotient), remainder as u64))
    }
}

impl Serialize for UInt256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        hex::encode(self.to_be_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UInt256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("UInt256 hex must be 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(UInt256::from_be_bytes(&arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint256_add_sub_roundtrip() {
        let a = UInt256::from_u64(1_000_000);
        let b = UInt256::from_u64(1);
        let c = a.checked_add(&b).unwrap();
        assert_eq!(c.checked_sub(&b).unwrap(), a);
    }

    #[test]
    fn uint256_overflow_detected() {
        assert!(UInt256::MAX.checked_add(&UInt256::from_u64(1)).is_none());
        assert!(UInt256::ZERO.checked_sub(&UInt256::from_u64(1)).is_none());
    }

    #[test]
    fn uint256_mul_u64() {
        let price = UInt256::from_u64(15);
        let gas = 21_000u64;
        let fee = price.checked_mul_u64(gas).unwrap();
        assert_eq!(fee, UInt256::from_u64(315_000));
    }

    #[test]
    fn uint256_be_bytes_roundtrip() {
        let v = UInt256::from_u64(123_456_789);
        let bytes = v.to_be_bytes();
        assert_eq!(UInt256::from_be_bytes(&bytes), v);
    }

    #[test]
    fn uint256_display_decimal() {
        assert_eq!(UInt256::from_u64(9_999_479).to_string(), "9999479");
        assert_eq!(UInt256::ZERO.to_string(), "0");
    }

    #[test]
    fn address_system_detection() {
        assert!(Address::ZERO.is_system());
        let mut raw = [0u8; 20];
        raw[19] = 1;
        assert!(Address(raw).is_system());
        raw[0] = 1;
        assert!(!Address(raw).is_system());
    }
}
