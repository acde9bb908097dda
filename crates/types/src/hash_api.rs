//! A minimal BLAKE3 wrapper used only so consensus wire types (transaction,
//! receipt, block header) can compute their own canonical hash without this
//! crate depending back on `basalt-crypto`. `basalt-crypto` is the place
//! every other hashing/signing need is served from; this module exists
//! purely to break that dependency cycle for `Hash256`-producing methods
//! defined directly on the wire types.

pub fn blake3_hash(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}
