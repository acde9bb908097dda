//! Hashing, signature, and zero-knowledge primitives backing the consensus
//! core: BLAKE3 for state/wire hashing, Ed25519 for transaction signatures,
//! BLS12-381 for aggregatable consensus votes, and Groth16 for the
//! compliance gate's ZK proof path.

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

pub mod bls;
pub mod ed25519;
pub mod error;
pub mod hash;
pub mod zk;

pub use error::CryptoError;
