//! The account model (spec.md §3 "AccountState").

use crate::primitives::{Hash256, UInt256};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum AccountKind {
    ExternallyOwned,
    Contract,
    System,
    Validator,
}

/// An account's full state, as stored at `BLAKE3(address)` in the account trie.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: UInt256,
    pub storage_root: Hash256,
    pub code_hash: Hash256,
    pub kind: AccountKind,
    pub compliance_hash: Hash256,
}

impl AccountState {
    /// A fresh externally-owned account with zero balance and nonce, as
    /// implicitly "exists" before any write — never stored until first write
    /// (spec.md §3 "Lifecycle: created on first write").
    pub fn fresh_eoa() -> Self {
        AccountState {
            nonce: 0,
            balance: UInt256::ZERO,
            storage_root: Hash256::ZERO,
            code_hash: Hash256::ZERO,
            kind: AccountKind::ExternallyOwned,
            compliance_hash: Hash256::ZERO,
        }
    }

    pub fn fresh_contract(code_hash: Hash256) -> Self {
        AccountState {
            nonce: 0,
            balance: UInt256::ZERO,
            storage_root: Hash256::ZERO,
            code_hash,
            kind: AccountKind::Contract,
            compliance_hash: Hash256::ZERO,
        }
    }

    /// Increment the nonce, rejecting saturation per spec.md §4.5 "Nonce overflow".
    pub fn increment_nonce(&mut self) -> Result<(), crate::error::ExecError> {
        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or(crate::error::ExecError::NonceOverflow)?;
        Ok(())
    }
}
