//! The ordered transaction admission validator (spec.md §4.4). Every check
//! runs in the order listed there: a transaction is rejected for the first
//! precondition it fails, never a later one, so callers can rely on the
//! returned `TxError` to mean exactly what it says.

use basalt_types::{AccountState, Transaction, TxError, UInt256};

pub const BLOCK_GAS_LIMIT_DEFAULT: u64 = 30_000_000;

/// Checks independent of any account state: signature, chain id, gas limit
/// shape, fee field shape, and data length. Safe to run the moment a
/// transaction is received, before it is known whether the sender exists.
pub fn validate_stateless(tx: &Transaction, chain_id: u32, block_gas_limit: u64) -> Result<(), TxError> {
    if !basalt_crypto::ed25519::verify(&tx.sender_public_key, &tx.signing_payload(), &tx.signature) {
        return Err(TxError::InvalidSignature);
    }
    if tx.sender != basalt_crypto::hash::address_from_public_key(&tx.sender_public_key) {
        return Err(TxError::InvalidSignature);
    }
    if tx.chain_id != chain_id {
        return Err(TxError::InvalidChainId);
    }
    let intrinsic = tx.tx_type.intrinsic_gas();
    if tx.gas_limit < intrinsic {
        return Err(TxError::GasLimitBelowIntrinsic { got: tx.gas_limit, min: intrinsic });
    }
    if tx.gas_limit > block_gas_limit {
        return Err(TxError::GasLimitExceedsBlock { got: tx.gas_limit, max: block_gas_limit });
    }
    if let basalt_types::FeeFields::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } = &tx.fee {
        if max_priority_fee_per_gas.0 > max_fee_per_gas.0 {
            return Err(TxError::InvalidFee);
        }
    }
    let cap = tx.tx_type.data_cap();
    if cap > 0 && tx.data.len() > cap {
        return Err(TxError::DataTooLarge { got: tx.data.len(), max: cap });
    }
    Ok(())
}

/// Checks that depend on the sender's current account state: nonce
/// sequencing and balance sufficiency against the worst-case fee the
/// transaction could pay. The balance precheck uses `max_effective_price()`
/// (the worst case the sender could be charged: `gasPrice` for legacy,
/// `maxFeePerGas` for EIP-1559), not the block's actual effective price, so
/// `base_fee` plays no part in it (spec.md §4.4 precondition 6); kept as a
/// parameter so callers don't need two call shapes depending on fee kind.
pub fn validate_stateful(tx: &Transaction, sender_account: &AccountState, _base_fee: UInt256) -> Result<(), TxError> {
    if tx.nonce < sender_account.nonce {
        return Err(TxError::NonceTooLow);
    }
    if tx.nonce > sender_account.nonce {
        return Err(TxError::NonceTooHigh);
    }
    let price = tx.fee.max_effective_price();
    let max_fee = price
        .checked_mul_u64(tx.gas_limit)
        .ok_or(TxError::InsufficientBalance)?;
    let required = max_fee.checked_add(&tx.value).ok_or(TxError::InsufficientBalance)?;
    if sender_account.balance.0 < required.0 {
        return Err(TxError::InsufficientBalance);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_crypto::ed25519::Ed25519KeyPair;
    use basalt_types::{Address, FeeFields, TxType};
    use rand::rngs::OsRng;

    fn signed_transfer(kp: &Ed25519KeyPair, nonce: u64, chain_id: u32) -> Transaction {
        let mut tx = Transaction {
            tx_type: TxType::Transfer,
            nonce,
            sender: basalt_crypto::hash::address_from_public_key(&kp.public_key_bytes()),
            to: Address([2u8; 20]),
            value: UInt256::from_u64(10),
            gas_limit: 21_000,
            fee: FeeFields::Legacy { gas_price: UInt256::from_u64(1) },
            data: vec![],
            priority: false,
            chain_id,
            compliance_proofs: vec![],
            sender_public_key: kp.public_key_bytes(),
            signature: [0u8; 64],
        };
        tx.signature = kp.sign(&tx.signing_payload());
        tx
    }

    #[test]
    fn valid_transaction_passes_both_phases() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let tx = signed_transfer(&kp, 0, 1);
        assert!(validate_stateless(&tx, 1, BLOCK_GAS_LIMIT_DEFAULT).is_ok());
        let mut account = AccountState::fresh_eoa();
        account.balance = UInt256::from_u64(1_000_000);
        assert!(validate_stateful(&tx, &account, UInt256::ZERO).is_ok());
    }

    #[test]
    fn wrong_chain_id_rejected() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let tx = signed_transfer(&kp, 0, 2);
        assert_eq!(validate_stateless(&tx, 1, BLOCK_GAS_LIMIT_DEFAULT), Err(TxError::InvalidChainId));
    }

    #[test]
    fn tampered_signature_rejected() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let mut tx = signed_transfer(&kp, 0, 1);
        tx.value = UInt256::from_u64(999);
        assert_eq!(validate_stateless(&tx, 1, BLOCK_GAS_LIMIT_DEFAULT), Err(TxError::InvalidSignature));
    }

    #[test]
    fn sender_not_derived_from_signing_key_rejected() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let mut tx = signed_transfer(&kp, 0, 1);
        // A valid Ed25519 signature over a victim's claimed `sender` from an
        // unrelated keypair must not pass: `sender` must match the key that
        // actually signed.
        tx.sender = Address([1u8; 20]);
        tx.signature = kp.sign(&tx.signing_payload());
        assert_eq!(validate_stateless(&tx, 1, BLOCK_GAS_LIMIT_DEFAULT), Err(TxError::InvalidSignature));
    }

    #[test]
    fn nonce_too_low_rejected() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let tx = signed_transfer(&kp, 0, 1);
        let mut account = AccountState::fresh_eoa();
        account.nonce = 1;
        assert_eq!(validate_stateful(&tx, &account, UInt256::ZERO), Err(TxError::NonceTooLow));
    }

    #[test]
    fn insufficient_balance_rejected() {
        let kp = Ed25519KeyPair::generate(&mut OsRng);
        let tx = signed_transfer(&kp, 0, 1);
        let account = AccountState::fresh_eoa();
        assert_eq!(validate_stateful(&tx, &account, UInt256::ZERO), Err(TxError::InsufficientBalance));
    }
}
