use basalt_api::consensus::ConsensusDecision;
use basalt_compliance::{GenesisComplianceHost, NullComplianceHost};
use basalt_consensus::{ReputationComponents, Validator, ValidatorSet};
use basalt_crypto::ed25519::Ed25519KeyPair;
use basalt_execution::NullSandbox;
use basalt_node::Node;
use basalt_storage::memory::MemoryNodeStore;
use basalt_types::{
    AccountState, Address, BlockHeader, ChainParams, ComplianceCheck, CompliancePolicy, ErrorCode, FeeFields,
    GenesisConfig, Hash256, Transaction, TxType, UInt256,
};
use rand::rngs::OsRng;
use std::collections::BTreeMap;

fn genesis_header(params: &ChainParams) -> BlockHeader {
    BlockHeader {
        version: 1,
        number: 0,
        parent_hash: Hash256::ZERO,
        state_root: Hash256::ZERO,
        transactions_root: Hash256::ZERO,
        receipts_root: Hash256::ZERO,
        proposer: Address::ZERO,
        timestamp: 0,
        chain_id: params.chain_id,
        gas_used: 0,
        gas_limit: params.block_gas_limit,
        base_fee: params.initial_base_fee,
        extra_data: vec![],
        bls_aggregate_signature: vec![],
        signer_bitfield: vec![],
        view: 0,
    }
}

fn sole_validator(address: Address) -> ValidatorSet {
    ValidatorSet::new(vec![Validator {
        address,
        bls_public_key: vec![0u8; 48],
        stake: UInt256::from_u64(1_000),
        reputation: ReputationComponents::perfect(),
    }])
}

#[tokio::test]
async fn submits_builds_and_appends_a_block() {
    let params = ChainParams { chain_id: 31337, ..ChainParams::default() };
    let store = MemoryNodeStore::new();
    let our_address = Address([0xAA; 20]);

    let mut node = Node::new(
        &store,
        genesis_header(&params),
        params.clone(),
        sole_validator(our_address),
        our_address,
        Box::new(NullSandbox),
        Box::new(NullComplianceHost),
    );

    let decision = node.decide(0).await;
    assert!(matches!(decision, ConsensusDecision::ProduceBlock { .. }));

    let kp = Ed25519KeyPair::generate(&mut OsRng);
    let sender = basalt_crypto::hash::address_from_public_key(&kp.public_key_bytes());
    let mut sender_account = AccountState::fresh_eoa();
    sender_account.balance = UInt256::from_u64(10_000_000);
    node.fund_account(&sender, sender_account).unwrap();

    let mut tx = Transaction {
        tx_type: TxType::Transfer,
        nonce: 0,
        sender,
        to: Address([2u8; 20]),
        value: UInt256::from_u64(100),
        gas_limit: 21_000,
        fee: FeeFields::Legacy { gas_price: UInt256::from_u64(1) },
        data: vec![],
        priority: false,
        chain_id: 31337,
        compliance_proofs: vec![],
        sender_public_key: kp.public_key_bytes(),
        signature: [0u8; 64],
    };
    tx.signature = kp.sign(&tx.signing_payload());

    node.submit_transaction(tx).unwrap();

    let (block, receipts) = node.produce_block(0, 1, &[]).unwrap();
    assert_eq!(block.header.number, 1);
    assert_eq!(node.tip_number(), 1);
    assert_eq!(receipts.len(), 1);
    assert!(receipts[0].success);

    // The second block has no pending transactions; it should still seal
    // cleanly on top of the first.
    let (empty_block, empty_receipts) = node.produce_block(0, 2, &[]).unwrap();
    assert_eq!(empty_block.header.number, 2);
    assert!(empty_receipts.is_empty());
}

#[tokio::test]
async fn transaction_with_insufficient_balance_is_skipped_not_failed() {
    let params = ChainParams { chain_id: 31337, ..ChainParams::default() };
    let store = MemoryNodeStore::new();
    let our_address = Address([0xAA; 20]);

    let mut node = Node::new(
        &store,
        genesis_header(&params),
        params.clone(),
        sole_validator(our_address),
        our_address,
        Box::new(NullSandbox),
        Box::new(NullComplianceHost),
    );

    let kp = Ed25519KeyPair::generate(&mut OsRng);
    let sender = basalt_crypto::hash::address_from_public_key(&kp.public_key_bytes());
    // Left unfunded: the account doesn't exist at all.

    let mut tx = Transaction {
        tx_type: TxType::Transfer,
        nonce: 0,
        sender,
        to: Address([2u8; 20]),
        value: UInt256::from_u64(100),
        gas_limit: 21_000,
        fee: FeeFields::Legacy { gas_price: UInt256::from_u64(1_000_000_000) },
        data: vec![],
        priority: false,
        chain_id: 31337,
        compliance_proofs: vec![],
        sender_public_key: kp.public_key_bytes(),
        signature: [0u8; 64],
    };
    tx.signature = kp.sign(&tx.signing_payload());

    node.submit_transaction(tx).unwrap();
    let (block, receipts) = node.produce_block(0, 1, &[]).unwrap();
    assert!(block.transactions.is_empty());
    assert!(receipts.is_empty());
}

#[tokio::test]
async fn sanctioned_receiver_rejects_transfer_end_to_end() {
    let params = ChainParams { chain_id: 31337, ..ChainParams::default() };
    let store = MemoryNodeStore::new();
    let our_address = Address([0xAA; 20]);

    let token = Address([2u8; 20]);
    let genesis = GenesisConfig {
        params: params.clone(),
        validators: vec![],
        accounts: BTreeMap::new(),
        compliance_policies: vec![CompliancePolicy {
            token,
            owner: Address([0xEE; 20]),
            checks: vec![ComplianceCheck::NotSanctioned],
            zk_schemas: vec![],
            zk_path_enabled: false,
            paused: false,
        }],
        initial_kyc_grants: vec![],
        initial_sanctions_list: vec![token],
        timestamp: 0,
    };
    let compliance = GenesisComplianceHost::from_genesis(&genesis);

    let mut node = Node::new(
        &store,
        genesis_header(&params),
        params.clone(),
        sole_validator(our_address),
        our_address,
        Box::new(NullSandbox),
        Box::new(compliance),
    );

    let kp = Ed25519KeyPair::generate(&mut OsRng);
    let sender = basalt_crypto::hash::address_from_public_key(&kp.public_key_bytes());
    let mut sender_account = AccountState::fresh_eoa();
    sender_account.balance = UInt256::from_u64(10_000_000);
    node.fund_account(&sender, sender_account).unwrap();

    // `token`, the transfer's recipient, is on the genesis sanctions list
    // and governed by a `NotSanctioned` policy: the transfer must be
    // included in the block but fail at execution, not silently dropped
    // from the mempool like an admission-time rejection would be.
    let mut tx = Transaction {
        tx_type: TxType::Transfer,
        nonce: 0,
        sender,
        to: token,
        value: UInt256::from_u64(100),
        gas_limit: 21_000,
        fee: FeeFields::Legacy { gas_price: UInt256::from_u64(1) },
        data: vec![],
        priority: false,
        chain_id: 31337,
        compliance_proofs: vec![],
        sender_public_key: kp.public_key_bytes(),
        signature: [0u8; 64],
    };
    tx.signature = kp.sign(&tx.signing_payload());

    node.submit_transaction(tx).unwrap();
    let (block, receipts) = node.produce_block(0, 1, &[]).unwrap();
    assert_eq!(block.transactions.len(), 1);
    assert_eq!(receipts.len(), 1);
    assert!(!receipts[0].success);
    assert_eq!(receipts[0].error_code, Some(ErrorCode::ComplianceSanctioned));
}
