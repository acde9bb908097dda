//! The block builder (spec.md §4.6 "Builder"). Packs validated transactions
//! under the block gas limit, adjusts the base fee, and seals a seat of
//! Merkle roots into a finished header.

use crate::basefee::compute_next_base_fee;
use crate::error::ChainError;
use basalt_api::state::StateManager;
use basalt_compliance::ComplianceHost;
use basalt_execution::{execute_transaction, staking, ExecutionContext, Sandbox};
use basalt_types::{
    merkle_root, Address, Block, BlockHeader, ChainParams, EquivocationEvidence, Receipt, Transaction,
};

/// Assembles and seals a new block on top of `parent` from `candidates`, in
/// order, skipping (not failing on) any candidate that no longer validates
/// against the evolving fork — "no partial inclusion" (spec.md §4.6).
/// `slashing_evidence` is embedded verbatim into the sealed block and its
/// offenders' on-chain stake is zeroed before the state root is taken
/// (spec.md §4.8 "embedded in any future block triggers slashing").
#[allow(clippy::too_many_arguments)]
pub fn build_block(
    parent: &BlockHeader,
    candidates: &[Transaction],
    proposer: Address,
    timestamp: u64,
    view: u64,
    state: &mut dyn StateManager,
    params: &ChainParams,
    sandbox: &dyn Sandbox,
    compliance: &mut dyn ComplianceHost,
    slashing_evidence: &[EquivocationEvidence],
) -> Result<(Block, Vec<Receipt>), ChainError> {
    for evidence in slashing_evidence {
        staking::slash(state, &evidence.offender)
            .map_err(|e| ChainError::Execution(basalt_execution::ExecutionError::PreconditionViolated(e.to_string())))?;
    }

    let base_fee = compute_next_base_fee(
        parent.base_fee,
        parent.gas_used,
        parent.gas_limit,
        params.base_fee_max_change_bps,
        params.initial_base_fee,
    );

    let mut included = Vec::new();
    let mut receipts = Vec::new();
    let mut gas_used: u64 = 0;

    let execution_timer = basalt_telemetry::metrics::BLOCK_EXECUTION_SECONDS.start_timer();
    for candidate in candidates {
        if basalt_tx::validate::validate_stateless(candidate, params.chain_id, params.block_gas_limit).is_err() {
            continue;
        }
        let Some(sender_account) = state.get_account(&candidate.sender)? else {
            if candidate.nonce != 0 {
                continue;
            }
            if run_stateful_checks_on_fresh(candidate, base_fee).is_err() {
                continue;
            }
            if gas_used.saturating_add(candidate.gas_limit) > params.block_gas_limit {
                break;
            }
            include_candidate(
                state, candidate, &mut included, &mut receipts, &mut gas_used, &proposer,
                base_fee, parent.number + 1, sandbox, params, compliance,
            )?;
            continue;
        };
        if basalt_tx::validate::validate_stateful(candidate, &sender_account, base_fee).is_err() {
            continue;
        }
        if gas_used.saturating_add(candidate.gas_limit) > params.block_gas_limit {
            break;
        }
        include_candidate(
            state, candidate, &mut included, &mut receipts, &mut gas_used, &proposer,
            base_fee, parent.number + 1, sandbox, params, compliance,
        )?;
    }

    execution_timer.observe_duration();

    let tx_hashes: Vec<_> = included.iter().map(Transaction::hash).collect();
    let receipt_hashes: Vec<_> = receipts.iter().map(Receipt::hash).collect();
    let state_root = state.commit_version(parent.number + 1)?;

    let header = BlockHeader {
        version: 1,
        number: parent.number + 1,
        parent_hash: parent.hash(),
        state_root,
        transactions_root: merkle_root(&tx_hashes),
        receipts_root: merkle_root(&receipt_hashes),
        proposer,
        timestamp,
        chain_id: params.chain_id,
        gas_used,
        gas_limit: params.block_gas_limit,
        base_fee,
        extra_data: vec![],
        bls_aggregate_signature: vec![],
        signer_bitfield: vec![],
        view,
    };
    let block_hash = header.hash();
    for receipt in &mut receipts {
        receipt.block_hash = block_hash;
    }
    basalt_telemetry::metrics::BLOCKS_PRODUCED.inc();

    Ok((Block { header, transactions: included, slashing_evidence: slashing_evidence.to_vec() }, receipts))
}

fn run_stateful_checks_on_fresh(tx: &Transaction, base_fee: basalt_types::UInt256) -> Result<(), basalt_types::TxError> {
    basalt_tx::validate::validate_stateful(tx, &basalt_types::AccountState::fresh_eoa(), base_fee)
}

#[allow(clippy::too_many_arguments)]
fn include_candidate(
    state: &mut dyn StateManager,
    candidate: &Transaction,
    included: &mut Vec<Transaction>,
    receipts: &mut Vec<Receipt>,
    gas_used: &mut u64,
    proposer: &Address,
    base_fee: basalt_types::UInt256,
    block_number: u64,
    sandbox: &dyn Sandbox,
    params: &ChainParams,
    compliance: &mut dyn ComplianceHost,
) -> Result<(), ChainError> {
    let ctx = ExecutionContext {
        block_number,
        proposer: *proposer,
        base_fee,
        min_validator_stake: params.min_validator_stake,
        unbonding_period_blocks: params.unbonding_period_blocks,
        tx_index: included.len() as u32,
    };
    let receipt = execute_transaction(state, candidate, &ctx, sandbox, compliance)?;
    *gas_used = gas_used.saturating_add(receipt.gas_used);
    included.push(candidate.clone());
    receipts.push(receipt);
    Ok(())
}
