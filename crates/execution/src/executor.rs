//! The atomic per-transaction executor (spec.md §4.5 "Execution engine").
//! Every transaction is pre-charged, dispatched by type, then post-charged;
//! a failure anywhere after pre-charge rolls back to the pre-charge state
//! rather than reverting the whole transition, since gas is never refunded
//! on failure (spec.md "Failure semantics").

use crate::error::ExecutionError;
use crate::sandbox::{Sandbox, SandboxOutcome};
use crate::staking;
use basalt_api::state::StateManager;
use basalt_compliance::ComplianceHost;
use basalt_types::{Address, AccountState, AccountKind, ErrorCode, ExecError, Hash256, Log, Receipt, Transaction, TxType, UInt256};

/// Per-block context the executor needs but that no single transaction owns.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext {
    pub block_number: u64,
    pub proposer: Address,
    pub base_fee: UInt256,
    pub min_validator_stake: UInt256,
    pub unbonding_period_blocks: u64,
    pub tx_index: u32,
}

/// The zero address acts as the base-fee burn sink (spec.md §4.5 step 6).
const BURN_SINK: Address = Address::ZERO;

fn derive_contract_address(sender: &Address, nonce: u64) -> Address {
    let mut preimage = Vec::with_capacity(28);
    preimage.extend_from_slice(sender.as_ref());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    let digest = basalt_crypto::hash::blake3(&preimage);
    digest.0.get(12..32).and_then(Address::from_slice).unwrap_or(Address::ZERO)
}

fn build_receipt(
    tx: &Transaction,
    ctx: &ExecutionContext,
    success: bool,
    gas_used: u64,
    error_code: Option<ErrorCode>,
    events: Vec<Log>,
    effective_gas_price: UInt256,
    post_state_root: Hash256,
) -> Receipt {
    Receipt {
        tx_hash: tx.hash(),
        block_hash: Hash256::ZERO,
        block_number: ctx.block_number,
        index: ctx.tx_index,
        sender: tx.sender,
        to: tx.to,
        success,
        gas_used,
        error_code,
        events,
        post_state_root,
        effective_gas_price,
    }
}

/// Runs one transaction to completion against `state`, which is assumed to
/// already be a fork the caller can discard wholesale on a more severe
/// failure (the builder re-validates and skips invalid candidates before
/// ever calling this). Returns a receipt whose `success` flag tells the
/// caller whether user-level execution succeeded — this function itself
/// only returns `Err` for failures that should never happen given a
/// correctly validated transaction.
pub fn execute_transaction(
    state: &mut dyn StateManager,
    tx: &Transaction,
    ctx: &ExecutionContext,
    sandbox: &dyn Sandbox,
    compliance: &mut dyn ComplianceHost,
) -> Result<Receipt, ExecutionError> {
    let mut sender_account = state.get_account(&tx.sender)?.unwrap_or_else(AccountState::fresh_eoa);

    if let Err(nonce_err) = sender_account.increment_nonce() {
        let root = state.root();
        return Ok(build_receipt(tx, ctx, false, 0, Some(nonce_err.code()), vec![], UInt256::ZERO, root));
    }

    let effective_price = tx.fee.effective_gas_price(ctx.base_fee);
    let gas_cost = effective_price
        .checked_mul_u64(tx.gas_limit)
        .ok_or_else(|| ExecutionError::PreconditionViolated("gas cost overflow".into()))?;
    sender_account.balance = sender_account
        .balance
        .checked_sub(&gas_cost)
        .ok_or_else(|| ExecutionError::PreconditionViolated("insufficient balance at pre-charge".into()))?;
    state.put_account(&tx.sender, sender_account.clone())?;

    let (success, gas_used, error_code, events) = match dispatch(state, tx, ctx, sandbox, compliance) {
        Ok((events, consumed)) => (true, consumed, None, events),
        Err((err, consumed)) => {
            let charged = if err.is_abnormal() { tx.gas_limit } else { consumed };
            (false, charged, Some(err.code()), vec![])
        }
    };

    // Reload the sender: dispatch may have mutated the sender's own balance
    // (e.g. a failed transfer must refund `value`, which dispatch already
    // undid by never applying it on the failure path below).
    let mut sender_account = state
        .get_account(&tx.sender)?
        .ok_or_else(|| ExecutionError::PreconditionViolated("sender vanished mid-execution".into()))?;

    let refund = effective_price.checked_mul_u64(tx.gas_limit - gas_used).unwrap_or(UInt256::ZERO);
    sender_account.balance = sender_account.balance.saturating_add(&refund);
    state.put_account(&tx.sender, sender_account)?;

    let base_fee_portion = ctx.base_fee.checked_mul_u64(gas_used).unwrap_or(UInt256::ZERO);
    let tip = effective_price.saturating_sub(&ctx.base_fee).checked_mul_u64(gas_used).unwrap_or(UInt256::ZERO);
    credit(state, &BURN_SINK, base_fee_portion)?;
    if !tip.is_zero() {
        credit(state, &ctx.proposer, tip)?;
    }

    let root = state.root();
    Ok(build_receipt(tx, ctx, success, gas_used, error_code, events, effective_price, root))
}

fn credit(state: &mut dyn StateManager, to: &Address, amount: UInt256) -> Result<(), basalt_types::StateError> {
    if amount.is_zero() {
        return Ok(());
    }
    let mut account = state.get_account(to)?.unwrap_or_else(AccountState::fresh_eoa);
    account.balance = account.balance.saturating_add(&amount);
    state.put_account(to, account)
}

/// Dispatches by transaction type. On success returns emitted events plus
/// the gas actually consumed; on failure returns the typed error plus the
/// gas actually consumed before failing (only meaningful for the sandbox
/// paths — ignored elsewhere, since a non-sandbox failure never happens
/// after the precondition checks already run at admission).
fn dispatch(
    state: &mut dyn StateManager,
    tx: &Transaction,
    ctx: &ExecutionContext,
    sandbox: &dyn Sandbox,
    compliance: &mut dyn ComplianceHost,
) -> Result<(Vec<Log>, u64), (ExecError, u64)> {
    let intrinsic = tx.tx_type.intrinsic_gas();
    match tx.tx_type {
        TxType::Transfer | TxType::System => {
            if tx.sender != tx.to && !tx.value.is_zero() {
                if let Some(policy) = compliance.policy_for(&tx.to) {
                    let holdings_after = state
                        .get_account(&tx.to)
                        .map_err(|_| (ExecError::SandboxViolation("state".into()), 0))?
                        .map(|a| a.balance)
                        .unwrap_or(UInt256::ZERO)
                        .saturating_add(&tx.value);
                    basalt_compliance::check_transfer(
                        &policy,
                        &tx.sender,
                        &tx.to,
                        &tx.compliance_proofs,
                        compliance as &dyn basalt_compliance::AttestationSource,
                        compliance as &mut dyn basalt_compliance::NullifierSet,
                        holdings_after,
                        ctx.block_number,
                        tx.value,
                    )
                    .map_err(|e| (ExecError::ComplianceRejected(e), 0))?;
                }
                transfer_value(state, &tx.sender, &tx.to, tx.value).map_err(|e| (e, 0))?;
            }
            Ok((vec![], intrinsic))
        }
        TxType::ContractDeploy => deploy(state, tx, sandbox),
        TxType::ContractCall => call(state, tx, sandbox),
        TxType::ValidatorRegister => {
            staking::register(state, &tx.sender, tx.value, ctx.min_validator_stake).map_err(|e| (e, 0))?;
            debit(state, &tx.sender, tx.value).map_err(|e| (e, 0))?;
            Ok((vec![], intrinsic))
        }
        TxType::StakeDeposit => {
            staking::deposit(state, &tx.sender, tx.value).map_err(|e| (e, 0))?;
            debit(state, &tx.sender, tx.value).map_err(|e| (e, 0))?;
            Ok((vec![], intrinsic))
        }
        TxType::ValidatorExit => {
            staking::exit(state, &tx.sender, ctx.block_number, ctx.unbonding_period_blocks).map_err(|e| (e, 0))?;
            Ok((vec![], intrinsic))
        }
        TxType::StakeWithdraw => {
            let paid = staking::withdraw(state, &tx.sender, ctx.block_number).map_err(|e| (e, 0))?;
            credit(state, &tx.sender, paid).map_err(|_| (ExecError::StakingNotAvailable, 0))?;
            Ok((vec![], intrinsic))
        }
    }
}

fn transfer_value(state: &mut dyn StateManager, from: &Address, to: &Address, value: UInt256) -> Result<(), ExecError> {
    let mut sender = state.get_account(from).map_err(|_| ExecError::SandboxViolation("state".into()))?.unwrap_or_else(AccountState::fresh_eoa);
    sender.balance = sender.balance.checked_sub(&value).ok_or(ExecError::SandboxViolation("balance".into()))?;
    state.put_account(from, sender).map_err(|_| ExecError::SandboxViolation("state".into()))?;
    credit(state, to, value).map_err(|_| ExecError::SandboxViolation("state".into()))
}

fn debit(state: &mut dyn StateManager, from: &Address, value: UInt256) -> Result<(), ExecError> {
    let mut account = state.get_account(from).map_err(|_| ExecError::SandboxViolation("state".into()))?.unwrap_or_else(AccountState::fresh_eoa);
    account.balance = account.balance.checked_sub(&value).ok_or(ExecError::SandboxViolation("balance".into()))?;
    state.put_account(from, account).map_err(|_| ExecError::SandboxViolation("state".into()))
}

fn deploy(state: &mut dyn StateManager, tx: &Transaction, sandbox: &dyn Sandbox) -> Result<(Vec<Log>, u64), (ExecError, u64)> {
    let (outcome, code_hash) = sandbox.deploy(&tx.data, tx.gas_limit);
    match outcome {
        SandboxOutcome::Success { gas_used } => {
            let contract_addr = derive_contract_address(&tx.sender, tx.nonce);
            let mut account = AccountState::fresh_contract(code_hash);
            account.kind = AccountKind::Contract;
            account.balance = tx.value;
            state.put_account(&contract_addr, account).map_err(|_| (ExecError::SandboxViolation("commit".into()), gas_used))?;
            if !tx.value.is_zero() {
                debit(state, &tx.sender, tx.value).map_err(|e| (e, gas_used))?;
            }
            Ok((vec![], gas_used))
        }
        SandboxOutcome::Reverted { gas_used, reason } => Err((ExecError::Revert(reason), gas_used)),
        SandboxOutcome::Aborted { reason } => Err((ExecError::SandboxViolation(reason), tx.gas_limit)),
    }
}

fn call(state: &mut dyn StateManager, tx: &Transaction, sandbox: &dyn Sandbox) -> Result<(Vec<Log>, u64), (ExecError, u64)> {
    let target = state.get_account(&tx.to).map_err(|_| (ExecError::SandboxViolation("state".into()), 0))?;
    let target = match target {
        Some(account) if account.kind == AccountKind::Contract => account,
        _ => return Err((ExecError::ContractNotFound, tx.gas_limit)),
    };
    let outcome = sandbox.call(target.code_hash, &tx.data, tx.gas_limit);
    match outcome {
        SandboxOutcome::Success { gas_used } => {
            if !tx.value.is_zero() {
                transfer_value(state, &tx.sender, &tx.to, tx.value).map_err(|e| (e, 0))?;
            }
            Ok((vec![], gas_used))
        }
        SandboxOutcome::Reverted { gas_used, reason } => Err((ExecError::Revert(reason), gas_used)),
        SandboxOutcome::Aborted { reason } => Err((ExecError::SandboxViolation(reason), tx.gas_limit)),
    }
}
