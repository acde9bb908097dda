//! Validator staking lifecycle (spec.md §4.5 step 5). Stake bookkeeping
//! lives in the validator's own storage subtrie at well-known slots, the
//! same way a contract keeps its fields — there is no separate staking
//! table in the state DB.
//!
//! `StakeWithdraw` does not pay out immediately even once the unbonding
//! period has elapsed transaction-locally; it only succeeds once the
//! recorded `unlock_height` has been reached, so the payout is always a
//! scheduled consequence of an earlier `ValidatorExit`, never of the
//! withdraw call itself (SPEC_FULL.md §6 open-question decision 2).

use basalt_api::state::StateManager;
use basalt_types::{Address, ExecError, Hash256, StateError, UInt256};

const STAKE_SLOT: Hash256 = Hash256([0x01; 32]);
const ACTIVE_SLOT: Hash256 = Hash256([0x02; 32]);
const UNLOCK_HEIGHT_SLOT: Hash256 = Hash256([0x03; 32]);

fn read_u256(state: &mut dyn StateManager, validator: &Address, slot: &Hash256) -> Result<UInt256, StateError> {
    let raw = state.get_storage_slot(validator, slot)?;
    Ok(UInt256::from_be_bytes(&raw.0))
}

fn write_u256(state: &mut dyn StateManager, validator: &Address, slot: &Hash256, value: UInt256) -> Result<(), StateError> {
    state.put_storage_slot(validator, slot, Hash256(value.to_be_bytes()))
}

fn is_active(state: &mut dyn StateManager, validator: &Address) -> Result<bool, StateError> {
    Ok(!state.get_storage_slot(validator, &ACTIVE_SLOT)?.is_zero())
}

fn set_active(state: &mut dyn StateManager, validator: &Address, active: bool) -> Result<(), StateError> {
    let value = if active { Hash256([0x01; 32]) } else { Hash256::ZERO };
    state.put_storage_slot(validator, &ACTIVE_SLOT, value)
}

/// Registers a new validator, debiting `stake` is the caller's responsibility
/// (balance movement stays in the executor); this only updates staking state.
pub fn register(state: &mut dyn StateManager, validator: &Address, stake: UInt256, min_stake: UInt256) -> Result<(), ExecError> {
    if is_active(state, validator).map_err(|_| ExecError::StakingNotAvailable)? {
        return Err(ExecError::StakingNotAvailable);
    }
    if stake.0 < min_stake.0 {
        return Err(ExecError::StakeBelowMinimum);
    }
    write_u256(state, validator, &STAKE_SLOT, stake).map_err(|_| ExecError::StakingNotAvailable)?;
    set_active(state, validator, true).map_err(|_| ExecError::StakingNotAvailable)?;
    write_u256(state, validator, &UNLOCK_HEIGHT_SLOT, UInt256::ZERO).map_err(|_| ExecError::StakingNotAvailable)?;
    Ok(())
}

/// Extends an already-active validator's stake.
pub fn deposit(state: &mut dyn StateManager, validator: &Address, additional: UInt256) -> Result<(), ExecError> {
    if !is_active(state, validator).map_err(|_| ExecError::StakingNotAvailable)? {
        return Err(ExecError::ValidatorNotRegistered);
    }
    let current = read_u256(state, validator, &STAKE_SLOT).map_err(|_| ExecError::StakingNotAvailable)?;
    let updated = current.checked_add(&additional).ok_or(ExecError::StakingNotAvailable)?;
    write_u256(state, validator, &STAKE_SLOT, updated).map_err(|_| ExecError::StakingNotAvailable)?;
    Ok(())
}

/// Marks the validator inactive and begins unbonding: stake stays locked
/// until `current_height + unbonding_period_blocks`.
pub fn exit(
    state: &mut dyn StateManager,
    validator: &Address,
    current_height: u64,
    unbonding_period_blocks: u64,
) -> Result<(), ExecError> {
    if !is_active(state, validator).map_err(|_| ExecError::StakingNotAvailable)? {
        return Err(ExecError::ValidatorNotRegistered);
    }
    set_active(state, validator, false).map_err(|_| ExecError::StakingNotAvailable)?;
    let unlock_height = current_height.saturating_add(unbonding_period_blocks);
    write_u256(state, validator, &UNLOCK_HEIGHT_SLOT, UInt256::from_u64(unlock_height))
        .map_err(|_| ExecError::StakingNotAvailable)?;
    Ok(())
}

/// Pays out the locked stake once the unbonding window has elapsed. Returns
/// the amount to credit back to the validator's balance; the executor
/// performs that credit, this function only clears staking state.
pub fn withdraw(state: &mut dyn StateManager, validator: &Address, current_height: u64) -> Result<UInt256, ExecError> {
    let unlock_height = read_u256(state, validator, &UNLOCK_HEIGHT_SLOT).map_err(|_| ExecError::StakingNotAvailable)?;
    if unlock_height.is_zero() || current_height < unlock_height.0[0] {
        return Err(ExecError::StakingNotAvailable);
    }
    let stake = read_u256(state, validator, &STAKE_SLOT).map_err(|_| ExecError::StakingNotAvailable)?;
    write_u256(state, validator, &STAKE_SLOT, UInt256::ZERO).map_err(|_| ExecError::StakingNotAvailable)?;
    write_u256(state, validator, &UNLOCK_HEIGHT_SLOT, UInt256::ZERO).map_err(|_| ExecError::StakingNotAvailable)?;
    Ok(stake)
}

/// Zeroes a validator's on-chain stake and marks it inactive, per spec.md
/// §4.8 "100% stake slashing on proven equivocation". Idempotent: slashing
/// an already-slashed or never-registered validator just leaves it at zero.
pub fn slash(state: &mut dyn StateManager, validator: &Address) -> Result<(), ExecError> {
    write_u256(state, validator, &STAKE_SLOT, UInt256::ZERO).map_err(|_| ExecError::StakingNotAvailable)?;
    set_active(state, validator, false).map_err(|_| ExecError::StakingNotAvailable)?;
    Ok(())
}
