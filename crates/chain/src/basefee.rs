//! EIP-1559-style base-fee adjustment (spec.md §4.6 "Builder" bullet 1).
//!
//! Base fees are modest quantities in practice; like the mempool's
//! effective-price comparisons, this module works against the low 64-bit
//! limb of a `UInt256` rather than full-width arithmetic — sufficient for
//! every fee magnitude the chain ever produces and far simpler than a
//! general `UInt256` division routine this crate has no other use for.

// Indexing into `UInt256`'s fixed 4-limb array is always in bounds; relaxed
// here rather than introduced as a public accessor this crate is the only
// user of.
#![allow(clippy::indexing_slicing)]

use basalt_types::UInt256;

/// `gasLimit / elasticityMultiplier`; elasticity is fixed at 2, the
/// standard EIP-1559 choice (target is half the block's full capacity).
const ELASTICITY_MULTIPLIER: u64 = 2;

pub fn compute_next_base_fee(
    parent_base_fee: UInt256,
    gas_used: u64,
    gas_limit: u64,
    max_change_bps: u32,
    initial_base_fee: UInt256,
) -> UInt256 {
    if parent_base_fee.is_zero() {
        return initial_base_fee;
    }
    let target = gas_limit / ELASTICITY_MULTIPLIER;
    if target == 0 || gas_used == target {
        return parent_base_fee;
    }
    let parent = parent_base_fee.0[0] as u128;
    let bps = max_change_bps as u128;
    if gas_used > target {
        let delta_gas = (gas_used - target) as u128;
        let delta = (parent * delta_gas * bps / target as u128 / 10_000).max(1);
        UInt256::from_u64(parent_base_fee.0[0].saturating_add(delta as u64))
    } else {
        let delta_gas = (target - gas_used) as u128;
        let delta = (parent * delta_gas * bps / target as u128 / 10_000).max(1);
        UInt256::from_u64((parent.saturating_sub(delta)) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_parent_base_fee_resets_to_initial() {
        let initial = UInt256::from_u64(1_000_000_000);
        assert_eq!(compute_next_base_fee(UInt256::ZERO, 100, 1000, 1_250, initial), initial);
    }

    #[test]
    fn usage_at_target_leaves_base_fee_unchanged() {
        let parent = UInt256::from_u64(1_000);
        assert_eq!(compute_next_base_fee(parent, 500, 1_000, 1_250, UInt256::ZERO), parent);
    }

    #[test]
    fn full_block_increases_base_fee_by_at_most_12_5_percent() {
        let parent = UInt256::from_u64(1_000);
        let next = compute_next_base_fee(parent, 1_000, 1_000, 1_250, UInt256::ZERO);
        assert!(next.0[0] > parent.0[0]);
        assert!(next.0[0] <= parent.0[0] + parent.0[0] / 8);
    }

    #[test]
    fn empty_block_decreases_base_fee_but_floors_at_zero() {
        let parent = UInt256::from_u64(4);
        let next = compute_next_base_fee(parent, 0, 1_000, 1_250, UInt256::ZERO);
        assert!(next.0[0] < parent.0[0]);
        let very_low = compute_next_base_fee(UInt256::from_u64(1), 0, 1_000, 1_250, UInt256::ZERO);
        assert_eq!(very_low, UInt256::ZERO);
    }
}
