//! Weighted validator set and leader rotation (spec.md §4.8).

// Indexing into `UInt256`'s fixed 4-limb array is always in bounds; see
// the identical carve-out in `basalt_chain::basefee`.
#![allow(clippy::indexing_slicing)]

use basalt_types::{Address, UInt256};

/// Fixed-point reputation scale: `10_000` == a perfect score of `1.0`.
pub const REPUTATION_SCALE: u32 = 10_000;
/// Validators below this reputation are excluded from routing and voting.
pub const REPUTATION_EXCLUSION_THRESHOLD: u32 = 2_000;

const WEIGHT_AVAILABILITY_BPS: u32 = 2_500;
const WEIGHT_LATENCY_BPS: u32 = 1_500;
const WEIGHT_VALIDITY_BPS: u32 = 3_500;
const WEIGHT_COMPLIANCE_BPS: u32 = 2_500;

const TIMEOUT_PENALTY_BPS: u32 = 500;
const PROPOSAL_REWARD_BPS: u32 = 100;

/// The four components composing a validator's reputation score, each on
/// the same `0..=REPUTATION_SCALE` fixed-point scale (spec.md §4.8
/// "composed of availability, response latency, block validity, and
/// protocol compliance with fixed weights").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReputationComponents {
    pub availability: u32,
    pub latency: u32,
    pub validity: u32,
    pub compliance: u32,
}

impl ReputationComponents {
    pub fn perfect() -> Self {
        ReputationComponents {
            availability: REPUTATION_SCALE,
            latency: REPUTATION_SCALE,
            validity: REPUTATION_SCALE,
            compliance: REPUTATION_SCALE,
        }
    }

    pub fn score(&self) -> u32 {
        let weighted = self.availability as u64 * WEIGHT_AVAILABILITY_BPS as u64
            + self.latency as u64 * WEIGHT_LATENCY_BPS as u64
            + self.validity as u64 * WEIGHT_VALIDITY_BPS as u64
            + self.compliance as u64 * WEIGHT_COMPLIANCE_BPS as u64;
        (weighted / REPUTATION_SCALE as u64) as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: Address,
    pub bls_public_key: Vec<u8>,
    pub stake: UInt256,
    pub reputation: ReputationComponents,
}

impl Validator {
    /// `weight = stake * reputation`, both collapsed onto the low 64-bit
    /// limb like every other fee/weight quantity in this workspace
    /// (see `basalt_chain::basefee`) — validator stakes never approach
    /// the range where that loses precision.
    pub fn weight(&self) -> u128 {
        self.stake.0[0] as u128 * self.reputation.score() as u128 / REPUTATION_SCALE as u128
    }

    pub fn is_eligible(&self) -> bool {
        self.reputation.score() >= REPUTATION_EXCLUSION_THRESHOLD
    }
}

/// The active validator set at a given height. Leader rotation and quorum
/// thresholds are computed over eligible validators only.
#[derive(Clone, Debug, Default)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Self {
        ValidatorSet { validators }
    }

    pub fn eligible(&self) -> Vec<&Validator> {
        self.validators.iter().filter(|v| v.is_eligible()).collect()
    }

    pub fn total_weight(&self) -> u128 {
        self.eligible().iter().map(|v| v.weight()).sum()
    }

    /// `2f+1` in weight terms: strictly more than two-thirds of the
    /// eligible set's total weight (spec.md §4.8 "aggregates >= 2f+1").
    pub fn quorum_threshold(&self) -> u128 {
        (self.total_weight() * 2) / 3 + 1
    }

    /// `leader = validators[weightedIndex(view mod totalWeight)]`
    /// (spec.md §4.8 "Leader rotation"): walk the eligible set in order,
    /// accumulating weight, until the cumulative weight exceeds the
    /// offset.
    pub fn leader_for_view(&self, view: u64) -> Option<&Validator> {
        let eligible = self.eligible();
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let offset = view as u128 % total;
        let mut cumulative = 0u128;
        for validator in &eligible {
            cumulative += validator.weight();
            if cumulative > offset {
                return Some(validator);
            }
        }
        eligible.last().copied()
    }

    pub fn get(&self, address: &Address) -> Option<&Validator> {
        self.validators.iter().find(|v| &v.address == address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Validator> {
        self.validators.iter_mut().find(|v| &v.address == address)
    }

    /// Applies the fixed reputation penalty for a timeout or invalid
    /// proposal (spec.md §4.8 "Reputation penalty 0.05 per timeout").
    pub fn penalize(&mut self, address: &Address) {
        if let Some(v) = self.get_mut(address) {
            v.reputation.validity = v.reputation.validity.saturating_sub(TIMEOUT_PENALTY_BPS);
        }
    }

    /// Applies the fixed reward for a successful proposal (spec.md §4.8
    /// "+0.01 per successful proposal").
    pub fn reward_proposal(&mut self, address: &Address) {
        if let Some(v) = self.get_mut(address) {
            v.reputation.validity = (v.reputation.validity + PROPOSAL_REWARD_BPS).min(REPUTATION_SCALE);
        }
    }

    /// Zeroes a slashed validator's stake so it drops out of the eligible
    /// set on the next computation (spec.md §4.8 "100% stake slashing").
    pub fn slash(&mut self, address: &Address) {
        if let Some(v) = self.get_mut(address) {
            v.stake = UInt256::ZERO;
        }
    }
}
