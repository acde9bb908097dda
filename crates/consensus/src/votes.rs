//! Per-phase vote tallies for the pipelined PROPOSE/PREPARE/PRE-COMMIT/COMMIT
//! protocol (spec.md §4.8). Heights pipeline independently, so every tally
//! is keyed by `(height, view)`, never by height alone.

use crate::validator::ValidatorSet;
use basalt_types::{Address, Hash256};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Prepare,
    PreCommit,
    Commit,
}

/// One validator's signed vote for a given phase and block hash.
#[derive(Clone, Debug)]
pub struct PhaseVote {
    pub voter: Address,
    pub block_hash: Hash256,
    pub signature: [u8; 96],
}

/// Accumulates votes for a single `(height, view, phase)` until quorum.
#[derive(Default)]
struct Tally {
    votes: BTreeMap<Address, PhaseVote>,
}

/// Tracks every in-flight phase across every pipelined height. A height is
/// dropped from the tracker once it finalizes (see [`VoteTracker::reset`]).
#[derive(Default)]
pub struct VoteTracker {
    tallies: BTreeMap<(u64, u64, Phase), Tally>,
}

/// A quorum certificate: the set of votes, all for the same block hash,
/// whose combined weight crossed the validator set's quorum threshold.
pub struct QuorumCertificate {
    pub block_hash: Hash256,
    pub signer_addresses: Vec<Address>,
    pub signatures: Vec<[u8; 96]>,
}

impl VoteTracker {
    /// Records `vote` and returns the quorum certificate if this vote was
    /// the one that pushed the tally for `(height, view, phase)` over
    /// threshold. A validator's later vote for a different block hash at
    /// the same `(height, view, phase)` silently overwrites its earlier
    /// one — the caller is responsible for treating that as equivocation
    /// evidence before calling this (see `engine::detect_equivocation`).
    pub fn record(
        &mut self,
        height: u64,
        view: u64,
        phase: Phase,
        vote: PhaseVote,
        validators: &ValidatorSet,
    ) -> Option<QuorumCertificate> {
        let tally = self.tallies.entry((height, view, phase)).or_default();
        tally.votes.insert(vote.voter, vote);

        let mut by_hash: BTreeMap<Hash256, Vec<&PhaseVote>> = BTreeMap::new();
        for vote in tally.votes.values() {
            by_hash.entry(vote.block_hash).or_default().push(vote);
        }

        let threshold = validators.quorum_threshold();
        for (hash, votes) in by_hash {
            let weight: u128 = votes
                .iter()
                .filter_map(|v| validators.get(&v.voter))
                .map(|v| v.weight())
                .sum();
            if weight >= threshold {
                return Some(QuorumCertificate {
                    block_hash: hash,
                    signer_addresses: votes.iter().map(|v| v.voter).collect(),
                    signatures: votes.iter().map(|v| v.signature).collect(),
                });
            }
        }
        None
    }

    /// Drops every tally at or below `height`, called once that height's
    /// block has committed and can no longer be re-voted.
    pub fn reset(&mut self, height: u64) {
        self.tallies.retain(|(h, _, _), _| *h > height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ReputationComponents, Validator};
    use basalt_types::UInt256;

    fn validators() -> ValidatorSet {
        ValidatorSet::new(vec![
            Validator { address: Address([1u8; 20]), bls_public_key: vec![], stake: UInt256::from_u64(100), reputation: ReputationComponents::perfect() },
            Validator { address: Address([2u8; 20]), bls_public_key: vec![], stake: UInt256::from_u64(100), reputation: ReputationComponents::perfect() },
            Validator { address: Address([3u8; 20]), bls_public_key: vec![], stake: UInt256::from_u64(100), reputation: ReputationComponents::perfect() },
        ])
    }

    #[test]
    fn quorum_reached_once_threshold_weight_votes_for_the_same_hash() {
        let validators = validators();
        let mut tracker = VoteTracker::default();
        let hash = Hash256([7u8; 32]);

        assert!(tracker
            .record(1, 0, Phase::Prepare, PhaseVote { voter: Address([1u8; 20]), block_hash: hash, signature: [0u8; 96] }, &validators)
            .is_none());
        assert!(tracker
            .record(1, 0, Phase::Prepare, PhaseVote { voter: Address([2u8; 20]), block_hash: hash, signature: [0u8; 96] }, &validators)
            .is_none());
        let qc = tracker
            .record(1, 0, Phase::Prepare, PhaseVote { voter: Address([3u8; 20]), block_hash: hash, signature: [0u8; 96] }, &validators)
            .expect("quorum reached at 3/3 weight");
        assert_eq!(qc.block_hash, hash);
        assert_eq!(qc.signer_addresses.len(), 3);
    }

    #[test]
    fn reset_drops_completed_heights() {
        let validators = validators();
        let mut tracker = VoteTracker::default();
        tracker.record(1, 0, Phase::Prepare, PhaseVote { voter: Address([1u8; 20]), block_hash: Hash256::ZERO, signature: [0u8; 96] }, &validators);
        tracker.reset(1);
        assert!(tracker.tallies.is_empty());
    }
}
