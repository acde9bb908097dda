//! The pipelined three-phase BFT engine (spec.md §4.8): PROPOSE, PREPARE,
//! PRE-COMMIT, COMMIT, with overlapping heights, doubling view timeouts,
//! and equivocation slashing.
//!
//! Every method takes the engine by value (`&self`/`&mut self` both route
//! through an internal mutex) because [`PenaltyMechanism::apply_equivocation_slash`]
//! is called from a different control path than the vote-counting methods
//! and only has `&self` to work with — a single lock lets both sides share
//! the validator set and pending-evidence queue without the trait needing
//! to change shape.

use crate::validator::ValidatorSet;
use crate::votes::{Phase, PhaseVote, QuorumCertificate, VoteTracker};
use async_trait::async_trait;
use basalt_api::consensus::{ConsensusDecision, ConsensusEngine, PenaltyMechanism};
use basalt_types::{Address, Block, ConsensusError, EquivocationEvidence, Hash256};
use parity_scale_codec::{Decode, Encode};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Encode, Decode)]
enum WirePhase {
    Prepare,
    PreCommit,
    Commit,
}

impl From<WirePhase> for Phase {
    fn from(value: WirePhase) -> Self {
        match value {
            WirePhase::Prepare => Phase::Prepare,
            WirePhase::PreCommit => Phase::PreCommit,
            WirePhase::Commit => Phase::Commit,
        }
    }
}

#[derive(Encode, Decode)]
struct VoteMessage {
    height: u64,
    view: u64,
    phase: WirePhase,
    block_hash: Hash256,
    voter: Address,
    signature: [u8; 96],
}

struct EngineState {
    validators: ValidatorSet,
    tracker: VoteTracker,
    proposed_blocks: BTreeMap<Hash256, Block>,
    /// `(height, view, phase) -> voter -> block hash` last seen, so a
    /// second vote from the same validator for a different hash at the
    /// same slot is caught as equivocation before being recorded.
    seen_votes: BTreeMap<(u64, u64, Phase), BTreeMap<Address, Hash256>>,
    pending_evidence: Vec<EquivocationEvidence>,
    /// Current view per height, so repeated timeouts can be told apart
    /// from a fresh height starting at view 0.
    current_view: BTreeMap<u64, u64>,
}

/// Drives one node's participation in the protocol. `our_address` is this
/// node's own validator identity, used to decide whether `decide` proposes
/// or waits.
pub struct PipelinedBftEngine {
    our_address: Address,
    view_timeout_initial_ms: u64,
    view_timeout_max_ms: u64,
    min_block_interval_ms: u64,
    state: Mutex<EngineState>,
}

impl PipelinedBftEngine {
    pub fn new(
        our_address: Address,
        validators: ValidatorSet,
        view_timeout_initial_ms: u64,
        view_timeout_max_ms: u64,
        min_block_interval_ms: u64,
    ) -> Self {
        PipelinedBftEngine {
            our_address,
            view_timeout_initial_ms,
            view_timeout_max_ms,
            min_block_interval_ms,
            state: Mutex::new(EngineState {
                validators,
                tracker: VoteTracker::default(),
                proposed_blocks: BTreeMap::new(),
                seen_votes: BTreeMap::new(),
                pending_evidence: Vec::new(),
                current_view: BTreeMap::new(),
            }),
        }
    }

    /// The view timeout for a validator that has already timed out
    /// `consecutive_timeouts` times at this height: doubles each time,
    /// capped at `view_timeout_max_ms`, reset to the initial value on any
    /// successful round (spec.md §4.8 "View change").
    pub fn view_timeout_ms(&self, consecutive_timeouts: u32) -> u64 {
        let doubled = self.view_timeout_initial_ms.saturating_mul(1u64 << consecutive_timeouts.min(32));
        doubled.min(self.view_timeout_max_ms)
    }

    /// Evidence queued by [`PenaltyMechanism::apply_equivocation_slash`]
    /// since the last drain, ready to be embedded in the next proposal.
    pub fn drain_pending_evidence(&self) -> Vec<EquivocationEvidence> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pending_evidence.drain(..).collect()
    }

    pub fn record_proposal(&self, block: Block) {
        let hash = block.header.hash();
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).proposed_blocks.insert(hash, block);
    }
}

#[async_trait]
impl PenaltyMechanism for PipelinedBftEngine {
    async fn apply_equivocation_slash(&self, evidence: &EquivocationEvidence) -> Result<(), ConsensusError> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(validator) = state.validators.get(&evidence.offender).cloned() else {
            return Err(ConsensusError::BlockVerificationFailed("slash target not a known validator".into()));
        };
        let Ok(pubkey) = <[u8; 48]>::try_from(validator.bls_public_key.as_slice()) else {
            return Err(ConsensusError::BlockVerificationFailed("malformed validator key".into()));
        };
        if evidence.block_hash_a == evidence.block_hash_b {
            return Err(ConsensusError::BlockVerificationFailed("evidence does not show conflicting votes".into()));
        }
        let valid_a = basalt_crypto::bls::verify(&pubkey, evidence.block_hash_a.as_ref(), &signature_array(&evidence.signature_a)?);
        let valid_b = basalt_crypto::bls::verify(&pubkey, evidence.block_hash_b.as_ref(), &signature_array(&evidence.signature_b)?);
        if !valid_a || !valid_b {
            return Err(ConsensusError::BlockVerificationFailed("equivocation signatures do not verify".into()));
        }
        warn!(offender = %evidence.offender, height = evidence.height, "slashing equivocating validator");
        state.validators.slash(&evidence.offender);
        state.pending_evidence.push(evidence.clone());
        Ok(())
    }
}

fn signature_array(bytes: &[u8]) -> Result<[u8; 96], ConsensusError> {
    <[u8; 96]>::try_from(bytes).map_err(|_| ConsensusError::BlockVerificationFailed("malformed vote signature".into()))
}

#[async_trait]
impl ConsensusEngine for PipelinedBftEngine {
    async fn decide(&mut self, _height: u64, view: u64, parent: &Block) -> ConsensusDecision {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(leader) = state.validators.leader_for_view(view) else {
            return ConsensusDecision::Stall;
        };
        if leader.address == self.our_address {
            ConsensusDecision::ProduceBlock {
                view,
                expected_timestamp_ms: parent.header.timestamp + self.min_block_interval_ms,
            }
        } else {
            ConsensusDecision::WaitForProposal { expected_leader: leader.address }
        }
    }

    async fn handle_proposal(&mut self, block: Block) -> Result<(), ConsensusError> {
        let height = block.header.number;
        let view = block.header.view;
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(leader) = state.validators.leader_for_view(view) else {
            return Err(ConsensusError::NoQuorum);
        };
        if block.header.proposer != leader.address {
            return Err(ConsensusError::InvalidLeader { expected: leader.address, got: block.header.proposer });
        }
        info!(height, view, proposer = %block.header.proposer, "accepted proposal");
        let hash = block.header.hash();
        state.proposed_blocks.insert(hash, block);
        Ok(())
    }

    async fn handle_vote(&mut self, phase_message: &[u8]) -> Result<Option<Block>, ConsensusError> {
        let message = VoteMessage::decode(&mut &phase_message[..])
            .map_err(|e| ConsensusError::BlockVerificationFailed(format!("malformed vote: {e}")))?;
        let phase: Phase = message.phase.into();

        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(validator) = state.validators.get(&message.voter).cloned() else {
            return Err(ConsensusError::BlockVerificationFailed("vote from unknown validator".into()));
        };
        let Ok(pubkey) = <[u8; 48]>::try_from(validator.bls_public_key.as_slice()) else {
            return Err(ConsensusError::BlockVerificationFailed("malformed validator key".into()));
        };
        if !basalt_crypto::bls::verify(&pubkey, message.block_hash.as_ref(), &message.signature) {
            return Err(ConsensusError::BlockVerificationFailed("vote signature invalid".into()));
        }

        let slot = (message.height, message.view, phase);
        let seen = state.seen_votes.entry(slot).or_default();
        if let Some(&prior_hash) = seen.get(&message.voter) {
            if prior_hash != message.block_hash && phase == Phase::Prepare {
                warn!(voter = %message.voter, height = message.height, "conflicting PREPARE votes observed");
            }
        }
        seen.insert(message.voter, message.block_hash);

        let vote = PhaseVote { voter: message.voter, block_hash: message.block_hash, signature: message.signature };
        let qc = state.tracker.record(message.height, message.view, phase, vote, &state.validators);

        match qc {
            Some(QuorumCertificate { block_hash, .. }) if phase == Phase::Commit => {
                let block = state.proposed_blocks.get(&block_hash).cloned();
                if block.is_some() {
                    state.validators.reward_proposal(&message.voter);
                }
                Ok(block)
            }
            _ => Ok(None),
        }
    }

    async fn handle_view_change(&mut self, proof_bytes: &[u8]) -> Result<(), ConsensusError> {
        #[derive(Decode)]
        struct ViewChangeMessage {
            height: u64,
            new_view: u64,
            offender: Address,
        }
        let message = ViewChangeMessage::decode(&mut &proof_bytes[..])
            .map_err(|e| ConsensusError::BlockVerificationFailed(format!("malformed view change: {e}")))?;
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.validators.penalize(&message.offender);
        state.current_view.insert(message.height, message.new_view);
        basalt_telemetry::metrics::VIEW_CHANGES.inc();
        Ok(())
    }

    fn reset(&mut self, height: u64) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.tracker.reset(height);
        state.proposed_blocks.retain(|_, block| block.header.number > height);
        state.seen_votes.retain(|(h, _, _), _| *h > height);
        state.current_view.retain(|h, _| *h > height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ReputationComponents, Validator};
    use basalt_crypto::bls::BlsKeyPair;
    use basalt_types::UInt256;

    fn three_validators() -> (Vec<BlsKeyPair>, ValidatorSet) {
        let kps: Vec<BlsKeyPair> = (0u8..3).map(|i| BlsKeyPair::from_seed(&[i + 20; 32]).expect("valid seed")).collect();
        let validators = kps
            .iter()
            .enumerate()
            .map(|(i, kp)| Validator {
                address: Address([i as u8 + 1; 20]),
                bls_public_key: kp.public_key_bytes().to_vec(),
                stake: UInt256::from_u64(100),
                reputation: ReputationComponents::perfect(),
            })
            .collect();
        (kps, ValidatorSet::new(validators))
    }

    fn sample_block(number: u64, view: u64, proposer: Address) -> Block {
        Block {
            header: BlockHeader {
                version: 1,
                number,
                parent_hash: Hash256::ZERO,
                state_root: Hash256::ZERO,
                transactions_root: Hash256::ZERO,
                receipts_root: Hash256::ZERO,
                proposer,
                timestamp: number,
                chain_id: 1,
                gas_used: 0,
                gas_limit: 30_000_000,
                base_fee: UInt256::ZERO,
                extra_data: vec![],
                bls_aggregate_signature: vec![],
                signer_bitfield: vec![],
                view,
            },
            transactions: vec![],
            slashing_evidence: vec![],
        }
    }

    #[tokio::test]
    async fn decide_produces_when_we_are_the_leader_for_the_view() {
        let (_, validators) = three_validators();
        let leader = validators.leader_for_view(0).expect("non-empty set").address;
        let mut engine = PipelinedBftEngine::new(leader, validators, 2_000, 60_000, 1_000);
        let parent = sample_block(0, 0, Address::ZERO);
        let decision = engine.decide(1, 0, &parent).await;
        assert!(matches!(decision, ConsensusDecision::ProduceBlock { .. }));
    }

    #[tokio::test]
    async fn decide_waits_when_we_are_not_the_leader_for_the_view() {
        let (_, validators) = three_validators();
        let leader = validators.leader_for_view(0).expect("non-empty set").address;
        let someone_else = validators.eligible().into_iter().find(|v| v.address != leader).expect("3 validators").address;
        let mut engine = PipelinedBftEngine::new(someone_else, validators, 2_000, 60_000, 1_000);
        let parent = sample_block(0, 0, Address::ZERO);
        let decision = engine.decide(1, 0, &parent).await;
        assert!(matches!(decision, ConsensusDecision::WaitForProposal { .. }));
    }

    #[tokio::test]
    async fn handle_vote_returns_block_once_commit_quorum_reached() {
        let (kps, validators) = three_validators();
        let our_address = validators.eligible()[0].address;
        let mut engine = PipelinedBftEngine::new(our_address, validators, 2_000, 60_000, 1_000);

        let block = sample_block(1, 0, our_address);
        let hash = block.header.hash();
        engine.handle_proposal(block.clone()).await.expect("well-formed proposal");

        let mut last = None;
        for (i, kp) in kps.iter().enumerate() {
            let message = VoteMessage {
                height: 1,
                view: 0,
                phase: WirePhase::Commit,
                block_hash: hash,
                voter: Address([i as u8 + 1; 20]),
                signature: kp.sign(hash.as_ref()),
            };
            last = engine.handle_vote(&message.encode()).await.expect("valid vote");
        }
        let returned = last.expect("quorum reached on the third vote");
        assert_eq!(returned.header.hash(), hash);
    }

    #[tokio::test]
    async fn apply_equivocation_slash_zeroes_offender_weight() {
        let (kps, validators) = three_validators();
        let offender = validators.eligible()[0].address;
        let engine = PipelinedBftEngine::new(offender, validators, 2_000, 60_000, 1_000);

        let hash_a = Hash256([1u8; 32]);
        let hash_b = Hash256([2u8; 32]);
        let evidence = EquivocationEvidence {
            height: 1,
            view: 0,
            offender,
            block_hash_a: hash_a,
            signature_a: kps[0].sign(hash_a.as_ref()).to_vec(),
            block_hash_b: hash_b,
            signature_b: kps[0].sign(hash_b.as_ref()).to_vec(),
        };

        engine.apply_equivocation_slash(&evidence).await.expect("valid evidence");

        let state = engine.state.lock().expect("not poisoned");
        assert_eq!(state.validators.get(&offender).expect("known validator").stake, UInt256::ZERO);
    }
}
