//! The pluggable `ConsensusEngine` contract the pipelined BFT engine in
//! `basalt-consensus` implements (spec.md §7).

use async_trait::async_trait;
use basalt_types::{Address, Block, ConsensusError, EquivocationEvidence};

/// What the local node should do in the current (height, view).
#[derive(Debug, Clone)]
pub enum ConsensusDecision {
    /// We are leader for this (height, view); produce and broadcast a proposal.
    ProduceBlock { view: u64, expected_timestamp_ms: u64 },
    /// We are not leader; wait for a PROPOSE from the expected leader.
    WaitForProposal { expected_leader: Address },
    /// No progress for longer than the current view timeout; move to view + 1.
    ProposeViewChange { view: u64 },
    Stall,
}

/// Applies slashing/quarantine consequences for verified misbehavior. Kept
/// distinct from `ConsensusEngine` so a penalty policy can be swapped
/// without touching vote-counting logic.
#[async_trait]
pub trait PenaltyMechanism: Send + Sync {
    async fn apply_equivocation_slash(
        &self,
        evidence: &EquivocationEvidence,
    ) -> Result<(), ConsensusError>;
}

/// The pluggable pipelined-BFT engine contract. A single implementor drives
/// the PROPOSE/PREPARE/PRE-COMMIT/COMMIT phases across overlapping heights.
#[async_trait]
pub trait ConsensusEngine: PenaltyMechanism {
    /// Decide what to do for this (height, view) given the parent block.
    async fn decide(&mut self, height: u64, view: u64, parent: &Block) -> ConsensusDecision;

    /// Validate and vote on a proposal received from the network.
    async fn handle_proposal(&mut self, block: Block) -> Result<(), ConsensusError>;

    /// Record a PREPARE, PRE-COMMIT, or COMMIT vote from a peer; returns
    /// `Ok(Some(block))` once the relevant phase reaches quorum and the
    /// pipeline can advance.
    async fn handle_vote(&mut self, phase_message: &[u8]) -> Result<Option<Block>, ConsensusError>;

    async fn handle_view_change(&mut self, proof_bytes: &[u8]) -> Result<(), ConsensusError>;

    /// Clears height-local vote tallies once a block at that height commits.
    fn reset(&mut self, height: u64);
}
