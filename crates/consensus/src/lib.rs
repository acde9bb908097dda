//! Pipelined three-phase BFT consensus: weighted validator set, leader
//! rotation, vote tallying, key rotation, subnet anchoring, and the engine
//! tying them together (spec.md §4.8).

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

pub mod engine;
pub mod key_rotation;
pub mod subnet;
pub mod validator;
pub mod votes;

pub use engine::PipelinedBftEngine;
pub use key_rotation::{activate_due_rotations, request_rotation, PendingRotation};
pub use subnet::{effective_anchor_cadence, is_anchor_due, verify_anchor, SubnetAnchor};
pub use validator::{ReputationComponents, Validator, ValidatorSet};
pub use votes::{Phase, PhaseVote, QuorumCertificate, VoteTracker};
