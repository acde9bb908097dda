use basalt_chain::ChainError;
use basalt_mempool::MempoolError;
use basalt_types::{ConsensusError, StateError};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("not the expected leader for this view")]
    NotLeader,
}
