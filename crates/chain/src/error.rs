use basalt_types::StateError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("parent hash mismatch")]
    InvalidParentHash,
    #[error("block number {got} does not follow tip {expected}")]
    InvalidBlockNumber { expected: u64, got: u64 },
    #[error("timestamp {got} does not exceed parent timestamp {parent}")]
    InvalidTimestamp { parent: u64, got: u64 },
    #[error("unknown block: {0}")]
    UnknownBlock(String),
    #[error("execution error: {0}")]
    Execution(#[from] basalt_execution::ExecutionError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}
