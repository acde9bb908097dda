use basalt_types::StateError;

/// Failures that abort the whole transaction before a receipt can be built
/// at all — distinct from an `ExecError`, which still produces a failed
/// receipt. Surfacing one of these to the block builder means the candidate
/// transaction is skipped, not included (spec.md §4.6 builder algorithm).
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),
}
