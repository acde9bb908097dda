//! Block builder and chain manager: base-fee adjustment, transaction
//! packing, append invariants, and ancient-body eviction (spec.md §4.6).

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

pub mod basefee;
pub mod builder;
pub mod error;
pub mod manager;

pub use basefee::compute_next_base_fee;
pub use builder::build_block;
pub use error::ChainError;
pub use manager::ChainManager;
