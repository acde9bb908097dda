//! Transaction signing-payload verification and the ordered stateless and
//! stateful admission validator transactions must pass before entering the
//! mempool or being included in a block (spec.md §4.4).

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

pub mod validate;

pub use validate::{validate_stateful, validate_stateless, BLOCK_GAS_LIMIT_DEFAULT};
