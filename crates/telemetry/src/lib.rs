//! Structured logging and Prometheus metrics, shared ambient infrastructure
//! for every Basalt binary and integration test harness.

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

pub mod init;
pub mod metrics;

pub use init::init_tracing;
