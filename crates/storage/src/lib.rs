//! Storage backends implementing `basalt_api::storage`: an in-memory
//! reference store for tests and the harness, and a durable `redb`-backed
//! store for a running node.

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

pub mod memory;
pub mod redb_store;

pub use memory::{MemoryKvStore, MemoryNodeStore};
pub use redb_store::{RedbKvStore, RedbNodeStore};
