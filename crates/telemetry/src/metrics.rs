//! Prometheus metric sinks for the pieces of the system the spec calls out
//! as needing observability: mempool occupancy, block production latency,
//! and consensus view changes.

// Registration against the default registry with a fixed, unique name is
// infallible in practice; relaxed here rather than threading a Result
// through every counter increment call site.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};

pub static MEMPOOL_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("basalt_mempool_size", "Number of transactions currently pooled")
        .expect("metric registered exactly once")
});

pub static BLOCKS_PRODUCED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("basalt_blocks_produced_total", "Total blocks sealed by this node")
        .expect("metric registered exactly once")
});

pub static VIEW_CHANGES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("basalt_view_changes_total", "Total consensus view changes observed")
        .expect("metric registered exactly once")
});

pub static BLOCK_EXECUTION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "basalt_block_execution_seconds",
        "Wall-clock time spent executing a block's transactions"
    )
    .expect("metric registered exactly once")
});
