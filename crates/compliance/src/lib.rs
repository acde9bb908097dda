//! The compliance gate: traditional attestation checks and the ZK proof
//! alternative path that policy-governed token transfers must pass
//! (spec.md §4.7).

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

pub mod attestation;
pub mod audit;
pub mod gate;
pub mod host;

pub use attestation::{Attestation, AttestationSource, InMemoryNullifierSet, NullifierSet};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditLog, NullAuditLog};
pub use gate::{check_traditional, check_transfer, check_zk};
pub use host::{ComplianceHost, GenesisComplianceHost, NullComplianceHost};
