//! A non-consensus audit trail for compliance decisions. Every node can
//! record which check rejected a transfer and when, for operators and
//! regulators; none of it participates in a hash, a proof, or a consensus
//! decision (SPEC_FULL.md §6 "compliance audit timestamps").

use basalt_types::{Address, ComplianceError, Hash256};

/// One compliance evaluation outcome, wall-clock stamped by the node that
/// observed it. `wall_clock_ms` is informational only — every field that
/// enters a hash or a proof uses the block timestamp instead, never this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEvent {
    pub tx_hash: Hash256,
    pub party: Address,
    pub block_height: u64,
    pub wall_clock_ms: u64,
    pub outcome: Result<(), ComplianceError>,
}

/// Where audit events go. Kept separate from [`crate::gate`]'s pure checks
/// so the gate itself stays free of I/O and the host decides whether
/// audit events are logged, persisted, or dropped.
pub trait AuditSink: Send + Sync {
    fn record(&mut self, event: AuditEvent);
}

/// Appends every event to an in-memory buffer, for tests and single-process
/// deployments that don't need durable audit storage.
#[derive(Default)]
pub struct InMemoryAuditLog {
    events: Vec<AuditEvent>,
}

impl InMemoryAuditLog {
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn rejections(&self) -> impl Iterator<Item = &AuditEvent> {
        self.events.iter().filter(|event| event.outcome.is_err())
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&mut self, event: AuditEvent) {
        self.events.push(event);
    }
}

/// Drops every event. Used wherever an `AuditSink` is required but auditing
/// is genuinely out of scope (most unit tests).
#[derive(Default)]
pub struct NullAuditLog;

impl AuditSink for NullAuditLog {
    fn record(&mut self, _event: AuditEvent) {}
}
