//! The contract execution sandbox boundary (spec.md §4.5 steps 3–4). This
//! crate does not host a contract language or bytecode interpreter — "no
//! dynamic code loading" is explicitly out of scope — but the deploy/call
//! transition still needs something to produce a gas outcome against which
//! the fork-commit-or-discard rule can be exercised. [`NullSandbox`] is that
//! minimal, deterministic cost model: gas scales with payload size, and
//! exceeding the caller's gas limit aborts exactly the way a real sandbox's
//! out-of-gas trap would.

use basalt_types::Hash256;

/// Bytes of calldata/constructor-code charged per unit of gas. Chosen simply
/// to be deterministic and cheap to reason about in tests.
pub const GAS_PER_BYTE: u64 = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SandboxOutcome {
    /// Ran to completion within the gas limit.
    Success { gas_used: u64 },
    /// A clean revert: the sandbox reports the gas it actually consumed
    /// before reverting (SPEC_FULL.md §6 open-question decision 1).
    Reverted { gas_used: u64, reason: String },
    /// Abnormal termination — trap, resource-limit abort, out-of-gas. Full
    /// `gas_limit` is charged regardless of how much was actually consumed.
    Aborted { reason: String },
}

impl SandboxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SandboxOutcome::Success { .. })
    }
}

pub trait Sandbox {
    /// Runs a contract's constructor, returning the outcome and (on success)
    /// the code hash to persist for future calls.
    fn deploy(&self, data: &[u8], gas_limit: u64) -> (SandboxOutcome, Hash256);

    /// Invokes an existing contract's code.
    fn call(&self, code_hash: Hash256, data: &[u8], gas_limit: u64) -> SandboxOutcome;
}

/// The deterministic reference sandbox: cost is linear in payload length,
/// code identity is the BLAKE3 hash of the deploying payload.
#[derive(Debug, Default)]
pub struct NullSandbox;

impl Sandbox for NullSandbox {
    fn deploy(&self, data: &[u8], gas_limit: u64) -> (SandboxOutcome, Hash256) {
        let code_hash = basalt_crypto::hash::blake3(data);
        let cost = data.len() as u64 * GAS_PER_BYTE;
        if cost > gas_limit {
            (SandboxOutcome::Aborted { reason: "out of gas during construction".into() }, code_hash)
        } else {
            (SandboxOutcome::Success { gas_used: cost }, code_hash)
        }
    }

    fn call(&self, _code_hash: Hash256, data: &[u8], gas_limit: u64) -> SandboxOutcome {
        let cost = data.len() as u64 * GAS_PER_BYTE;
        if cost > gas_limit {
            SandboxOutcome::Aborted { reason: "out of gas during call".into() }
        } else {
            SandboxOutcome::Success { gas_used: cost }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_within_budget_succeeds() {
        let sandbox = NullSandbox;
        let (outcome, _) = sandbox.deploy(&[0u8; 10], 1_000);
        assert_eq!(outcome, SandboxOutcome::Success { gas_used: 160 });
    }

    #[test]
    fn deploy_exceeding_budget_aborts() {
        let sandbox = NullSandbox;
        let (outcome, _) = sandbox.deploy(&vec![0u8; 100_000], 500);
        assert!(matches!(outcome, SandboxOutcome::Aborted { .. }));
    }
}
