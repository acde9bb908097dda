//! Wires the mempool, block builder, chain manager, and BFT engine into one
//! struct, the way a real validator process would, but in-process and
//! single-threaded so end-to-end scenarios (spec.md §8) can be driven
//! directly from a test without networking.

use crate::error::NodeError;
use basalt_api::consensus::{ConsensusDecision, ConsensusEngine};
use basalt_api::state::StateManager;
use basalt_api::storage::NodeStore;
use basalt_chain::{build_block, ChainManager};
use basalt_compliance::ComplianceHost;
use basalt_consensus::{PipelinedBftEngine, ValidatorSet};
use basalt_execution::Sandbox;
use basalt_mempool::{Mempool, NonceSource};
use basalt_state::db::StateDb;
use basalt_types::{AccountState, Address, Block, BlockHeader, ChainParams, EquivocationEvidence, Receipt, Transaction};
use std::cell::RefCell;

/// Looks up each sender's current on-chain nonce by borrowing the node's
/// state database for the duration of a single `Mempool::ready` call.
/// `NonceSource::current_nonce` only has `&self` to work with, so the
/// mutable state handle is wrapped in a `RefCell` rather than threaded
/// through the mempool's API.
struct StateNonceSource<'a> {
    state: RefCell<&'a mut dyn StateManager>,
}

impl NonceSource for StateNonceSource<'_> {
    fn current_nonce(&self, address: &Address) -> u64 {
        self.state
            .borrow_mut()
            .get_account(address)
            .ok()
            .flatten()
            .map(|account| account.nonce)
            .unwrap_or(0)
    }
}

/// One validator's full local pipeline: pending transactions in, a sealed,
/// appended block out.
pub struct Node<'s> {
    our_address: Address,
    params: ChainParams,
    mempool: Mempool,
    state: StateDb<'s>,
    chain: ChainManager,
    engine: PipelinedBftEngine,
    sandbox: Box<dyn Sandbox>,
    compliance: Box<dyn ComplianceHost>,
}

impl<'s> Node<'s> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'s dyn NodeStore,
        genesis: BlockHeader,
        params: ChainParams,
        validators: ValidatorSet,
        our_address: Address,
        sandbox: Box<dyn Sandbox>,
        compliance: Box<dyn ComplianceHost>,
    ) -> Self {
        let chain = ChainManager::new(genesis, params.clone());
        let engine = PipelinedBftEngine::new(
            our_address,
            validators,
            params.view_timeout_initial_ms,
            params.view_timeout_max_ms,
            params.min_block_interval_ms,
        );
        Node {
            our_address,
            mempool: Mempool::new(params.mempool_per_sender_limit, params.mempool_global_limit, 1_000),
            state: StateDb::new(store, None),
            chain,
            engine,
            sandbox,
            compliance,
            params,
        }
    }

    pub fn tip_number(&self) -> u64 {
        self.chain.tip_number()
    }

    /// Seeds an account directly, bypassing the mempool/builder path —
    /// test and genesis-allocation setup only.
    pub fn fund_account(&mut self, address: &Address, account: AccountState) -> Result<(), NodeError> {
        self.state.put_account(address, account)?;
        Ok(())
    }

    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), NodeError> {
        let source = StateNonceSource { state: RefCell::new(&mut self.state) };
        self.mempool.insert(tx, &source)?;
        Ok(())
    }

    /// Asks the consensus engine what the local node should do at `view`
    /// for the next height. `decide` only reads the parent's header
    /// (number and timestamp), so a body-less `Block` stands in for the
    /// actual tip block here.
    pub async fn decide(&mut self, view: u64) -> ConsensusDecision {
        let parent = Block { header: self.chain.tip_header().clone(), transactions: vec![], slashing_evidence: vec![] };
        self.engine.decide(self.chain.tip_number() + 1, view, &parent).await
    }

    /// Packs every ready mempool transaction into a block, executes it
    /// against local state, appends it to the chain, and drains the
    /// included transactions from the mempool.
    pub fn produce_block(
        &mut self,
        view: u64,
        timestamp: u64,
        slashing_evidence: &[EquivocationEvidence],
    ) -> Result<(Block, Vec<Receipt>), NodeError> {
        let candidates = {
            let source = StateNonceSource { state: RefCell::new(&mut self.state) };
            self.mempool.ready(&source)
        };

        let parent = self.chain.tip_header().clone();
        let (block, receipts) = build_block(
            &parent,
            &candidates,
            self.our_address,
            timestamp,
            view,
            &mut self.state,
            &self.params,
            self.sandbox.as_ref(),
            self.compliance.as_mut(),
            slashing_evidence,
        )?;

        self.chain.append(block.clone(), receipts.clone())?;
        for included in &block.transactions {
            self.mempool.remove_included(&included.sender, included.nonce);
        }
        Ok((block, receipts))
    }
}
