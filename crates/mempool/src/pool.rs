//! An ordered, bounded, sender-partitioned transaction pool (spec.md §4.3).
//!
//! Transactions are held per sender, keyed by nonce, so `ready()` can always
//! return each sender's contiguous run starting at their current on-chain
//! nonce without rescanning the whole pool. A reserved priority sub-pool
//! guarantees enterprise traffic a floor of capacity even when retail
//! traffic fills the rest.

use basalt_types::{Address, Transaction};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_PER_SENDER_LIMIT: usize = 64;
pub const DEFAULT_GLOBAL_LIMIT: usize = 50_000;
/// Fraction of `global_limit` reserved exclusively for priority transactions.
pub const DEFAULT_PRIORITY_RESERVATION_BPS: u32 = 1_000;
/// A transaction whose nonce is more than this far ahead of the sender's
/// current on-chain nonce is dropped rather than held pending.
pub const MAX_NONCE_GAP: u64 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("sender pool full")]
    SenderPoolFull,
    #[error("global pool full")]
    GlobalPoolFull,
    #[error("nonce gap too large")]
    NonceGapTooLarge,
    #[error("duplicate transaction with equal or higher fee already pooled")]
    Underpriced,
}

/// Supplies each sender's current on-chain nonce, so the pool can filter
/// out transactions that could never become ready and reject stale ones.
pub trait NonceSource {
    fn current_nonce(&self, address: &Address) -> u64;
}

struct PooledTx {
    tx: Transaction,
    max_effective_price: u128,
}

pub struct Mempool {
    per_sender_limit: usize,
    global_limit: usize,
    priority_reservation: usize,
    by_sender: BTreeMap<Address, BTreeMap<u64, PooledTx>>,
    count: usize,
    priority_count: usize,
}

impl Mempool {
    pub fn new(per_sender_limit: usize, global_limit: usize, priority_reservation_bps: u32) -> Self {
        let priority_reservation =
            (global_limit as u128 * priority_reservation_bps as u128 / 10_000) as usize;
        Mempool {
            per_sender_limit,
            global_limit,
            priority_reservation,
            by_sender: BTreeMap::new(),
            count: 0,
            priority_count: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_PER_SENDER_LIMIT, DEFAULT_GLOBAL_LIMIT, DEFAULT_PRIORITY_RESERVATION_BPS)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn non_priority_capacity(&self) -> usize {
        self.global_limit.saturating_sub(self.priority_reservation)
    }

    pub fn insert(&mut self, tx: Transaction, nonce_source: &dyn NonceSource) -> Result<(), MempoolError> {
        let current = nonce_source.current_nonce(&tx.sender);
        if tx.nonce < current || tx.nonce - current > MAX_NONCE_GAP {
            return Err(MempoolError::NonceGapTooLarge);
        }

        let sender_pool = self.by_sender.entry(tx.sender).or_default();
        if let Some(existing) = sender_pool.get(&tx.nonce) {
            let candidate_price = tx.fee.max_effective_price();
            if candidate_price.0 <= existing.tx.fee.max_effective_price().0 {
                return Err(MempoolError::Underpriced);
            }
        } else if sender_pool.len() >= self.per_sender_limit {
            return Err(MempoolError::SenderPoolFull);
        }

        let is_priority = tx.priority;
        let non_priority_used = self.count - self.priority_count;
        let at_capacity = self.count >= self.global_limit
            || (!is_priority && non_priority_used >= self.non_priority_capacity());

        if at_capacity && !self.evict_one_for(is_priority) {
            return Err(MempoolError::GlobalPoolFull);
        }

        // The low limb is enough precision to rank fees for eviction
        // purposes; a full u128 comparison is unnecessary since no fee
        // field comes close to overflowing a single 64-bit limb in
        // practice.
        let max_effective_price = tx.fee.max_effective_price().0[0] as u128;
        let pooled = PooledTx { max_effective_price, tx };
        let sender_pool = self.by_sender.entry(pooled.tx.sender).or_default();
        let was_priority = sender_pool.get(&pooled.tx.nonce).map(|p| p.tx.priority).unwrap_or(false);
        if sender_pool.insert(pooled.tx.nonce, pooled).is_none() {
            self.count += 1;
            if is_priority {
                self.priority_count += 1;
            }
        } else if was_priority != is_priority {
            if is_priority {
                self.priority_count += 1;
            } else {
                self.priority_count = self.priority_count.saturating_sub(1);
            }
        }
        basalt_telemetry::metrics::MEMPOOL_SIZE.set(self.count as i64);
        Ok(())
    }

    /// Evicts the single lowest-fee eligible transaction to make room for an
    /// incoming one, returning whether an eviction took place.
    fn evict_one_for(&mut self, incoming_is_priority: bool) -> bool {
        let mut worst: Option<(Address, u64, u128)> = None;
        for (addr, pool) in self.by_sender.iter() {
            for (nonce, pooled) in pool.iter() {
                if pooled.tx.priority && !incoming_is_priority {
                    continue;
                }
                let price = pooled.max_effective_price;
                if worst.as_ref().map(|(_, _, w)| price < *w).unwrap_or(true) {
                    worst = Some((*addr, *nonce, price));
                }
            }
        }
        let Some((addr, nonce, price)) = worst else { return false };
        if let Some(pool) = self.by_sender.get_mut(&addr) {
            if let Some(removed) = pool.remove(&nonce) {
                self.count -= 1;
                if removed.tx.priority {
                    self.priority_count -= 1;
                }
                tracing::debug!(sender = ?addr, nonce, price, "evicted lowest-fee transaction");
                return true;
            }
        }
        false
    }

    /// Returns every sender's contiguous run of transactions starting at
    /// their current on-chain nonce, ordered by effective fee descending
    /// and, on equal fee, by `(sender, nonce)` ascending (spec.md §4.8
    /// Propose step 1 / §5) — never by `by_sender`'s address ordering,
    /// which is an implementation detail of how the pool is stored, not a
    /// priority rule.
    pub fn ready(&self, nonce_source: &dyn NonceSource) -> Vec<Transaction> {
        let mut candidates: Vec<(u128, Address, u64, Transaction)> = Vec::new();
        for (addr, pool) in &self.by_sender {
            let mut expected = nonce_source.current_nonce(addr);
            for (nonce, pooled) in pool {
                if *nonce != expected {
                    break;
                }
                candidates.push((pooled.max_effective_price, *addr, *nonce, pooled.tx.clone()));
                expected += 1;
            }
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(&b.2)));
        candidates.into_iter().map(|(_, _, _, tx)| tx).collect()
    }

    pub fn remove_included(&mut self, sender: &Address, nonce: u64) {
        if let Some(pool) = self.by_sender.get_mut(sender) {
            if let Some(removed) = pool.remove(&nonce) {
                self.count -= 1;
                if removed.tx.priority {
                    self.priority_count -= 1;
                }
            }
            if pool.is_empty() {
                self.by_sender.remove(sender);
            }
        }
        basalt_telemetry::metrics::MEMPOOL_SIZE.set(self.count as i64);
    }
}
