//! In-memory ledger and the unconfigured ledger.

use crate::domain::{LedgerError, LedgerFact, LedgerReceipt, LedgerResult};
use crate::ports::outbound::Ledger;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BatchId, FactType, Timestamp};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Ledger held in memory, with switches for outages and lost acks.
pub struct InMemoryLedger {
    facts: RwLock<Vec<LedgerFact>>,
    reachable: AtomicBool,
    /// Submits that fail with `Unavailable` before reaching the ledger.
    fail_next: AtomicU32,
    /// Submits that are written but answered with `Timeout`.
    drop_acks: AtomicU32,
    /// Queries that fail with `Unavailable`.
    fail_queries: AtomicU32,
    submissions: AtomicU64,
    blocks: AtomicU64,
    latency: RwLock<Duration>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            facts: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
            fail_next: AtomicU32::new(0),
            drop_acks: AtomicU32::new(0),
            fail_queries: AtomicU32::new(0),
            submissions: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            latency: RwLock::new(Duration::ZERO),
        }
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fail the next `count` submits with `Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Write the next `count` submits but report `Timeout` to the caller.
    pub fn drop_acks(&self, count: u32) {
        self.drop_acks.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` queries with `Unavailable`.
    pub fn fail_queries(&self, count: u32) {
        self.fail_queries.store(count, Ordering::SeqCst);
    }

    /// Delay every submit by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Submit calls received, including failed ones.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Transactions written.
    pub fn transactions(&self) -> usize {
        self.facts.read().len()
    }

    pub fn facts(&self) -> Vec<LedgerFact> {
        self.facts.read().clone()
    }

    /// Write a fact directly, bypassing `submit`.
    pub fn inject(&self, fact: LedgerFact) {
        self.facts.write().push(fact);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn now() -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn submit(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        object_hash: &str,
    ) -> LedgerResult<LedgerReceipt> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        if !self.reachable.load(Ordering::SeqCst) || Self::take(&self.fail_next) {
            return Err(LedgerError::Unavailable("ledger endpoint unreachable".into()));
        }

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let block = self.blocks.fetch_add(1, Ordering::SeqCst) + 1;
        let fact = LedgerFact {
            batch_id: batch_id.clone(),
            fact_type,
            object_hash: object_hash.to_string(),
            transaction_ref: format!("0x{}", Uuid::new_v4().simple()),
            block_ref: block,
            recorded_at: Self::now(),
        };
        let receipt = fact.receipt();
        self.facts.write().push(fact);
        debug!(
            batch_id = %batch_id,
            fact = %fact_type,
            tx = %receipt.transaction_ref,
            "[hc-02] Ledger transaction mined"
        );

        if Self::take(&self.drop_acks) {
            return Err(LedgerError::Timeout);
        }
        Ok(receipt)
    }

    async fn query(&self, batch_id: &BatchId) -> LedgerResult<Vec<LedgerFact>> {
        if !self.reachable.load(Ordering::SeqCst) || Self::take(&self.fail_queries) {
            return Err(LedgerError::Unavailable("ledger endpoint unreachable".into()));
        }
        Ok(self
            .facts
            .read()
            .iter()
            .filter(|f| &f.batch_id == batch_id)
            .cloned()
            .collect())
    }
}

/// Ledger used when no endpoint is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredLedger;

#[async_trait]
impl Ledger for UnconfiguredLedger {
    async fn submit(
        &self,
        _batch_id: &BatchId,
        _fact_type: FactType,
        _object_hash: &str,
    ) -> LedgerResult<LedgerReceipt> {
        Err(LedgerError::Unavailable("ledger not configured".into()))
    }

    async fn query(&self, _batch_id: &BatchId) -> LedgerResult<Vec<LedgerFact>> {
        Err(LedgerError::Unavailable("ledger not configured".into()))
    }
}
