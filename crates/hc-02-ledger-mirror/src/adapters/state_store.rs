//! Standalone receipt store, used when the mirror runs without a workflow.

use crate::domain::{LedgerError, LedgerResult};
use crate::ports::outbound::LedgerStateStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BatchId, FactReceipt, FactType};
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryLedgerStateStore {
    receipts: RwLock<HashMap<BatchId, Vec<FactReceipt>>>,
}

impl InMemoryLedgerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a pending fact. Returns `false` if it already exists.
    pub fn enqueue(&self, batch_id: &BatchId, fact_type: FactType) -> bool {
        let mut receipts = self.receipts.write();
        let facts = receipts.entry(batch_id.clone()).or_default();
        if facts.iter().any(|f| f.fact_type == fact_type) {
            return false;
        }
        facts.push(FactReceipt::pending(fact_type));
        true
    }
}

#[async_trait]
impl LedgerStateStore for InMemoryLedgerStateStore {
    async fn load(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
    ) -> LedgerResult<Option<FactReceipt>> {
        let receipts = self.receipts.read();
        let facts = receipts
            .get(batch_id)
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))?;
        Ok(facts.iter().find(|f| f.fact_type == fact_type).cloned())
    }

    async fn store(&self, batch_id: &BatchId, receipt: FactReceipt) -> LedgerResult<()> {
        let mut receipts = self.receipts.write();
        let facts = receipts
            .get_mut(batch_id)
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))?;
        let slot = facts
            .iter_mut()
            .find(|f| f.fact_type == receipt.fact_type)
            .ok_or_else(|| {
                LedgerError::StateStore(format!("{} fact was never enqueued", receipt.fact_type))
            })?;
        *slot = receipt;
        Ok(())
    }

    async fn facts(&self, batch_id: &BatchId) -> LedgerResult<Vec<FactReceipt>> {
        self.receipts
            .read()
            .get(batch_id)
            .cloned()
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))
    }
}
