//! # Workflow State Store
//!
//! `LedgerStateStore` for the recorder, backed by the batch workflow. Fact
//! receipts live on the batch record, so every outcome the recorder stores
//! goes through the workflow's compare-and-swap update.

use async_trait::async_trait;
use hc_01_batch_workflow::{LedgerStateApi, WorkflowError};
use hc_02_ledger_mirror::{LedgerError, LedgerResult, LedgerStateStore};
use shared_types::{BatchId, FactReceipt, FactType};
use std::sync::Arc;

pub struct WorkflowStateStore {
    workflow: Arc<dyn LedgerStateApi>,
}

impl WorkflowStateStore {
    pub fn new(workflow: Arc<dyn LedgerStateApi>) -> Self {
        Self { workflow }
    }
}

fn to_ledger_error(err: WorkflowError) -> LedgerError {
    match err {
        WorkflowError::NotFound(batch_id) => LedgerError::BatchNotFound(batch_id),
        other => LedgerError::StateStore(other.to_string()),
    }
}

#[async_trait]
impl LedgerStateStore for WorkflowStateStore {
    async fn load(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
    ) -> LedgerResult<Option<FactReceipt>> {
        self.workflow
            .fact_receipt(batch_id, fact_type)
            .map_err(to_ledger_error)
    }

    async fn store(&self, batch_id: &BatchId, receipt: FactReceipt) -> LedgerResult<()> {
        self.workflow
            .apply_ledger_outcome(batch_id, receipt)
            .await
            .map(|_| ())
            .map_err(to_ledger_error)
    }

    async fn facts(&self, batch_id: &BatchId) -> LedgerResult<Vec<FactReceipt>> {
        self.workflow
            .fact_receipts(batch_id)
            .map_err(to_ledger_error)
    }
}
