//! In-Memory Batch Repository
//!
//! Implements `BatchRepository` with one mutex per batch so updates to
//! different batches never contend.

use crate::domain::{WorkflowError, WorkflowResult};
use crate::ports::outbound::BatchRepository;
use parking_lot::{Mutex, RwLock};
use shared_types::{Batch, BatchId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory batch store.
///
/// A durable store would implement the same compare-and-swap contract with
/// a conditional write on `version`.
#[derive(Default)]
pub struct InMemoryBatchRepository {
    batches: RwLock<HashMap<BatchId, Arc<Mutex<Batch>>>>,
}

impl InMemoryBatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.read().is_empty()
    }

    fn slot(&self, batch_id: &BatchId) -> Option<Arc<Mutex<Batch>>> {
        self.batches.read().get(batch_id).cloned()
    }
}

impl BatchRepository for InMemoryBatchRepository {
    fn insert(&self, batch: Batch) -> WorkflowResult<()> {
        let mut batches = self.batches.write();
        if batches.contains_key(&batch.batch_id) {
            return Err(WorkflowError::Conflict {
                batch_id: batch.batch_id.clone(),
                reason: "batch id already exists".to_string(),
            });
        }
        debug!(batch_id = %batch.batch_id, "[hc-01] Batch inserted");
        batches.insert(batch.batch_id.clone(), Arc::new(Mutex::new(batch)));
        Ok(())
    }

    fn get(&self, batch_id: &BatchId) -> WorkflowResult<Option<Batch>> {
        Ok(self.slot(batch_id).map(|slot| slot.lock().clone()))
    }

    fn contains(&self, batch_id: &BatchId) -> WorkflowResult<bool> {
        Ok(self.batches.read().contains_key(batch_id))
    }

    fn update(
        &self,
        batch_id: &BatchId,
        mutate: &mut dyn FnMut(&mut Batch) -> WorkflowResult<()>,
    ) -> WorkflowResult<Batch> {
        let slot = self
            .slot(batch_id)
            .ok_or_else(|| WorkflowError::NotFound(batch_id.clone()))?;

        let mut stored = slot.lock();
        let mut candidate = stored.clone();
        mutate(&mut candidate)?;
        candidate.version = stored.version + 1;
        *stored = candidate.clone();
        Ok(candidate)
    }

    fn list(&self) -> WorkflowResult<Vec<Batch>> {
        let slots: Vec<Arc<Mutex<Batch>>> = self.batches.read().values().cloned().collect();
        Ok(slots.iter().map(|slot| slot.lock().clone()).collect())
    }
}
