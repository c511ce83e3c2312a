//! Outbound (Driven) ports for the Batch Workflow subsystem.
//!
//! These traits define dependencies on external systems the workflow needs:
//! batch storage, a clock, and the ledger mirror.

use crate::domain::WorkflowResult;
use serde::{Deserialize, Serialize};
use shared_types::{Batch, BatchId, FactType, Timestamp};

/// Batch storage.
///
/// `update` is the only write path for existing batches and must behave as
/// a compare-and-swap: the closure runs against a copy while the batch is
/// locked, and the copy is committed (with `version + 1`) only when the
/// closure returns `Ok`. Concurrent updates to one batch are serialized.
pub trait BatchRepository: Send + Sync {
    /// Insert a new batch. Duplicate ids fail with `Conflict`.
    fn insert(&self, batch: Batch) -> WorkflowResult<()>;

    fn get(&self, batch_id: &BatchId) -> WorkflowResult<Option<Batch>>;

    fn contains(&self, batch_id: &BatchId) -> WorkflowResult<bool>;

    /// Conditional read-check-mutate. Unknown ids fail with `NotFound`.
    fn update(
        &self,
        batch_id: &BatchId,
        mutate: &mut dyn FnMut(&mut Batch) -> WorkflowResult<()>,
    ) -> WorkflowResult<Batch>;

    /// Snapshot of every batch.
    fn list(&self) -> WorkflowResult<Vec<Batch>>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// A fact handed to the ledger mirror after its transition committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRequest {
    pub batch_id: BatchId,
    pub fact_type: FactType,
    /// Snapshot of what is being attested, taken at commit time.
    pub payload: serde_json::Value,
}

/// Ledger mirror - outbound port.
///
/// Fire-and-forget: implementations start the record chain in the
/// background and report the outcome through `LedgerStateApi`. Never blocks
/// the calling transition.
pub trait LedgerMirror: Send + Sync {
    fn mirror(&self, request: FactRequest);
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Mirror that only remembers what it was asked to record.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMirror {
    requests: parking_lot::Mutex<Vec<FactRequest>>,
}

#[cfg(test)]
impl RecordingMirror {
    pub fn requests(&self) -> Vec<FactRequest> {
        self.requests.lock().clone()
    }

    pub fn fact_types(&self) -> Vec<FactType> {
        self.requests.lock().iter().map(|r| r.fact_type).collect()
    }
}

#[cfg(test)]
impl LedgerMirror for RecordingMirror {
    fn mirror(&self, request: FactRequest) {
        self.requests.lock().push(request);
    }
}
