//! # Subsystem Container
//!
//! Holds the subsystem instances and the adapters that bridge them.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: Event bus (no dependencies)
//! Phase 2: Batch repository, LedgerSync (hc-01 ledger-state side)
//! Phase 3: Ledger, content store, LedgerRecorder, VerificationReconciler (hc-02)
//! Phase 4: BatchWorkflowService (hc-01), wired to the recorder through RecorderMirror
//! ```
//!
//! ## Thread Safety
//!
//! - All subsystems wrapped in `Arc` for shared ownership
//! - The batch repository serializes writes per batch
//! - The event bus is the only path for notifications

use std::sync::Arc;

use tracing::{info, instrument, warn};

use hc_01_batch_workflow::{
    BatchRepository, BatchWorkflowApi, BatchWorkflowService, InMemoryBatchRepository,
    LedgerSync, SystemTimeSource, WorkflowError, WorkflowResult,
};
use hc_02_ledger_mirror::{
    ContentAddressStore, InMemoryContentStore, InMemoryLedger, Ledger, LedgerError,
    LedgerRecorder, UnconfiguredLedger, VerificationApi, VerificationReconciler,
    VerificationResult,
};
use herb_telemetry::VERIFICATIONS;
use shared_bus::InMemoryEventBus;
use shared_types::BatchId;

use crate::adapters::{MeteredWorkflow, RecorderMirror, WorkflowStateStore};
use crate::container::config::{LedgerMode, NodeConfig};

/// Batch workflow over the in-memory repository.
pub type ConcreteWorkflowService = BatchWorkflowService<InMemoryBatchRepository, SystemTimeSource>;

/// Ledger outcome sink over the in-memory repository.
pub type ConcreteLedgerSync = LedgerSync<InMemoryBatchRepository, SystemTimeSource>;

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    // =========================================================================
    // SUBSYSTEM 1: BATCH WORKFLOW
    // =========================================================================
    /// Role-facing workflow operations.
    pub workflow: Arc<dyn BatchWorkflowApi>,
    /// Applies ledger outcomes to batch records.
    pub ledger_sync: Arc<ConcreteLedgerSync>,
    /// Authoritative batch records.
    pub repository: Arc<InMemoryBatchRepository>,

    // =========================================================================
    // SUBSYSTEM 2: LEDGER MIRROR
    // =========================================================================
    pub recorder: Arc<LedgerRecorder>,
    /// Starts recorder chains for enqueued facts.
    pub mirror: Arc<RecorderMirror>,
    pub reconciler: Arc<VerificationReconciler>,
    pub ledger: Arc<dyn Ledger>,
    pub content_store: Arc<dyn ContentAddressStore>,

    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    pub event_bus: Arc<InMemoryEventBus>,
    pub config: NodeConfig,
}

impl SubsystemContainer {
    /// Build the container with the ledger selected by `config.ledger.mode`.
    pub fn new(config: NodeConfig) -> Self {
        let ledger: Arc<dyn Ledger> = match config.ledger.mode {
            LedgerMode::Memory => Arc::new(InMemoryLedger::new()),
            LedgerMode::Disabled => {
                warn!("[hc-02] Ledger disabled; facts will not be mirrored");
                Arc::new(UnconfiguredLedger)
            }
        };
        Self::with_ledger(config, ledger, Arc::new(InMemoryContentStore::new()))
    }

    /// Build the container around caller-supplied ledger and content store.
    #[instrument(skip_all, fields(ledger_mode = ?config.ledger.mode))]
    pub fn with_ledger(
        config: NodeConfig,
        ledger: Arc<dyn Ledger>,
        content_store: Arc<dyn ContentAddressStore>,
    ) -> Self {
        info!("Initializing subsystem container");

        // =====================================================================
        // PHASE 1: Shared infrastructure
        // =====================================================================
        info!("Phase 1: Initializing shared infrastructure");
        let event_bus = Arc::new(InMemoryEventBus::with_capacity(
            config.event_bus.channel_capacity,
        ));
        info!(
            "  Event bus initialized (capacity={})",
            config.event_bus.channel_capacity
        );

        // =====================================================================
        // PHASE 2: Batch records
        // =====================================================================
        info!("Phase 2: Initializing batch records");
        let repository = Arc::new(InMemoryBatchRepository::new());
        let time = Arc::new(SystemTimeSource);
        let ledger_sync = Arc::new(LedgerSync::new(
            repository.clone(),
            time.clone(),
            event_bus.clone(),
        ));
        info!("  [1] Batch repository and ledger sync initialized");

        // =====================================================================
        // PHASE 3: Ledger mirror
        // =====================================================================
        info!("Phase 3: Initializing ledger mirror");
        let state_store = Arc::new(WorkflowStateStore::new(ledger_sync.clone()));
        let recorder_config = config.ledger.recorder_config();
        let recorder = Arc::new(LedgerRecorder::new(
            ledger.clone(),
            content_store.clone(),
            state_store.clone(),
            event_bus.clone(),
            recorder_config,
        ));
        info!(
            "  [2] Ledger recorder initialized (max_attempts={}, attempt_timeout={:?})",
            recorder_config.retry.max_attempts,
            recorder_config.attempt_timeout
        );

        let reconciler = Arc::new(VerificationReconciler::new(
            ledger.clone(),
            state_store,
            event_bus.clone(),
            config.verification.query_timeout(),
        ));
        info!("  [2] Verification reconciler initialized");

        // =====================================================================
        // PHASE 4: Batch workflow
        // =====================================================================
        info!("Phase 4: Initializing batch workflow");
        let mirror = Arc::new(RecorderMirror::new(recorder.clone()));
        let service: ConcreteWorkflowService = BatchWorkflowService::new(
            config.workflow.workflow_config(),
            repository.clone(),
            time,
            mirror.clone(),
            event_bus.clone(),
        );
        let workflow: Arc<dyn BatchWorkflowApi> =
            Arc::new(MeteredWorkflow::new(Arc::new(service)));
        info!(
            "  [1] Batch workflow initialized (id_attempts={})",
            config.workflow.id_max_attempts
        );

        info!("All subsystems initialized successfully");

        Self {
            workflow,
            ledger_sync,
            repository,
            recorder,
            mirror,
            reconciler,
            ledger,
            content_store,
            event_bus,
            config,
        }
    }

    /// Compare the ledger with the batch's local receipts.
    ///
    /// An unknown batch is `NotFound`; a failing ledger is reported in the
    /// result status, not as an error.
    pub async fn verify(&self, batch_id: &BatchId) -> WorkflowResult<VerificationResult> {
        let result = self
            .reconciler
            .verify(batch_id)
            .await
            .map_err(|err| match err {
                LedgerError::BatchNotFound(id) => WorkflowError::NotFound(id),
                other => WorkflowError::Storage(other.to_string()),
            })?;
        VERIFICATIONS
            .with_label_values(&[result.status.as_str()])
            .inc();
        Ok(result)
    }

    /// Batches with at least one fact confirmed on the ledger.
    pub fn recorded_batches(&self) -> WorkflowResult<Vec<BatchId>> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|batch| batch.recorded_facts().next().is_some())
            .map(|batch| batch.batch_id)
            .collect())
    }
}
