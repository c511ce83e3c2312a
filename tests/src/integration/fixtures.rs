//! Shared builders for the integration scenarios.

use hc_01_batch_workflow::{CompletionReport, ProcessingReport, TestReport};
use hc_02_ledger_mirror::{InMemoryContentStore, InMemoryLedger};
use node_runtime::{NodeConfig, SubsystemContainer};
use shared_bus::EventPublisher;
use shared_types::{Actor, BatchAttributes, BatchDraft, BatchId, TestOutcome};
use std::sync::Arc;

pub const ASH_001: &str = "ASH-2024-001";

/// Config with millisecond backoff so exhausted chains end quickly.
pub fn fast_config(max_attempts: u32) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.ledger.max_attempts = max_attempts;
    config.ledger.base_delay_ms = 1;
    config.ledger.max_delay_ms = 5;
    config.ledger.attempt_timeout_ms = 1_000;
    config.verification.query_timeout_ms = 1_000;
    config.verification.sweep_interval_secs = 0;
    config
}

/// A connected container around an in-memory ledger the test can steer.
pub fn node(config: NodeConfig) -> (Arc<SubsystemContainer>, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let container = SubsystemContainer::with_ledger(
        config,
        ledger.clone(),
        Arc::new(InMemoryContentStore::new()),
    );
    container.event_bus.connect();
    (Arc::new(container), ledger)
}

pub fn ashwagandha(id: &str) -> BatchDraft {
    BatchDraft::new(BatchAttributes {
        herb_species: "Ashwagandha".to_string(),
        quantity: 120.0,
        location: "Rajasthan".to_string(),
        quality_grade: "A".to_string(),
        harvest_method: "hand-picked".to_string(),
        organic_certified: true,
    })
    .with_id(id)
}

pub fn drying() -> CompletionReport {
    CompletionReport::Processing(ProcessingReport {
        process_type: "drying".to_string(),
        input_quantity: 120.0,
        output_quantity: 96.0,
        temperature_c: Some(45.0),
        duration_minutes: Some(480),
        notes: String::new(),
    })
}

pub fn lab_result(outcome: TestOutcome) -> CompletionReport {
    CompletionReport::QualityTest(TestReport {
        moisture_content: 8.5,
        purity: 98.2,
        pesticide_level: 0.01,
        overall_result: outcome,
        notes: String::new(),
    })
}

/// Create, process and pass a batch. Returns its id.
pub async fn walk_to_completed(container: &SubsystemContainer, id: &str) -> BatchId {
    let workflow = &container.workflow;
    let batch_id = BatchId::new(id);
    let processor = Actor::processor("proc-a");
    let lab = Actor::laboratory("lab-l");

    workflow
        .create_batch(&Actor::collector("farmer-1"), ashwagandha(id))
        .await
        .unwrap();
    workflow.claim(&batch_id, &processor).await.unwrap();
    workflow.complete(&batch_id, &processor, drying()).await.unwrap();
    workflow.claim(&batch_id, &lab).await.unwrap();
    workflow
        .complete(&batch_id, &lab, lab_result(TestOutcome::Pass))
        .await
        .unwrap();
    batch_id
}
