//! # Idempotent Recording
//!
//! However often a fact is recorded, and whatever happens to the
//! acknowledgement, the ledger holds at most one transaction for it.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use hc_02_ledger_mirror::{FactRecorderApi, RecordOutcome, VerificationStatus};
    use shared_types::{Actor, BatchId, BatchStatus, FactType, MirrorStatus};
    use std::time::Duration;

    #[tokio::test]
    async fn test_lost_acknowledgement_is_adopted() {
        let (container, ledger) = node(fast_config(5));
        ledger.drop_acks(1);

        let id = BatchId::new(ASH_001);
        container
            .workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();
        container.mirror.settle().await;

        // The first submit landed but timed out; the retry found it on the ledger.
        assert_eq!(ledger.submissions(), 1);
        assert_eq!(ledger.transactions(), 1);

        let batch = container.workflow.lookup(&id).unwrap();
        assert_eq!(batch.status, BatchStatus::Recorded);
        let receipt = batch.fact(FactType::Collection).unwrap();
        assert_eq!(receipt.status, MirrorStatus::Confirmed);
        assert_eq!(receipt.state.attempts, 1);
        assert_eq!(
            receipt.state.transaction_ref.as_deref(),
            Some(ledger.facts()[0].transaction_ref.as_str())
        );

        assert_eq!(
            container.verify(&id).await.unwrap().status,
            VerificationStatus::Verified
        );
    }

    #[tokio::test]
    async fn test_recording_twice_is_a_noop() {
        let (container, ledger) = node(fast_config(5));
        let id = BatchId::new(ASH_001);
        container
            .workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();
        container.mirror.settle().await;

        let payload = serde_json::json!({ "batch_id": ASH_001 });
        let again = container
            .recorder
            .record(&id, FactType::Collection, &payload)
            .await
            .unwrap();

        assert!(matches!(again, RecordOutcome::AlreadyRecorded(ref state) if state.recorded));
        assert_eq!(ledger.transactions(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_record_of_one_fact_submits_once() {
        let (container, ledger) = node(fast_config(5));
        ledger.set_latency(Duration::from_millis(50));
        let id = BatchId::new(ASH_001);
        container
            .workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();

        // The workflow's own chain is still waiting on the ledger.
        let payload = serde_json::json!({ "batch_id": ASH_001 });
        let duplicate = container
            .recorder
            .spawn_record(id.clone(), FactType::Collection, payload)
            .await
            .unwrap()
            .unwrap();
        container.mirror.settle().await;

        assert!(matches!(
            duplicate,
            RecordOutcome::InFlight | RecordOutcome::AlreadyRecorded(_)
        ));
        assert_eq!(ledger.transactions(), 1);
        assert_eq!(container.recorder.in_flight(), 0);
    }
}
