//! # Verification
//!
//! `verify` before anything is recorded, after recording settles, and
//! against a ledger that disagrees with the local record.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use hc_01_batch_workflow::WorkflowError;
    use hc_02_ledger_mirror::{LedgerFact, VerificationStatus};
    use shared_bus::{BatchEvent, EventFilter, EventTopic};
    use shared_types::{Actor, BatchId, FactType};
    use std::time::Duration;

    #[tokio::test]
    async fn test_verify_before_recording_is_not_yet_recorded() {
        let (container, ledger) = node(fast_config(5));
        ledger.set_latency(Duration::from_millis(200));
        let id = BatchId::new(ASH_001);
        container
            .workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();

        let early = container.verify(&id).await.unwrap();
        assert_eq!(early.status, VerificationStatus::NotYetRecorded);
        assert!(!early.local_recorded);
        assert!(!early.ledger_recorded);

        container.mirror.settle().await;
        let settled = container.verify(&id).await.unwrap();
        assert_eq!(settled.status, VerificationStatus::Verified);
        assert!(settled.local_recorded && settled.ledger_recorded);
    }

    #[tokio::test]
    async fn test_tampered_ledger_raises_integrity_warning() {
        let (container, ledger) = node(fast_config(5));
        let mut mismatches = container
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Verification]));
        let id = walk_to_completed(&container, ASH_001).await;
        container.mirror.settle().await;

        let completion = ledger
            .facts()
            .into_iter()
            .find(|f| f.fact_type == FactType::Completion)
            .unwrap();
        ledger.inject(LedgerFact {
            object_hash: "0000".to_string(),
            transaction_ref: "0xforged".to_string(),
            ..completion
        });

        let result = container.verify(&id).await.unwrap();
        assert_eq!(result.status, VerificationStatus::IntegrityWarning);
        assert!(!result.matches);
        assert!(result
            .details
            .iter()
            .any(|d| d.starts_with("completion")));

        match mismatches.try_recv() {
            Ok(Some(BatchEvent::VerificationMismatch { batch_id, details })) => {
                assert_eq!(batch_id, id);
                assert_eq!(details, result.details);
            }
            other => panic!("expected a mismatch notification, got {other:?}"),
        }

        // Reported, never corrected.
        assert_eq!(container.workflow.lookup(&id).unwrap().ledger_facts.len(), 3);
    }

    #[tokio::test]
    async fn test_verify_unknown_batch() {
        let (container, _ledger) = node(fast_config(5));
        let missing = BatchId::new("TUL-2024-404");
        assert_eq!(
            container.verify(&missing).await.unwrap_err(),
            WorkflowError::NotFound(missing)
        );
    }
}
