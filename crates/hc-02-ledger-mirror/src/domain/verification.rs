//! # Verification
//!
//! Pure comparison of local fact receipts against what the ledger holds.
//! Differences are reported, never corrected.

use super::entities::LedgerFact;
use serde::{Deserialize, Serialize};
use shared_types::{BatchId, FactReceipt, FactType, MirrorStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Nothing recorded on either side.
    NotYetRecorded,
    /// Every locally recorded fact matches the ledger.
    Verified,
    /// The two sides disagree.
    IntegrityWarning,
    /// Facts are recorded locally but the ledger could not be read.
    LedgerUnreachable,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotYetRecorded => "not_yet_recorded",
            Self::Verified => "verified",
            Self::IntegrityWarning => "integrity_warning",
            Self::LedgerUnreachable => "ledger_unreachable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub batch_id: BatchId,
    pub local_recorded: bool,
    pub ledger_recorded: bool,
    pub matches: bool,
    pub status: VerificationStatus,
    /// Human-readable differences, or the ledger error when unreachable.
    pub details: Vec<String>,
    /// Facts already on the ledger whose local chain has not confirmed yet.
    pub in_progress: Vec<FactType>,
}

/// Compare local receipts with the ledger's facts for one batch.
///
/// A ledger entry for a fact whose chain is still `Pending` locally is in
/// progress, not a mismatch. Entries for `Failed` or never-enqueued facts are.
pub fn reconcile(
    batch_id: &BatchId,
    local: &[FactReceipt],
    ledger: &[LedgerFact],
) -> VerificationResult {
    let recorded: Vec<&FactReceipt> = local.iter().filter(|f| f.state.recorded).collect();
    let local_recorded = !recorded.is_empty();
    let ledger_recorded = !ledger.is_empty();

    if !local_recorded && !ledger_recorded {
        return VerificationResult {
            batch_id: batch_id.clone(),
            local_recorded,
            ledger_recorded,
            matches: true,
            status: VerificationStatus::NotYetRecorded,
            details: Vec::new(),
            in_progress: Vec::new(),
        };
    }

    let mut details = Vec::new();

    for receipt in &recorded {
        let on_ledger: Vec<&LedgerFact> = ledger
            .iter()
            .filter(|f| f.fact_type == receipt.fact_type)
            .collect();
        let Some(entry) = on_ledger.first() else {
            details.push(format!("{}: missing on ledger", receipt.fact_type));
            continue;
        };
        if on_ledger.len() > 1 {
            details.push(format!(
                "{}: {} ledger entries for one fact",
                receipt.fact_type,
                on_ledger.len()
            ));
        }
        compare_field(
            &mut details,
            receipt.fact_type,
            "transaction_ref",
            receipt.state.transaction_ref.as_deref(),
            &entry.transaction_ref,
        );
        if receipt.state.block_ref != Some(entry.block_ref) {
            details.push(format!(
                "{}: block_ref local={} ledger={}",
                receipt.fact_type,
                receipt
                    .state
                    .block_ref
                    .map_or_else(|| "none".to_string(), |b| b.to_string()),
                entry.block_ref
            ));
        }
        compare_field(
            &mut details,
            receipt.fact_type,
            "object_hash",
            receipt.state.object_hash.as_deref(),
            &entry.object_hash,
        );
    }

    let mut ledger_only: Vec<FactType> = ledger
        .iter()
        .map(|f| f.fact_type)
        .filter(|ft| !recorded.iter().any(|r| r.fact_type == *ft))
        .collect();
    ledger_only.sort();
    ledger_only.dedup();
    let mut in_progress = Vec::new();
    for fact_type in ledger_only {
        let chain_running = local
            .iter()
            .any(|r| r.fact_type == fact_type && r.status == MirrorStatus::Pending);
        if chain_running {
            in_progress.push(fact_type);
        } else {
            details.push(format!("{fact_type}: on ledger but not recorded locally"));
        }
    }

    let matches = details.is_empty();
    let status = if !matches {
        VerificationStatus::IntegrityWarning
    } else if local_recorded {
        VerificationStatus::Verified
    } else {
        VerificationStatus::NotYetRecorded
    };
    VerificationResult {
        batch_id: batch_id.clone(),
        local_recorded,
        ledger_recorded,
        matches,
        status,
        details,
        in_progress,
    }
}

fn compare_field(
    details: &mut Vec<String>,
    fact_type: FactType,
    field: &str,
    local: Option<&str>,
    ledger: &str,
) {
    if local != Some(ledger) {
        details.push(format!(
            "{fact_type}: {field} local={} ledger={ledger}",
            local.unwrap_or("none")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::LedgerState;

    fn id() -> BatchId {
        BatchId::new("ASH-2024-001")
    }

    fn recorded(fact_type: FactType, tx: &str) -> FactReceipt {
        FactReceipt {
            fact_type,
            status: MirrorStatus::Confirmed,
            state: LedgerState::default().confirmed(tx, 1, "hash-1"),
        }
    }

    fn on_ledger(fact_type: FactType, tx: &str) -> LedgerFact {
        LedgerFact {
            batch_id: id(),
            fact_type,
            object_hash: "hash-1".into(),
            transaction_ref: tx.into(),
            block_ref: 1,
            recorded_at: 0,
        }
    }

    #[test]
    fn test_nothing_recorded_is_not_a_warning() {
        let local = vec![FactReceipt::pending(FactType::Collection)];
        let result = reconcile(&id(), &local, &[]);
        assert_eq!(result.status, VerificationStatus::NotYetRecorded);
        assert!(result.details.is_empty());
    }

    #[test]
    fn test_matching_facts_verify() {
        let local = vec![
            recorded(FactType::Collection, "tx-1"),
            recorded(FactType::Processing, "tx-2"),
            FactReceipt::pending(FactType::Completion),
        ];
        let ledger = vec![
            on_ledger(FactType::Collection, "tx-1"),
            on_ledger(FactType::Processing, "tx-2"),
        ];
        let result = reconcile(&id(), &local, &ledger);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert!(result.matches);
    }

    #[test]
    fn test_reference_mismatch_warns() {
        let local = vec![recorded(FactType::Collection, "tx-1")];
        let ledger = vec![on_ledger(FactType::Collection, "tx-9")];
        let result = reconcile(&id(), &local, &ledger);
        assert_eq!(result.status, VerificationStatus::IntegrityWarning);
        assert_eq!(result.details.len(), 1);
        assert!(result.details[0].contains("transaction_ref"));
    }

    #[test]
    fn test_missing_and_ledger_only_facts_warn() {
        let local = vec![recorded(FactType::Collection, "tx-1")];
        let ledger = vec![on_ledger(FactType::Rejection, "tx-5")];
        let result = reconcile(&id(), &local, &ledger);
        assert_eq!(result.status, VerificationStatus::IntegrityWarning);
        assert_eq!(
            result.details,
            vec![
                "collection: missing on ledger".to_string(),
                "rejection: on ledger but not recorded locally".to_string(),
            ]
        );
    }

    #[test]
    fn test_entry_for_running_chain_is_in_progress() {
        let mut retrying = FactReceipt::pending(FactType::Processing);
        retrying.state = retrying.state.with_failed_attempt("Ledger request timed out");
        let local = vec![recorded(FactType::Collection, "tx-1"), retrying];
        let ledger = vec![
            on_ledger(FactType::Collection, "tx-1"),
            on_ledger(FactType::Processing, "tx-2"),
        ];

        let result = reconcile(&id(), &local, &ledger);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert!(result.details.is_empty());
        assert_eq!(result.in_progress, vec![FactType::Processing]);

        // Nothing confirmed locally yet.
        let result = reconcile(&id(), &local[1..], &ledger[1..]);
        assert_eq!(result.status, VerificationStatus::NotYetRecorded);
        assert_eq!(result.in_progress, vec![FactType::Processing]);
    }

    #[test]
    fn test_entry_for_failed_chain_warns() {
        let mut failed = FactReceipt::pending(FactType::Collection);
        failed.status = MirrorStatus::Failed;
        let ledger = vec![on_ledger(FactType::Collection, "tx-1")];

        let result = reconcile(&id(), &[failed], &ledger);
        assert_eq!(result.status, VerificationStatus::IntegrityWarning);
        assert!(result.in_progress.is_empty());
    }

    #[test]
    fn test_block_height_mismatch_warns() {
        let local = vec![recorded(FactType::Collection, "tx-1")];
        let mut entry = on_ledger(FactType::Collection, "tx-1");
        entry.block_ref = 4;
        let result = reconcile(&id(), &local, &[entry]);
        assert_eq!(result.details, vec!["collection: block_ref local=1 ledger=4".to_string()]);
    }

    #[test]
    fn test_duplicate_ledger_entries_warn() {
        let local = vec![recorded(FactType::Collection, "tx-1")];
        let ledger = vec![
            on_ledger(FactType::Collection, "tx-1"),
            on_ledger(FactType::Collection, "tx-2"),
        ];
        let result = reconcile(&id(), &local, &ledger);
        assert_eq!(result.status, VerificationStatus::IntegrityWarning);
    }
}
