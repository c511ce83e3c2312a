//! # Domain Invariants
//!
//! Business rules checked against every batch mutation before it commits.

use super::errors::{WorkflowError, WorkflowResult};
use super::state_machine;
use shared_types::{ActorId, Batch};

/// Invariant: status moves only along a listed transition (or stays put).
pub fn invariant_listed_transition(before: &Batch, after: &Batch) -> bool {
    before.status == after.status || state_machine::is_listed(before.status, after.status)
}

/// Invariant: identity and creation attributes never change.
pub fn invariant_identity_fixed(before: &Batch, after: &Batch) -> bool {
    before.batch_id == after.batch_id
        && before.attributes == after.attributes
        && before.farmer_id == after.farmer_id
        && before.created_at == after.created_at
}

/// Invariant: an assignment slot, once set, is never changed or cleared.
pub fn invariant_assigned_once(before: &Batch, after: &Batch) -> bool {
    fn kept(before: &Option<ActorId>, after: &Option<ActorId>) -> bool {
        before.is_none() || before == after
    }
    kept(&before.processor_id, &after.processor_id) && kept(&before.lab_id, &after.lab_id)
}

/// Invariant: step and test records are append-only with 1-based sequences.
pub fn invariant_records_append_only(before: &Batch, after: &Batch) -> bool {
    let steps_kept = after.processing_steps.len() >= before.processing_steps.len()
        && after.processing_steps[..before.processing_steps.len()]
            .iter()
            .zip(&before.processing_steps)
            .all(|(a, b)| a.sequence == b.sequence && a.recorded_at == b.recorded_at);
    let tests_kept = after.quality_tests.len() >= before.quality_tests.len()
        && after.quality_tests[..before.quality_tests.len()]
            .iter()
            .zip(&before.quality_tests)
            .all(|(a, b)| a.sequence == b.sequence && a.overall_result == b.overall_result);
    let sequenced = after
        .processing_steps
        .iter()
        .enumerate()
        .all(|(i, s)| s.sequence as usize == i + 1)
        && after
            .quality_tests
            .iter()
            .enumerate()
            .all(|(i, t)| t.sequence as usize == i + 1);
    steps_kept && tests_kept && sequenced
}

/// Invariant: a fact has at most one receipt, and receipts are never dropped.
pub fn invariant_single_chain_per_fact(before: &Batch, after: &Batch) -> bool {
    let mut seen = std::collections::HashSet::new();
    after.ledger_facts.len() >= before.ledger_facts.len()
        && after.ledger_facts.iter().all(|f| seen.insert(f.fact_type))
}

/// Check every invariant; the first violation is returned.
pub fn check_commit(before: &Batch, after: &Batch) -> WorkflowResult<()> {
    let checks: [(&str, bool); 6] = [
        ("status skipped a listed transition", invariant_listed_transition(before, after)),
        ("identity attributes changed", invariant_identity_fixed(before, after)),
        ("assignment overwritten", invariant_assigned_once(before, after)),
        ("records not append-only", invariant_records_append_only(before, after)),
        ("duplicate ledger fact chain", invariant_single_chain_per_fact(before, after)),
        ("recorded ledger state without transaction", after.ledger_consistent()),
    ];

    match checks.iter().find(|(_, held)| !held) {
        Some((name, _)) => Err(WorkflowError::InvariantViolation(format!(
            "{}: {name}",
            after.batch_id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BatchAttributes, BatchId, BatchStatus, FactType, LedgerState};

    fn batch() -> Batch {
        Batch::new(
            BatchId::new("ASH-2024-001"),
            BatchAttributes {
                herb_species: "Ashwagandha".to_string(),
                quantity: 10.0,
                location: "Rajasthan".to_string(),
                quality_grade: "B".to_string(),
                harvest_method: "hand-picked".to_string(),
                organic_certified: true,
            },
            ActorId::new("farmer-1"),
            0,
        )
    }

    #[test]
    fn test_unchanged_batch_passes() {
        let b = batch();
        assert!(check_commit(&b, &b).is_ok());
    }

    #[test]
    fn test_skipping_states_is_caught() {
        let before = batch();
        let mut after = before.clone();
        after.status = BatchStatus::Completed;
        assert!(!invariant_listed_transition(&before, &after));
        assert!(matches!(
            check_commit(&before, &after),
            Err(WorkflowError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_reassignment_is_caught() {
        let mut before = batch();
        before.processor_id = Some(ActorId::new("proc-a"));
        let mut after = before.clone();
        after.processor_id = Some(ActorId::new("proc-b"));
        assert!(!invariant_assigned_once(&before, &after));
    }

    #[test]
    fn test_duplicate_fact_chain_is_caught() {
        let before = batch();
        let mut after = before.clone();
        after.enqueue_fact(FactType::Collection);
        after
            .ledger_facts
            .push(shared_types::FactReceipt::pending(FactType::Collection));
        assert!(!invariant_single_chain_per_fact(&before, &after));
    }

    #[test]
    fn test_inconsistent_ledger_state_is_caught() {
        let before = batch();
        let mut after = before.clone();
        after.ledger_state = LedgerState {
            recorded: true,
            ..LedgerState::default()
        };
        assert!(check_commit(&before, &after).is_err());
    }
}
