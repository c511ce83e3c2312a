//! # Assignment Pool
//!
//! Which batches a role can act on, and the claim/complete/reject mutations
//! that run inside the repository's conditional update.

use super::errors::{WorkflowError, WorkflowResult};
use super::state_machine::{self, Action, Evidence, TransitionRule};
use super::value_objects::CompletionReport;
use shared_types::{Actor, Batch, BatchStatus, Role, Timestamp};

/// A committed status change, returned out of the update closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BatchStatus,
    pub to: BatchStatus,
    pub rule: &'static TransitionRule,
}

/// Unassigned work in the role's entry state.
pub fn is_claimable(batch: &Batch, role: Role) -> bool {
    let has_slot = matches!(role, Role::Processor | Role::Laboratory);
    state_machine::entry_states(role).contains(&batch.status)
        && (!has_slot || batch.assignee(role).is_none())
}

/// Batches the actor owns: created (collector) or assigned (processor, lab).
pub fn is_mine(batch: &Batch, actor: &Actor) -> bool {
    match actor.role {
        Role::Collector | Role::Processor | Role::Laboratory => {
            batch.assignee(actor.role) == Some(&actor.id)
        }
        Role::Manufacturer | Role::Verifier | Role::System => false,
    }
}

/// Whether `list_claimable` shows this batch to the actor.
pub fn is_visible(batch: &Batch, actor: &Actor) -> bool {
    is_claimable(batch, actor.role) || is_mine(batch, actor)
}

/// Claim: take the role's slot and advance to the claim target.
///
/// A taken slot is a lost race (`Conflict`) regardless of status; an empty
/// slot in the wrong status is `InvalidTransition`.
pub fn claim(batch: &mut Batch, actor: &Actor, now: Timestamp) -> WorkflowResult<Transition> {
    let Some(target) = state_machine::claim_target(actor.role) else {
        return Err(WorkflowError::InvalidTransition {
            from: batch.status,
            to: batch.status,
            role: actor.role,
        });
    };

    if let Some(holder) = batch.assignee(actor.role) {
        return Err(WorkflowError::Conflict {
            batch_id: batch.batch_id.clone(),
            reason: format!("already claimed by {holder}"),
        });
    }

    let rule = state_machine::authorize(batch, actor, target, Some(Action::Claim), Evidence::None)?;
    let from = state_machine::apply(batch, rule, actor, now);
    Ok(Transition {
        from,
        to: rule.to,
        rule,
    })
}

/// Complete: the assigned actor files its report and the batch advances.
///
/// Assignment is checked before status, so a stranger always gets
/// `NotAssigned`. The report is appended with `sequence = len + 1`.
pub fn complete(
    batch: &mut Batch,
    actor: &Actor,
    report: &CompletionReport,
    now: Timestamp,
) -> WorkflowResult<Transition> {
    if batch.assignee(actor.role) != Some(&actor.id) || actor.role == Role::Collector {
        return Err(WorkflowError::NotAssigned {
            batch_id: batch.batch_id.clone(),
            actor_id: actor.id.clone(),
            role: actor.role,
        });
    }
    if report.role() != actor.role {
        return Err(WorkflowError::Validation(format!(
            "{} cannot file a {} report",
            actor.role,
            report.role()
        )));
    }
    report.validate()?;

    let (target, evidence) = report.outcome();
    let rule = state_machine::authorize(batch, actor, target, Some(Action::Complete), evidence)?;
    let from = state_machine::apply(batch, rule, actor, now);

    match report {
        CompletionReport::Processing(step) => {
            let sequence = next_sequence(batch.processing_steps.len());
            let record = CompletionReport::processing_step(step, &batch.batch_id, sequence, &actor.id, now);
            batch.processing_steps.push(record);
        }
        CompletionReport::QualityTest(test) => {
            let sequence = next_sequence(batch.quality_tests.len());
            let record = CompletionReport::quality_test(test, &batch.batch_id, sequence, &actor.id, now);
            batch.quality_tests.push(record);
        }
    }

    Ok(Transition {
        from,
        to: rule.to,
        rule,
    })
}

/// Reject with a reason. Allowed from any state listed for the role.
pub fn reject(
    batch: &mut Batch,
    actor: &Actor,
    reason: &str,
    now: Timestamp,
) -> WorkflowResult<Transition> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::Validation(
            "rejection reason is required".to_string(),
        ));
    }

    let rule = state_machine::authorize(
        batch,
        actor,
        BatchStatus::Rejected,
        Some(Action::Reject),
        Evidence::None,
    )?;
    let from = state_machine::apply(batch, rule, actor, now);
    batch.rejection_reason = Some(reason.to_string());
    Ok(Transition {
        from,
        to: rule.to,
        rule,
    })
}

/// Generic transition request; only rules without a result payload.
pub fn request(
    batch: &mut Batch,
    actor: &Actor,
    target: BatchStatus,
    now: Timestamp,
) -> WorkflowResult<Transition> {
    let rule = state_machine::authorize(batch, actor, target, None, Evidence::None)?;
    let from = state_machine::apply(batch, rule, actor, now);
    Ok(Transition {
        from,
        to: rule.to,
        rule,
    })
}

fn next_sequence(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX).saturating_add(1)
}
