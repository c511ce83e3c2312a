//! # Workflow State Machine
//!
//! The single declarative transition table and the lookup that turns a
//! request into an authorized rule.
//!
//! | From | To | Role | Action | Standing |
//! |------|----|------|--------|----------|
//! | pending | recorded | system | confirm | internal |
//! | pending, recorded | processing | processor | claim | unassigned |
//! | processing | awaiting_test | processor | complete | assigned, processing report |
//! | awaiting_test | tested | laboratory | claim | unassigned |
//! | tested | completed | laboratory | complete | assigned, passing test |
//! | tested | rejected | laboratory | complete | assigned, failing test |
//! | pending, recorded | rejected | collector | reject | creator |
//! | processing, awaiting_test | rejected | processor | reject | assigned |
//! | tested | rejected | laboratory | reject | assigned |
//! | completed | rejected | manufacturer | reject | any |

use super::errors::{WorkflowError, WorkflowResult};
use shared_types::{Actor, Batch, BatchStatus, FactType, Role, Timestamp};
use BatchStatus::{AwaitingTest, Completed, Pending, Processing, Recorded, Rejected, Tested};

/// What the actor is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Ledger-driven confirmation.
    Confirm,
    Claim,
    Complete,
    Reject,
}

/// What the actor must be relative to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standing {
    /// Only the internal system actor.
    Internal,
    /// The collector that created the batch.
    Creator,
    /// The role's assignment slot must be empty; the actor takes it.
    Unassigned,
    /// The actor must hold the role's assignment slot.
    Assigned,
    /// Any actor with the role.
    Any,
}

/// Result payload a rule needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evidence {
    None,
    ProcessingReport,
    PassingTest,
    FailingTest,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: &'static [BatchStatus],
    pub to: BatchStatus,
    pub role: Role,
    pub action: Action,
    pub standing: Standing,
    pub evidence: Evidence,
}

impl TransitionRule {
    const fn new(
        from: &'static [BatchStatus],
        to: BatchStatus,
        role: Role,
        action: Action,
        standing: Standing,
        evidence: Evidence,
    ) -> Self {
        Self {
            from,
            to,
            role,
            action,
            standing,
            evidence,
        }
    }

    pub fn applies_to(&self, from: BatchStatus, to: BatchStatus) -> bool {
        self.to == to && self.from.contains(&from)
    }

    /// The ledger fact a commit under this rule enqueues.
    pub fn fact(&self) -> Option<FactType> {
        match (self.to, self.action) {
            (Rejected, _) => Some(FactType::Rejection),
            (AwaitingTest, Action::Complete) => Some(FactType::Processing),
            (Completed, Action::Complete) => Some(FactType::Completion),
            _ => None,
        }
    }
}

/// The transition table. Declared once; every status change goes through it.
#[rustfmt::skip]
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule::new(&[Pending], Recorded, Role::System, Action::Confirm, Standing::Internal, Evidence::None),
    TransitionRule::new(&[Pending, Recorded], Processing, Role::Processor, Action::Claim, Standing::Unassigned, Evidence::None),
    TransitionRule::new(&[Processing], AwaitingTest, Role::Processor, Action::Complete, Standing::Assigned, Evidence::ProcessingReport),
    TransitionRule::new(&[AwaitingTest], Tested, Role::Laboratory, Action::Claim, Standing::Unassigned, Evidence::None),
    TransitionRule::new(&[Tested], Completed, Role::Laboratory, Action::Complete, Standing::Assigned, Evidence::PassingTest),
    TransitionRule::new(&[Tested], Rejected, Role::Laboratory, Action::Complete, Standing::Assigned, Evidence::FailingTest),
    TransitionRule::new(&[Pending, Recorded], Rejected, Role::Collector, Action::Reject, Standing::Creator, Evidence::None),
    TransitionRule::new(&[Processing, AwaitingTest], Rejected, Role::Processor, Action::Reject, Standing::Assigned, Evidence::None),
    TransitionRule::new(&[Tested], Rejected, Role::Laboratory, Action::Reject, Standing::Assigned, Evidence::None),
    TransitionRule::new(&[Completed], Rejected, Role::Manufacturer, Action::Reject, Standing::Any, Evidence::None),
];

/// Whether `(from, to)` appears anywhere in the table.
pub fn is_listed(from: BatchStatus, to: BatchStatus) -> bool {
    TRANSITIONS.iter().any(|rule| rule.applies_to(from, to))
}

/// Statuses a role can pick work up from: the `from` states of its claim
/// rules and of rules open to any actor of the role.
pub fn entry_states(role: Role) -> Vec<BatchStatus> {
    let mut states: Vec<BatchStatus> = TRANSITIONS
        .iter()
        .filter(|rule| rule.role == role)
        .filter(|rule| matches!(rule.standing, Standing::Unassigned | Standing::Any))
        .flat_map(|rule| rule.from.iter().copied())
        .collect();
    states.dedup();
    states
}

/// Target status of the role's claim action.
pub fn claim_target(role: Role) -> Option<BatchStatus> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.role == role && rule.action == Action::Claim)
        .map(|rule| rule.to)
}

/// Find the rule authorizing `actor` to move `batch` to `to`.
///
/// `action == None` is a generic transition request: it may only use rules
/// that need no result payload. Lookup order decides the error:
///
/// 1. pair not in table: `InvalidTransition`
/// 2. no rule for the actor's role: `NotAssigned`
/// 3. no rule for the requested action: `InvalidTransition`
/// 4. evidence mismatch: `Validation`
/// 5. standing check: `NotAssigned`, or `Conflict` for a taken slot
pub fn authorize(
    batch: &Batch,
    actor: &Actor,
    to: BatchStatus,
    action: Option<Action>,
    evidence: Evidence,
) -> WorkflowResult<&'static TransitionRule> {
    let from = batch.status;
    let invalid = || WorkflowError::InvalidTransition {
        from,
        to,
        role: actor.role,
    };
    let not_assigned = || WorkflowError::NotAssigned {
        batch_id: batch.batch_id.clone(),
        actor_id: actor.id.clone(),
        role: actor.role,
    };

    if !is_listed(from, to) {
        return Err(invalid());
    }

    let for_role: Vec<&'static TransitionRule> = TRANSITIONS
        .iter()
        .filter(|rule| rule.applies_to(from, to) && rule.role == actor.role)
        .collect();
    if for_role.is_empty() {
        return Err(not_assigned());
    }

    let for_action: Vec<&'static TransitionRule> = match action {
        Some(action) => for_role
            .into_iter()
            .filter(|rule| rule.action == action)
            .collect(),
        None => for_role,
    };
    if for_action.is_empty() {
        return Err(invalid());
    }

    let rule = for_action
        .iter()
        .copied()
        .find(|rule| rule.evidence == evidence)
        .ok_or_else(|| match action {
            None => WorkflowError::Validation(format!(
                "{from} -> {to} requires a result payload; use complete"
            )),
            Some(_) => WorkflowError::Validation(format!(
                "{from} -> {to} requires {:?} evidence",
                for_action[0].evidence
            )),
        })?;

    check_standing(batch, actor, rule)?;
    Ok(rule)
}

fn check_standing(batch: &Batch, actor: &Actor, rule: &TransitionRule) -> WorkflowResult<()> {
    let not_assigned = || WorkflowError::NotAssigned {
        batch_id: batch.batch_id.clone(),
        actor_id: actor.id.clone(),
        role: actor.role,
    };

    match rule.standing {
        Standing::Internal => {
            if actor.role == Role::System {
                Ok(())
            } else {
                Err(not_assigned())
            }
        }
        Standing::Creator => {
            if batch.farmer_id == actor.id {
                Ok(())
            } else {
                Err(not_assigned())
            }
        }
        Standing::Unassigned => match batch.assignee(actor.role) {
            None => Ok(()),
            Some(holder) => Err(WorkflowError::Conflict {
                batch_id: batch.batch_id.clone(),
                reason: format!("already claimed by {holder}"),
            }),
        },
        Standing::Assigned => match batch.assignee(actor.role) {
            Some(holder) if *holder == actor.id => Ok(()),
            _ => Err(not_assigned()),
        },
        Standing::Any => Ok(()),
    }
}

/// Apply an authorized rule: status, assignment slot and timestamps.
///
/// Returns the previous status. The caller enqueues `rule.fact()`.
pub fn apply(batch: &mut Batch, rule: &TransitionRule, actor: &Actor, now: Timestamp) -> BatchStatus {
    let from = batch.status;

    if rule.standing == Standing::Unassigned {
        match actor.role {
            Role::Processor => batch.processor_id = Some(actor.id.clone()),
            Role::Laboratory => batch.lab_id = Some(actor.id.clone()),
            _ => {}
        }
    }

    match rule.to {
        Processing => batch.processing_started_at = Some(now),
        AwaitingTest => batch.processing_completed_at = Some(now),
        Tested => batch.testing_started_at = Some(now),
        Completed => batch.tested_at = Some(now),
        Rejected => {
            if rule.action == Action::Complete {
                batch.tested_at = Some(now);
            }
            batch.rejected_at = Some(now);
        }
        Pending | Recorded => {}
    }

    batch.status = rule.to;
    from
}
