//! # Domain Errors
//!
//! Error types for the batch workflow. All of them are returned
//! synchronously to the calling actor; ledger problems never surface here.

use shared_types::{ActorId, BatchId, BatchStatus, Role};
use thiserror::Error;

/// Workflow error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// Malformed input, or a transition that needs a result payload.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The `(from, to)` pair is not in the transition table.
    #[error("Invalid transition for {role}: {from} -> {to}")]
    InvalidTransition {
        from: BatchStatus,
        to: BatchStatus,
        role: Role,
    },

    /// Lost a race, or the id is already taken.
    #[error("Conflict on batch {batch_id}: {reason}")]
    Conflict { batch_id: BatchId, reason: String },

    /// The transition exists but this role/actor lacks standing.
    #[error("{role} {actor_id} is not assigned to batch {batch_id}")]
    NotAssigned {
        batch_id: BatchId,
        actor_id: ActorId,
        role: Role,
    },

    #[error("Batch not found: {0}")]
    NotFound(BatchId),

    /// Every generated candidate collided.
    #[error("Batch id generation exhausted after {attempts} attempts")]
    IdGenerationExhausted { attempts: u32 },

    /// Repository failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A mutation would have broken a batch invariant. Nothing was committed.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl WorkflowError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Storage(_) | WorkflowError::IdGenerationExhausted { .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::Conflict { .. } => "conflict",
            WorkflowError::NotAssigned { .. } => "not_assigned",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::IdGenerationExhausted { .. } => "id_generation_exhausted",
            WorkflowError::Storage(_) => "storage",
            WorkflowError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = WorkflowError::InvalidTransition {
            from: BatchStatus::Pending,
            to: BatchStatus::Completed,
            role: Role::Laboratory,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition for laboratory: pending -> completed"
        );
    }

    #[test]
    fn test_not_assigned_message() {
        let err = WorkflowError::NotAssigned {
            batch_id: BatchId::new("ASH-2024-001"),
            actor_id: ActorId::new("proc-b"),
            role: Role::Processor,
        };
        assert!(err.to_string().contains("proc-b"));
        assert_eq!(err.kind(), "not_assigned");
    }

    #[test]
    fn test_conflict_is_not_retryable() {
        let err = WorkflowError::Conflict {
            batch_id: BatchId::new("ASH-2024-001"),
            reason: "already claimed".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(WorkflowError::Storage("disk".to_string()).is_retryable());
    }
}
