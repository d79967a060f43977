//! # Error Taxonomy
//!
//! The kinds of §7, not identifiers: callers match on the variant to decide
//! whether to retry, surface, or degrade. `BeehiveResult<T>` is the return
//! type threaded through every component.

use thiserror::Error;
use uuid::Uuid;

pub type BeehiveResult<T> = Result<T, BeehiveError>;

#[derive(Debug, Error)]
pub enum BeehiveError {
    /// Caller-supplied data violates a contract. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Temporary store fault, worth retrying with backoff.
    #[error("store temporarily unavailable: {0}")]
    StoreTransient(String),

    /// Exhausted the retry budget for a `StoreTransient` fault.
    #[error("store unavailable after retries: {0}")]
    StoreUnavailable(String),

    /// A constraint violation — a logic bug or stale input, not transient.
    #[error("store integrity violation: {0}")]
    StoreIntegrity(String),

    /// The multiplexer is unreachable, or the addressed pane/session is gone.
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-violation finding. Never aborts the producing path.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Optimistic concurrency failure on a task transition or assignment.
    #[error("conflicting transition for task {task_id}: {reason}")]
    StateConflict { task_id: Uuid, reason: String },

    /// User or deadline cancellation.
    #[error("operation cancelled")]
    Cancelled,

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("bee {0} is not a valid assignee")]
    InvalidAssignee(String),

    #[error("task {task_id} already has a primary assignee")]
    AlreadyAssigned { task_id: Uuid },

    #[error("task {task_id} cannot transition to {to}: unmet blocking dependencies {blockers:?}")]
    DependencyUnmet {
        task_id: Uuid,
        to: String,
        blockers: Vec<Uuid>,
    },

    #[error("task {task_id} is already in status {status}")]
    NoOpTransition { task_id: Uuid, status: String },

    #[error("transition from {from} to {to} is not allowed for task {task_id}")]
    IllegalTransition {
        task_id: Uuid,
        from: String,
        to: String,
    },

    #[error("dependency insertion would create a cycle through task {0}")]
    CyclicDependency(Uuid),

    #[error("invalid pane for bee {0}")]
    InvalidPane(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BeehiveError {
    /// Whether a caller is expected to retry this error itself (as opposed
    /// to the bounded internal retry the Store already performs for
    /// `StoreTransient`).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BeehiveError::StoreTransient(_) | BeehiveError::StateConflict { .. }
        )
    }

    /// Stable machine-readable kind, for the CLI's error output and exit
    /// code mapping (§6, §7).
    pub fn kind(&self) -> &'static str {
        match self {
            BeehiveError::Validation(_) => "validation_error",
            BeehiveError::StoreTransient(_) => "store_transient",
            BeehiveError::StoreUnavailable(_) => "store_unavailable",
            BeehiveError::StoreIntegrity(_) => "store_integrity",
            BeehiveError::Transport(_) => "transport_error",
            BeehiveError::Protocol(_) => "protocol_error",
            BeehiveError::StateConflict { .. } => "state_conflict",
            BeehiveError::Cancelled => "cancelled",
            BeehiveError::TaskNotFound(_) => "task_not_found",
            BeehiveError::InvalidAssignee(_) => "invalid_assignee",
            BeehiveError::AlreadyAssigned { .. } => "already_assigned",
            BeehiveError::DependencyUnmet { .. } => "dependency_unmet",
            BeehiveError::NoOpTransition { .. } => "no_op_transition",
            BeehiveError::IllegalTransition { .. } => "illegal_transition",
            BeehiveError::CyclicDependency(_) => "cyclic_dependency",
            BeehiveError::InvalidPane(_) => "invalid_pane",
            BeehiveError::Io(_) => "io_error",
            BeehiveError::Serde(_) => "serde_error",
        }
    }

    /// §6 exit-code mapping: 1 generic, 2 precondition violation, 3 external
    /// dependency failure. `Ok` paths return 0 and never call this.
    pub fn exit_code(&self) -> i32 {
        match self {
            BeehiveError::TaskNotFound(_)
            | BeehiveError::InvalidAssignee(_)
            | BeehiveError::AlreadyAssigned { .. }
            | BeehiveError::DependencyUnmet { .. }
            | BeehiveError::NoOpTransition { .. }
            | BeehiveError::IllegalTransition { .. }
            | BeehiveError::CyclicDependency(_)
            | BeehiveError::Validation(_)
            | BeehiveError::InvalidPane(_) => 2,
            BeehiveError::Transport(_) | BeehiveError::StoreUnavailable(_) => 3,
            _ => 1,
        }
    }
}
