use coordinator_core::types::TaskStatus;

use crate::error::{Result, TasksError};

/// Enforceable status-transition adjacency. Only the happy-path
/// chain and its side branches are legal; `completed` is reachable only via
/// `awaiting_validation` (the approval path), never directly from `pending`.
fn allowed_next(from: TaskStatus) -> &'static [TaskStatus] {
    use TaskStatus::*;
    match from {
        Pending => &[InProgress, Cancelled, Blocked, OnHold],
        InProgress => &[InReview, Blocked, Delayed, OnHold, Cancelled, NeedsInfo],
        InReview => &[AwaitingValidation, NeedsRevision, InProgress],
        AwaitingValidation => &[Completed, NeedsRevision],
        NeedsRevision => &[InProgress],
        Blocked => &[InProgress, Cancelled],
        Delayed => &[InProgress, Cancelled],
        OnHold => &[InProgress, Cancelled],
        Waiting => &[InProgress, Cancelled],
        NeedsInfo => &[InProgress, Cancelled],
        Undone => &[InProgress],
        Completed | Cancelled | Overdue => &[],
    }
}

/// Validate a user-requested transition. `overdue` is never user-settable
/// and is excluded from `allowed_next` targets here as well as
/// being system-applied only by the scheduler.
pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if !to.is_user_settable() {
        return Err(TasksError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    if allowed_next(from).contains(&to) {
        Ok(())
    } else {
        Err(TasksError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn happy_path_chain_is_legal() {
        assert!(validate_transition(Pending, InProgress).is_ok());
        assert!(validate_transition(InProgress, InReview).is_ok());
        assert!(validate_transition(InReview, AwaitingValidation).is_ok());
        assert!(validate_transition(AwaitingValidation, Completed).is_ok());
    }

    #[test]
    fn direct_pending_to_completed_is_rejected() {
        assert!(validate_transition(Pending, Completed).is_err());
    }

    #[test]
    fn overdue_is_never_a_legal_user_target() {
        assert!(validate_transition(InProgress, Overdue).is_err());
    }

    #[test]
    fn rejection_routes_back_to_needs_revision() {
        assert!(validate_transition(AwaitingValidation, NeedsRevision).is_ok());
        assert!(validate_transition(NeedsRevision, InProgress).is_ok());
    }
}
