//! `coordinator-tasks` — the task processor.
//!
//! Assembles canonical task records from intent output, session scratch,
//! and team lookups; resolves assignees through a 3-tier fallback; runs
//! structural validity checks; persists; and enqueues the outbound side
//! effects a new or updated task implies.

pub mod assignee;
pub mod error;
pub mod processor;
pub mod transitions;
pub mod types;
pub mod validate;

pub use assignee::AssigneeResolver;
pub use error::{Result, TasksError};
pub use processor::TaskProcessor;
pub use transitions::validate_transition;
pub use types::{
    role_default_minutes, score_submission, AssembledFields, AssigneeResolution, AssigneeTier,
    ReviewInput, ReviewOutcome, StaticAssigneeDirectory, REVIEW_PASS_THRESHOLD,
};
pub use validate::{validate_acyclic, validate_assembled, ValidationOutcome};
