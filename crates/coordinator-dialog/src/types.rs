use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DialogError;

/// Per-user dialog stage. Persisted as the `state` text column
/// on `conversations` via `Display`/`FromStr`, mirroring how
/// `coordinator-core::types` round-trips its other closed-set enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    Creating,
    Clarifying,
    Preview,
    AwaitingConfirm,
    BatchProcessing,
    SpecDetail,
    SubmittingProof,
    AddingNotes,
    AwaitingValidation,
    Modifying,
    Closed,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::Clarifying => "clarifying",
            Self::Preview => "preview",
            Self::AwaitingConfirm => "awaiting_confirm",
            Self::BatchProcessing => "batch_processing",
            Self::SpecDetail => "spec_detail",
            Self::SubmittingProof => "submitting_proof",
            Self::AddingNotes => "adding_notes",
            Self::AwaitingValidation => "awaiting_validation",
            Self::Modifying => "modifying",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConversationState {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "idle" => Self::Idle,
            "creating" => Self::Creating,
            "clarifying" => Self::Clarifying,
            "preview" => Self::Preview,
            "awaiting_confirm" => Self::AwaitingConfirm,
            "batch_processing" => Self::BatchProcessing,
            "spec_detail" => Self::SpecDetail,
            "submitting_proof" => Self::SubmittingProof,
            "adding_notes" => Self::AddingNotes,
            "awaiting_validation" => Self::AwaitingValidation,
            "modifying" => Self::Modifying,
            "closed" => Self::Closed,
            other => return Err(DialogError::UnknownStage(other.to_string())),
        })
    }
}

/// Scratch payload carried in the `spec` session namespace across turns of
/// a single conversation. Opaque to the session store; this is the shape
/// the dialog engine actually puts in it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogScratch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_candidate: Option<String>,
    pub priority: Option<String>,
    pub deadline: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub tags: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub complexity_score: Option<i64>,
    pub pending_question: Option<String>,
    /// Remaining candidate tasks in a batch, in order, not yet previewed.
    pub batch_remaining: Vec<BatchCandidate>,
    pub batch_shared_assignee: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCandidate {
    pub title: String,
}

/// What the dialog engine hands back to the caller after processing one
/// inbound message: the new stage plus zero or more bot utterances to send.
#[derive(Debug, Clone)]
pub struct DialogOutcome {
    pub next_state: ConversationState,
    pub replies: Vec<String>,
    pub task_persisted: Option<coordinator_db::types::TaskRecord>,
}

impl DialogOutcome {
    pub fn reply(next_state: ConversationState, text: impl Into<String>) -> Self {
        Self {
            next_state,
            replies: vec![text.into()],
            task_persisted: None,
        }
    }
}
