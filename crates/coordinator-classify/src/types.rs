use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of intents the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateTask,
    ModifyTask,
    ReassignTask,
    ChangePriority,
    ChangeDeadline,
    ChangeStatus,
    AddTags,
    RemoveTags,
    AddSubtask,
    CompleteSubtask,
    AddDependency,
    RemoveDependency,
    DuplicateTask,
    SplitTask,
    TaskDone,
    SubmitProof,
    CheckStatus,
    CheckOverdue,
    SearchTasks,
    BulkComplete,
    DelayTask,
    AddTeamMember,
    AskTeamMember,
    TeachPreference,
    ApproveTask,
    RejectTask,
    CancelTask,
    ClearTasks,
    ArchiveTasks,
    Help,
    Greeting,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CreateTask => "create_task",
            Intent::ModifyTask => "modify_task",
            Intent::ReassignTask => "reassign_task",
            Intent::ChangePriority => "change_priority",
            Intent::ChangeDeadline => "change_deadline",
            Intent::ChangeStatus => "change_status",
            Intent::AddTags => "add_tags",
            Intent::RemoveTags => "remove_tags",
            Intent::AddSubtask => "add_subtask",
            Intent::CompleteSubtask => "complete_subtask",
            Intent::AddDependency => "add_dependency",
            Intent::RemoveDependency => "remove_dependency",
            Intent::DuplicateTask => "duplicate_task",
            Intent::SplitTask => "split_task",
            Intent::TaskDone => "task_done",
            Intent::SubmitProof => "submit_proof",
            Intent::CheckStatus => "check_status",
            Intent::CheckOverdue => "check_overdue",
            Intent::SearchTasks => "search_tasks",
            Intent::BulkComplete => "bulk_complete",
            Intent::DelayTask => "delay_task",
            Intent::AddTeamMember => "add_team_member",
            Intent::AskTeamMember => "ask_team_member",
            Intent::TeachPreference => "teach_preference",
            Intent::ApproveTask => "approve_task",
            Intent::RejectTask => "reject_task",
            Intent::CancelTask => "cancel_task",
            Intent::ClearTasks => "clear_tasks",
            Intent::ArchiveTasks => "archive_tasks",
            Intent::Help => "help",
            Intent::Greeting => "greeting",
        }
    }

    /// Slash command that maps directly to this intent, if any.
    pub fn from_slash_command(cmd: &str) -> Option<Self> {
        Some(match cmd {
            "/task" | "/urgent" | "/new" => Intent::CreateTask,
            "/done" => Intent::TaskDone,
            "/status" => Intent::CheckStatus,
            "/overdue" => Intent::CheckOverdue,
            "/approve" => Intent::ApproveTask,
            "/reject" => Intent::RejectTask,
            "/cancel" => Intent::CancelTask,
            "/help" => Intent::Help,
            _ => return None,
        })
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "create_task" => Intent::CreateTask,
            "modify_task" => Intent::ModifyTask,
            "reassign_task" => Intent::ReassignTask,
            "change_priority" => Intent::ChangePriority,
            "change_deadline" => Intent::ChangeDeadline,
            "change_status" => Intent::ChangeStatus,
            "add_tags" => Intent::AddTags,
            "remove_tags" => Intent::RemoveTags,
            "add_subtask" => Intent::AddSubtask,
            "complete_subtask" => Intent::CompleteSubtask,
            "add_dependency" => Intent::AddDependency,
            "remove_dependency" => Intent::RemoveDependency,
            "duplicate_task" => Intent::DuplicateTask,
            "split_task" => Intent::SplitTask,
            "task_done" => Intent::TaskDone,
            "submit_proof" => Intent::SubmitProof,
            "check_status" => Intent::CheckStatus,
            "check_overdue" => Intent::CheckOverdue,
            "search_tasks" => Intent::SearchTasks,
            "bulk_complete" => Intent::BulkComplete,
            "delay_task" => Intent::DelayTask,
            "add_team_member" => Intent::AddTeamMember,
            "ask_team_member" => Intent::AskTeamMember,
            "teach_preference" => Intent::TeachPreference,
            "approve_task" => Intent::ApproveTask,
            "reject_task" => Intent::RejectTask,
            "cancel_task" => Intent::CancelTask,
            "clear_tasks" => Intent::ClearTasks,
            "archive_tasks" => Intent::ArchiveTasks,
            "help" => Intent::Help,
            "greeting" => Intent::Greeting,
            other => return Err(format!("unknown intent: {other}")),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f64,
    pub reasoning: String,
    /// Raw field hints from the classifier. The dialog and task layers
    /// re-extract and own the authoritative values for dates, priorities,
    /// and task ids — these are advisory only.
    pub extracted_fields: HashMap<String, String>,
}

/// What the dialog engine should do with an [`IntentResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    ExecuteDirectly,
    ConfirmWithUser,
    AskClarifyingQuestion,
}
