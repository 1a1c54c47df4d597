use chrono::{DateTime, Utc};
use coordinator_core::types::{Priority, TaskStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub task_ref: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_transport_id: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub task_type: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub progress: i64,
    pub tags: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub external_thread_id: Option<String>,
    pub soft_deleted: bool,
    pub subtasks: Vec<SubtaskRecord>,
    pub blocked_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_transport_id: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub task_type: Option<String>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub progress: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub acceptance_criteria: Option<Vec<String>>,
    pub external_thread_id: Option<String>,
    pub soft_deleted: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskRecord {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub completed: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub actor: String,
    pub action: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub transport: String,
    pub transport_user: String,
    pub user_ref: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Developer,
    Admin,
    Marketing,
    Design,
    #[default]
    Other,
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TeamRole::Developer => "developer",
            TeamRole::Admin => "admin",
            TeamRole::Marketing => "marketing",
            TeamRole::Design => "design",
            TeamRole::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TeamRole {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "developer" => TeamRole::Developer,
            "admin" => TeamRole::Admin,
            "marketing" => TeamRole::Marketing,
            "design" => TeamRole::Design,
            _ => TeamRole::Other,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: TeamRole,
    pub transport_id: Option<String>,
    pub secondary_channel_id: Option<String>,
    pub email: Option<String>,
    pub timezone: String,
    pub work_start: Option<String>,
    pub active: bool,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub email: String,
    pub service: String,
    pub refresh_token: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_name: String,
    pub date: chrono::NaiveDate,
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: String,
    pub title_template: String,
    pub schedule_json: String,
    pub assignee_name: Option<String>,
    pub priority: Priority,
    pub active: bool,
    pub last_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub minutes: Option<i64>,
}

/// `user_timesheet` read model: time entries eagerly joined with their
/// parent task's title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub entry: TimeEntry,
    pub task_title: String,
    pub task_ref: String,
}
