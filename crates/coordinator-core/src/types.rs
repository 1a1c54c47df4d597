use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// External task identifier, format `TASK-YYYYMMDD-NNN`.
///
/// Distinct from the internal surrogate id used as the DB primary key —
/// this is the value users and external systems see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskRef(pub String);

impl TaskRef {
    pub fn new(date: chrono::NaiveDate, seq: u32) -> Self {
        Self(format!("TASK-{}-{:03}", date.format("%Y%m%d"), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Internal surrogate id (UUIDv7 — time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifies a user within the coordination system, independent of which
/// transport account (chat handle, email) they message from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef(pub String);

impl UserRef {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies a conversation thread with a single user on a single transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn for_transport_user(transport: &str, transport_user_id: &str) -> Self {
        Self(format!("{transport}:{transport_user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Namespaced session-store key: `{namespace}:{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey(pub String);

impl StoreKey {
    pub fn new(namespace: SessionNamespace, key: &str) -> Self {
        Self(format!("{namespace}:{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-store namespace. Each carries its own default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionNamespace {
    Validation,
    PendingValidation,
    Review,
    Action,
    Batch,
    Spec,
    Recent,
}

impl SessionNamespace {
    /// Default entry lifetime for this namespace.
    pub fn default_ttl(&self) -> std::time::Duration {
        use std::time::Duration;
        match self {
            SessionNamespace::Action | SessionNamespace::Recent => Duration::from_secs(5 * 60),
            _ => Duration::from_secs(60 * 60),
        }
    }
}

impl fmt::Display for SessionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionNamespace::Validation => "validation",
            SessionNamespace::PendingValidation => "pending_validation",
            SessionNamespace::Review => "review",
            SessionNamespace::Action => "action",
            SessionNamespace::Batch => "batch",
            SessionNamespace::Spec => "spec",
            SessionNamespace::Recent => "recent",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionNamespace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "validation" => Ok(SessionNamespace::Validation),
            "pending_validation" => Ok(SessionNamespace::PendingValidation),
            "review" => Ok(SessionNamespace::Review),
            "action" => Ok(SessionNamespace::Action),
            "batch" => Ok(SessionNamespace::Batch),
            "spec" => Ok(SessionNamespace::Spec),
            "recent" => Ok(SessionNamespace::Recent),
            other => Err(format!("unknown session namespace: {other}")),
        }
    }
}

/// Closed set of 14 task statuses. `Overdue` is system-set by
/// the scheduler, never user-settable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    InReview,
    AwaitingValidation,
    NeedsRevision,
    Completed,
    Cancelled,
    Blocked,
    Delayed,
    Undone,
    OnHold,
    Waiting,
    NeedsInfo,
    Overdue,
}

impl TaskStatus {
    /// `progress=100 ↔ status ∈ {completed, cancelled}`.
    pub fn implies_full_progress(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// `overdue` is a system-applied marker, never accepted from a user intent.
    pub fn is_user_settable(&self) -> bool {
        !matches!(self, TaskStatus::Overdue)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::AwaitingValidation => "awaiting_validation",
            TaskStatus::NeedsRevision => "needs_revision",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Undone => "undone",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Waiting => "waiting",
            TaskStatus::NeedsInfo => "needs_info",
            TaskStatus::Overdue => "overdue",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "in_review" => Ok(TaskStatus::InReview),
            "awaiting_validation" => Ok(TaskStatus::AwaitingValidation),
            "needs_revision" => Ok(TaskStatus::NeedsRevision),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            "blocked" => Ok(TaskStatus::Blocked),
            "delayed" => Ok(TaskStatus::Delayed),
            "undone" => Ok(TaskStatus::Undone),
            "on_hold" => Ok(TaskStatus::OnHold),
            "waiting" => Ok(TaskStatus::Waiting),
            "needs_info" => Ok(TaskStatus::NeedsInfo),
            "overdue" => Ok(TaskStatus::Overdue),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task priority, closed set of 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Role a user holds within the coordination system: boss > team member.
///
/// Controls which intents require approval without a DB round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Boss,
    #[default]
    TeamMember,
}

impl UserRole {
    pub fn is_boss(&self) -> bool {
        matches!(self, UserRole::Boss)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Boss => write!(f, "boss"),
            UserRole::TeamMember => write!(f, "team_member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "boss" => Ok(UserRole::Boss),
            "team_member" => Ok(UserRole::TeamMember),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_round_trips_through_display_and_from_str() {
        let all = [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::InReview,
            TaskStatus::AwaitingValidation,
            TaskStatus::NeedsRevision,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
            TaskStatus::Blocked,
            TaskStatus::Delayed,
            TaskStatus::Undone,
            TaskStatus::OnHold,
            TaskStatus::Waiting,
            TaskStatus::NeedsInfo,
            TaskStatus::Overdue,
        ];
        assert_eq!(all.len(), 14);
        for status in all {
            let s = status.to_string();
            assert_eq!(TaskStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn overdue_is_not_user_settable() {
        assert!(!TaskStatus::Overdue.is_user_settable());
        assert!(TaskStatus::Pending.is_user_settable());
    }

    #[test]
    fn completed_and_cancelled_imply_full_progress() {
        assert!(TaskStatus::Completed.implies_full_progress());
        assert!(TaskStatus::Cancelled.implies_full_progress());
        assert!(!TaskStatus::InProgress.implies_full_progress());
    }

    #[test]
    fn task_ref_formats_with_zero_padded_sequence() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(TaskRef::new(date, 1).as_str(), "TASK-20260305-001");
        assert_eq!(TaskRef::new(date, 42).as_str(), "TASK-20260305-042");
    }

    #[test]
    fn session_namespace_defaults_match_spec_ttls() {
        assert_eq!(
            SessionNamespace::Action.default_ttl(),
            std::time::Duration::from_secs(5 * 60)
        );
        assert_eq!(
            SessionNamespace::Validation.default_ttl(),
            std::time::Duration::from_secs(60 * 60)
        );
    }
}
