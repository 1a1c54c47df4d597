pub mod attendance;
pub mod audit;
pub mod conversation;
pub mod oauth;
pub mod outbox;
pub mod processed_update;
pub mod recurring;
pub mod reminder_ledger;
pub mod subtask;
pub mod task;
pub mod team;
pub mod time_entry;

pub use attendance::AttendanceRepo;
pub use audit::AuditRepo;
pub use conversation::ConversationRepo;
pub use oauth::OAuthTokenRepo;
pub use outbox::{OutboxRepo, OutboxRow};
pub use processed_update::ProcessedUpdateRepo;
pub use recurring::RecurringTaskRepo;
pub use reminder_ledger::ReminderLedgerRepo;
pub use subtask::SubtaskRepo;
pub use task::TaskRepo;
pub use team::TeamRepo;
pub use time_entry::TimeEntryRepo;

use chrono::{DateTime, Utc};

pub(crate) fn parse_dt(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
