//! `coordinator-db` — the relational persistence layer.
//!
//! One thin repository per entity family over a pooled SQLite connection.
//! Full-text search over tasks is backed by an external-content FTS5 index,
//! kept in sync on every write.

pub mod crypto;
pub mod error;
pub mod pool;
pub mod repo;
pub mod schema;
pub mod types;

pub use error::{DbError, Result};
pub use pool::{build_pool, Pool, PooledConn};
pub use repo::{
    AttendanceRepo, AuditRepo, ConversationRepo, OAuthTokenRepo, OutboxRepo, OutboxRow,
    ProcessedUpdateRepo, RecurringTaskRepo, ReminderLedgerRepo, SubtaskRepo, TaskRepo, TeamRepo,
    TimeEntryRepo,
};
