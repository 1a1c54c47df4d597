use chrono::Utc;
use rusqlite::params;
use tracing::instrument;

use crate::error::Result;
use crate::pool::Pool;

/// Prevents re-sending the same deadline reminder twice.
pub struct ReminderLedgerRepo {
    pool: Pool,
}

impl ReminderLedgerRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Returns `true` if this `(task_id, bucket)` pair has already fired.
    #[instrument(skip(self))]
    pub fn already_sent(&self, task_id: &str, bucket: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reminder_ledger WHERE task_id = ?1 AND interval_bucket = ?2",
            params![task_id, bucket],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Atomically record that `(task_id, bucket)` was just sent. Callers
    /// must consult `already_sent` first and treat the insert racing
    /// another sender as a no-op.
    #[instrument(skip(self))]
    pub fn record_sent(&self, task_id: &str, bucket: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let n = conn.execute(
            "INSERT OR IGNORE INTO reminder_ledger (task_id, interval_bucket, sent_at) VALUES (?1, ?2, ?3)",
            params![task_id, bucket, Utc::now().to_rfc3339()],
        )?;
        Ok(n == 1)
    }
}
