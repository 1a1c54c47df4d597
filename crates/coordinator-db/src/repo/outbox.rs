use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::pool::Pool;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutboxRow {
    pub id: String,
    pub target_adapter: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub dead_letter: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Durable outbox queue. Items are enqueued in the same
/// transaction as the domain write that produced them; workers drain items
/// whose `next_attempt_at <= now AND NOT dead_letter`.
#[derive(Clone)]
pub struct OutboxRepo {
    pool: Pool,
}

impl OutboxRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Enqueue a new item. Returns `Ok(None)` instead of an error when the
    /// idempotency key already has a live (non-dead-lettered) entry — this
    /// is the intended dedup path, not a failure.
    #[instrument(skip(self, payload))]
    pub fn enqueue(
        &self,
        target_adapter: &str,
        payload: &serde_json::Value,
        idempotency_key: &str,
        max_attempts: u32,
    ) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO outbox (id, target_adapter, payload, idempotency_key, attempt_count,
                                  max_attempts, next_attempt_at, dead_letter, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, 0, ?6)",
            params![
                id,
                target_adapter,
                payload.to_string(),
                idempotency_key,
                max_attempts,
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(Some(id)),
            Err(rusqlite::Error::SqliteFailure(ref e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                Ok(None)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    #[instrument(skip(self))]
    pub fn claim_due(&self, limit: i64) -> Result<Vec<OutboxRow>> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, target_adapter, payload, idempotency_key, attempt_count, max_attempts,
                    next_attempt_at, dead_letter, last_error, created_at
             FROM outbox WHERE NOT dead_letter AND next_attempt_at <= ?1
             ORDER BY next_attempt_at ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now, limit], row_to_outbox)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    #[instrument(skip(self))]
    pub fn mark_delivered(&self, id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// `min(60s * 2^attempt, 15min)` backoff ceiling.
    #[instrument(skip(self, error))]
    pub fn mark_retry(&self, id: &str, error: &str, backoff_cap_secs: u64) -> Result<()> {
        let conn = self.pool.get()?;
        let (attempt_count, max_attempts): (u32, u32) = conn.query_row(
            "SELECT attempt_count, max_attempts FROM outbox WHERE id = ?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let new_count = attempt_count + 1;
        if new_count >= max_attempts {
            return self.mark_dead_letter(id, error);
        }

        let delay_secs = (60u64 * 2u64.pow(attempt_count)).min(backoff_cap_secs);
        let next = Utc::now() + chrono::Duration::seconds(delay_secs as i64);

        conn.execute(
            "UPDATE outbox SET attempt_count = ?2, next_attempt_at = ?3, last_error = ?4 WHERE id = ?1",
            params![id, new_count, next.to_rfc3339(), error],
        )?;
        Ok(())
    }

    #[instrument(skip(self, error))]
    pub fn mark_dead_letter(&self, id: &str, error: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE outbox SET dead_letter = 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<Option<OutboxRow>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, target_adapter, payload, idempotency_key, attempt_count, max_attempts,
                    next_attempt_at, dead_letter, last_error, created_at
             FROM outbox WHERE id = ?1",
            params![id],
            row_to_outbox,
        )
        .optional()
        .map_err(DbError::from)
    }
}

fn row_to_outbox(row: &rusqlite::Row<'_>) -> rusqlite::Result<OutboxRow> {
    let payload_str: String = row.get(2)?;
    Ok(OutboxRow {
        id: row.get(0)?,
        target_adapter: row.get(1)?,
        payload: serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null),
        idempotency_key: row.get(3)?,
        attempt_count: row.get(4)?,
        max_attempts: row.get(5)?,
        next_attempt_at: super::parse_dt(row.get::<_, String>(6)?),
        dead_letter: row.get::<_, i64>(7)? != 0,
        last_error: row.get(8)?,
        created_at: super::parse_dt(row.get::<_, String>(9)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::build_pool;

    #[test]
    fn enqueue_dedups_on_idempotency_key() {
        let pool = build_pool(":memory:").unwrap();
        let repo = OutboxRepo::new(pool);

        let first = repo
            .enqueue("transport", &serde_json::json!({"a": 1}), "task-create:TASK-1", 5)
            .unwrap();
        assert!(first.is_some());

        let second = repo
            .enqueue("transport", &serde_json::json!({"a": 2}), "task-create:TASK-1", 5)
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn mark_retry_exhausts_into_dead_letter() {
        let pool = build_pool(":memory:").unwrap();
        let repo = OutboxRepo::new(pool);
        let id = repo
            .enqueue("transport", &serde_json::json!({}), "k1", 2)
            .unwrap()
            .unwrap();

        repo.mark_retry(&id, "timeout", 900).unwrap();
        let row = repo.get(&id).unwrap().unwrap();
        assert!(!row.dead_letter);
        assert_eq!(row.attempt_count, 1);

        repo.mark_retry(&id, "timeout again", 900).unwrap();
        let row = repo.get(&id).unwrap().unwrap();
        assert!(row.dead_letter);
    }
}
