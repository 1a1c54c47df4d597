use chrono::Utc;
use rusqlite::params;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::pool::Pool;

pub struct SubtaskRepo {
    pool: Pool,
}

impl SubtaskRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub fn add(&self, task_id: &str, title: &str, position: i64) -> Result<String> {
        let conn = self.pool.get()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO subtasks (id, task_id, title, completed, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
            params![id, task_id, title, position, now],
        )
        .map_err(DbError::from_write)?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn complete(&self, subtask_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE subtasks SET completed = 1, updated_at = ?2 WHERE id = ?1",
            params![subtask_id, now],
        )?;
        if n == 0 {
            return Err(DbError::NotFound(format!("subtask {subtask_id}")));
        }
        Ok(())
    }
}
