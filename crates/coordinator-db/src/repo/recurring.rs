use std::str::FromStr;

use chrono::Utc;
use coordinator_core::types::Priority;
use rusqlite::params;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::pool::Pool;
use crate::types::RecurringTask;

pub struct RecurringTaskRepo {
    pool: Pool,
}

impl RecurringTaskRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub fn create(&self, title_template: &str, schedule_json: &str, assignee_name: Option<&str>, priority: Priority) -> Result<String> {
        let conn = self.pool.get()?;
        let id = Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO recurring_tasks (id, title_template, schedule_json, assignee_name, priority, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![id, title_template, schedule_json, assignee_name, priority.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn list_active(&self) -> Result<Vec<RecurringTask>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, title_template, schedule_json, assignee_name, priority, active, last_created_at
             FROM recurring_tasks WHERE active = 1",
        )?;
        let rows = stmt.query_map([], row_to_recurring)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    #[instrument(skip(self))]
    pub fn mark_created(&self, id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE recurring_tasks SET last_created_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn row_to_recurring(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecurringTask> {
    let priority_str: String = row.get(4)?;
    let last_created: Option<String> = row.get(6)?;
    Ok(RecurringTask {
        id: row.get(0)?,
        title_template: row.get(1)?,
        schedule_json: row.get(2)?,
        assignee_name: row.get(3)?,
        priority: Priority::from_str(&priority_str).unwrap_or_default(),
        active: row.get::<_, i64>(5)? != 0,
        last_created_at: last_created.map(super::parse_dt),
    })
}
