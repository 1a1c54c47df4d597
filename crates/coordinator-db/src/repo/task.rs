use std::str::FromStr;

use chrono::{DateTime, Utc};
use coordinator_core::types::{Priority, TaskStatus};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use crate::error::{DbError, Result};
use crate::pool::Pool;
use crate::types::{SubtaskRecord, TaskPatch, TaskRecord};

/// Repository for `tasks`, with subtasks/dependencies eagerly joined on
/// single-record reads.
pub struct TaskRepo {
    pool: Pool,
}

impl TaskRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, task))]
    pub fn create(&self, task: &TaskRecord) -> Result<TaskRecord> {
        let conn = self.pool.get()?;
        let tags_json = serde_json::to_string(&task.tags)?;
        let ac_json = serde_json::to_string(&task.acceptance_criteria)?;

        conn.execute(
            "INSERT INTO tasks (
                id, task_ref, title, description, assignee_name, assignee_transport_id,
                priority, status, task_type, deadline, created_at, updated_at, created_by,
                estimated_minutes, actual_minutes, progress, tags, acceptance_criteria,
                external_thread_id, soft_deleted
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
            params![
                task.id,
                task.task_ref,
                task.title,
                task.description,
                task.assignee_name,
                task.assignee_transport_id,
                task.priority.to_string(),
                task.status.to_string(),
                task.task_type,
                task.deadline.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
                task.created_by,
                task.estimated_minutes,
                task.actual_minutes,
                task.progress,
                tags_json,
                ac_json,
                task.external_thread_id,
                task.soft_deleted as i64,
            ],
        )
        .map_err(DbError::from_write)?;

        let rowid = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO tasks_fts(rowid, title, description) VALUES (?1, ?2, ?3)",
            params![rowid, task.title, task.description],
        )?;

        self.get_by_id(&task.id)?
            .ok_or_else(|| DbError::PersistenceFailed("task vanished after insert".into()))
    }

    #[instrument(skip(self))]
    pub fn get_by_id(&self, id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.pool.get()?;
        let task = conn
            .query_row(TASK_SELECT_BY_ID, params![id], row_to_task)
            .optional()?;
        let Some(mut task) = task else { return Ok(None) };
        task.subtasks = self.list_subtasks(&conn, &task.id)?;
        task.blocked_by = self.list_blocked_by(&conn, &task.id)?;
        Ok(Some(task))
    }

    #[instrument(skip(self))]
    pub fn get_by_ref(&self, task_ref: &str) -> Result<Option<TaskRecord>> {
        let conn = self.pool.get()?;
        let task = conn
            .query_row(
                "SELECT * FROM tasks WHERE task_ref = ?1 AND soft_deleted = 0",
                params![task_ref],
                row_to_task,
            )
            .optional()?;
        let Some(mut task) = task else { return Ok(None) };
        task.subtasks = self.list_subtasks(&conn, &task.id)?;
        task.blocked_by = self.list_blocked_by(&conn, &task.id)?;
        Ok(Some(task))
    }

    #[instrument(skip(self, patch))]
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<TaskRecord> {
        let conn = self.pool.get()?;
        let existing = conn
            .query_row("SELECT id FROM tasks WHERE id = ?1", params![id], |r| {
                r.get::<_, String>(0)
            })
            .optional()?;
        if existing.is_none() {
            return Err(DbError::NotFound(format!("task {id}")));
        }

        let now = Utc::now().to_rfc3339();
        // SQLite has no partial-update builder in rusqlite; apply each
        // optional field with COALESCE against the incoming value.
        conn.execute(
            "UPDATE tasks SET
                title = COALESCE(?2, title),
                description = COALESCE(?3, description),
                assignee_name = COALESCE(?4, assignee_name),
                assignee_transport_id = COALESCE(?5, assignee_transport_id),
                priority = COALESCE(?6, priority),
                status = COALESCE(?7, status),
                task_type = COALESCE(?8, task_type),
                estimated_minutes = COALESCE(?9, estimated_minutes),
                actual_minutes = COALESCE(?10, actual_minutes),
                progress = COALESCE(?11, progress),
                tags = COALESCE(?12, tags),
                acceptance_criteria = COALESCE(?13, acceptance_criteria),
                external_thread_id = COALESCE(?14, external_thread_id),
                soft_deleted = COALESCE(?15, soft_deleted),
                updated_at = ?16
             WHERE id = ?1",
            params![
                id,
                patch.title,
                patch.description,
                patch.assignee_name,
                patch.assignee_transport_id,
                patch.priority.map(|p| p.to_string()),
                patch.status.map(|s| s.to_string()),
                patch.task_type,
                patch.estimated_minutes,
                patch.actual_minutes,
                patch.progress,
                patch.tags.as_ref().map(|t| serde_json::to_string(t)).transpose()?,
                patch
                    .acceptance_criteria
                    .as_ref()
                    .map(|a| serde_json::to_string(a))
                    .transpose()?,
                patch.external_thread_id,
                patch.soft_deleted.map(|b| b as i64),
                now,
            ],
        )
        .map_err(DbError::from_write)?;

        // `deadline` needs its own statement: `Some(None)` means "clear it",
        // which COALESCE can't express against a single bound parameter.
        if let Some(deadline) = &patch.deadline {
            conn.execute(
                "UPDATE tasks SET deadline = ?2 WHERE id = ?1",
                params![id, deadline.map(|d| d.to_rfc3339())],
            )?;
        }

        if patch.title.is_some() || patch.description.is_some() {
            let (rowid, title, description): (i64, String, Option<String>) = conn.query_row(
                "SELECT rowid, title, description FROM tasks WHERE id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
            conn.execute(
                "INSERT INTO tasks_fts(tasks_fts, rowid, title, description) VALUES('delete', ?1, ?2, ?3)",
                params![rowid, title, description],
            )?;
            conn.execute(
                "INSERT INTO tasks_fts(rowid, title, description) VALUES (?1, ?2, ?3)",
                params![rowid, title, description],
            )?;
        }

        self.get_by_id(id)?
            .ok_or_else(|| DbError::PersistenceFailed("task vanished after update".into()))
    }

    #[instrument(skip(self))]
    pub fn list_by_status(&self, status: TaskStatus, limit: i64, cursor: Option<&str>) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks
             WHERE status = ?1 AND soft_deleted = 0 AND id > COALESCE(?2, '')
             ORDER BY id ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![status.to_string(), cursor, limit], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    /// Every task not in a terminal `completed` state, regardless of which
    /// of the other thirteen statuses it currently holds. Used by the bulk
    /// clear-tasks flow, which needs to sweep the whole board rather than
    /// one status at a time.
    #[instrument(skip(self))]
    pub fn list_not_completed(&self, limit: i64, cursor: Option<&str>) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks
             WHERE status != 'completed' AND soft_deleted = 0 AND id > COALESCE(?1, '')
             ORDER BY id ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    #[instrument(skip(self))]
    pub fn list_by_assignee(&self, assignee_name: &str, limit: i64, cursor: Option<&str>) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks
             WHERE assignee_name = ?1 AND soft_deleted = 0 AND id > COALESCE(?2, '')
             ORDER BY id ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![assignee_name, cursor, limit], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    /// Tasks whose `deadline < now` and status is not a terminal state —
    /// the scheduler marks these `overdue` on each tick.
    #[instrument(skip(self))]
    pub fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks
             WHERE deadline IS NOT NULL AND deadline < ?1
               AND status NOT IN ('completed', 'cancelled', 'overdue')
               AND soft_deleted = 0
             ORDER BY deadline ASC",
        )?;
        let rows = stmt.query_map(params![now.to_rfc3339()], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    #[instrument(skip(self))]
    pub fn list_due_soon(&self, within: chrono::Duration, now: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let horizon = (now + within).to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks
             WHERE deadline IS NOT NULL AND deadline BETWEEN ?1 AND ?2
               AND status NOT IN ('completed', 'cancelled')
               AND soft_deleted = 0
             ORDER BY deadline ASC",
        )?;
        let rows = stmt.query_map(params![now.to_rfc3339(), horizon], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    /// Full-text search over title+description, ranked by FTS5's bm25 score.
    #[instrument(skip(self))]
    pub fn search(&self, text: &str, limit: i64) -> Result<Vec<TaskRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT t.* FROM tasks t
             JOIN tasks_fts f ON t.rowid = f.rowid
             WHERE tasks_fts MATCH ?1 AND t.soft_deleted = 0
             ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![text, limit], row_to_task)?;
        self.hydrate_all(&conn, rows)
    }

    /// Next zero-padded daily sequence number for a `TASK-YYYYMMDD-NNN`
    /// ref. Counts existing refs for that date prefix;
    /// a rare race under concurrent creation on the same day surfaces as a
    /// `DuplicateKey` on insert, which the caller retries with the next seq.
    pub fn next_sequence_for_date(&self, date: chrono::NaiveDate) -> Result<u32> {
        let conn = self.pool.get()?;
        let prefix = format!("TASK-{}-%", date.format("%Y%m%d"));
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE task_ref LIKE ?1",
            params![prefix],
            |r| r.get(0),
        )?;
        Ok(count as u32 + 1)
    }

    pub fn add_dependency(&self, task_id: &str, blocked_by_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_id, blocked_by_id, created_at) VALUES (?1, ?2, ?3)",
            params![task_id, blocked_by_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn remove_dependency(&self, task_id: &str, blocked_by_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM task_dependencies WHERE task_id = ?1 AND blocked_by_id = ?2",
            params![task_id, blocked_by_id],
        )?;
        Ok(())
    }

    fn list_subtasks(&self, conn: &rusqlite::Connection, task_id: &str) -> Result<Vec<SubtaskRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, task_id, title, completed, position, created_at, updated_at
             FROM subtasks WHERE task_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(SubtaskRecord {
                id: row.get(0)?,
                task_id: row.get(1)?,
                title: row.get(2)?,
                completed: row.get::<_, i64>(3)? != 0,
                position: row.get(4)?,
                created_at: parse_dt(row.get::<_, String>(5)?),
                updated_at: parse_dt(row.get::<_, String>(6)?),
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn list_blocked_by(&self, conn: &rusqlite::Connection, task_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT blocked_by_id FROM task_dependencies WHERE task_id = ?1")?;
        let rows = stmt.query_map(params![task_id], |row| row.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn hydrate_all(
        &self,
        conn: &rusqlite::Connection,
        rows: impl Iterator<Item = rusqlite::Result<TaskRecord>>,
    ) -> Result<Vec<TaskRecord>> {
        let mut out = Vec::new();
        for row in rows {
            let mut task = row?;
            task.subtasks = self.list_subtasks(conn, &task.id)?;
            task.blocked_by = self.list_blocked_by(conn, &task.id)?;
            out.push(task);
        }
        Ok(out)
    }
}

const TASK_SELECT_BY_ID: &str = "SELECT * FROM tasks WHERE id = ?1 AND soft_deleted = 0";

use super::parse_dt;

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let tags_json: String = row.get("tags")?;
    let ac_json: String = row.get("acceptance_criteria")?;
    let deadline: Option<String> = row.get("deadline")?;
    let priority_str: String = row.get("priority")?;
    let status_str: String = row.get("status")?;

    Ok(TaskRecord {
        id: row.get("id")?,
        task_ref: row.get("task_ref")?,
        title: row.get("title")?,
        description: row.get("description")?,
        assignee_name: row.get("assignee_name")?,
        assignee_transport_id: row.get("assignee_transport_id")?,
        priority: Priority::from_str(&priority_str).unwrap_or_default(),
        status: TaskStatus::from_str(&status_str).unwrap_or(TaskStatus::Pending),
        task_type: row.get("task_type")?,
        deadline: deadline.map(parse_dt),
        created_at: parse_dt(row.get::<_, String>("created_at")?),
        updated_at: parse_dt(row.get::<_, String>("updated_at")?),
        created_by: row.get("created_by")?,
        estimated_minutes: row.get("estimated_minutes")?,
        actual_minutes: row.get("actual_minutes")?,
        progress: row.get("progress")?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        acceptance_criteria: serde_json::from_str(&ac_json).unwrap_or_default(),
        external_thread_id: row.get("external_thread_id")?,
        soft_deleted: row.get::<_, i64>("soft_deleted")? != 0,
        subtasks: Vec::new(),
        blocked_by: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::build_pool;
    use coordinator_core::types::TaskRef;

    fn test_pool() -> Pool {
        build_pool(":memory:").unwrap()
    }

    fn sample_task(task_ref: &str) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: uuid::Uuid::now_v7().to_string(),
            task_ref: task_ref.to_string(),
            title: "fix the login bug".to_string(),
            description: Some("users cannot sign in on mobile".to_string()),
            assignee_name: Some("John".to_string()),
            assignee_transport_id: None,
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            task_type: None,
            deadline: None,
            created_at: now,
            updated_at: now,
            created_by: "boss".to_string(),
            estimated_minutes: None,
            actual_minutes: None,
            progress: 0,
            tags: vec!["bug".to_string()],
            acceptance_criteria: Vec::new(),
            external_thread_id: None,
            soft_deleted: false,
            subtasks: Vec::new(),
            blocked_by: Vec::new(),
        }
    }

    #[test]
    fn create_then_get_by_ref_round_trips() {
        let repo = TaskRepo::new(test_pool());
        let task = sample_task("TASK-20260801-001");
        repo.create(&task).unwrap();

        let found = repo.get_by_ref("TASK-20260801-001").unwrap().unwrap();
        assert_eq!(found.title, "fix the login bug");
        assert_eq!(found.assignee_name.as_deref(), Some("John"));
    }

    #[test]
    fn duplicate_task_ref_is_rejected() {
        let repo = TaskRepo::new(test_pool());
        let task = sample_task("TASK-20260801-002");
        repo.create(&task).unwrap();

        let mut dup = sample_task("TASK-20260801-002");
        dup.id = uuid::Uuid::now_v7().to_string();
        let err = repo.create(&dup).unwrap_err();
        assert!(matches!(err, DbError::DuplicateKey(_)));
    }

    #[test]
    fn search_finds_task_by_title_keyword() {
        let repo = TaskRepo::new(test_pool());
        repo.create(&sample_task("TASK-20260801-003")).unwrap();

        let results = repo.search("login", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].task_ref, "TASK-20260801-003");
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let repo = TaskRepo::new(test_pool());
        let task = sample_task("TASK-20260801-004");
        repo.create(&task).unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let updated = repo.update(&task.id, &patch).unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.title, "fix the login bug");
    }

    #[test]
    fn update_missing_task_returns_not_found() {
        let repo = TaskRepo::new(test_pool());
        let err = repo.update("missing-id", &TaskPatch::default()).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn task_ref_format_matches_spec() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(TaskRef::new(date, 5).to_string(), "TASK-20260801-005");
    }
}
