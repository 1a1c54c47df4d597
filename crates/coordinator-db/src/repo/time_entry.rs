use chrono::Utc;
use rusqlite::params;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::pool::Pool;
use crate::types::{TimeEntry, TimesheetEntry};

pub struct TimeEntryRepo {
    pool: Pool,
}

impl TimeEntryRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub fn clock_in(&self, user_id: &str, task_id: &str) -> Result<String> {
        let conn = self.pool.get()?;
        let id = Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO time_entries (id, user_id, task_id, started_at, ended_at, minutes)
             VALUES (?1, ?2, ?3, ?4, NULL, NULL)",
            params![id, user_id, task_id, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn clock_out(&self, entry_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        let started: String = conn.query_row(
            "SELECT started_at FROM time_entries WHERE id = ?1",
            params![entry_id],
            |r| r.get(0),
        )?;
        let started_at = super::parse_dt(started);
        let now = Utc::now();
        let minutes = (now - started_at).num_minutes();
        conn.execute(
            "UPDATE time_entries SET ended_at = ?2, minutes = ?3 WHERE id = ?1",
            params![entry_id, now.to_rfc3339(), minutes],
        )?;
        Ok(())
    }

    /// `user_timesheet`: time entries eagerly joined with the task they
    /// belong to, in one query.
    #[instrument(skip(self))]
    pub fn user_timesheet(&self, user_id: &str, since: chrono::DateTime<Utc>) -> Result<Vec<TimesheetEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT te.id, te.user_id, te.task_id, te.started_at, te.ended_at, te.minutes,
                    t.title, t.task_ref
             FROM time_entries te
             JOIN tasks t ON t.id = te.task_id
             WHERE te.user_id = ?1 AND te.started_at >= ?2
             ORDER BY te.started_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id, since.to_rfc3339()], |row| {
            let started_at: String = row.get(3)?;
            let ended_at: Option<String> = row.get(4)?;
            Ok(TimesheetEntry {
                entry: TimeEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    task_id: row.get(2)?,
                    started_at: super::parse_dt(started_at),
                    ended_at: ended_at.map(super::parse_dt),
                    minutes: row.get(5)?,
                },
                task_title: row.get(6)?,
                task_ref: row.get(7)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
