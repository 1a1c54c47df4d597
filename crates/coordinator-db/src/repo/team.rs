use std::str::FromStr;

use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use crate::error::{DbError, Result};
use crate::pool::Pool;
use crate::types::{TeamMember, TeamRole};

/// Repository backing the boss-managed team roster. Members are
/// referenced by `Task.assignee_name` by value, not by foreign key.
pub struct TeamRepo {
    pool: Pool,
}

impl TeamRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, member))]
    pub fn upsert(&self, member: &TeamMember) -> Result<()> {
        let conn = self.pool.get()?;
        let skills_json = serde_json::to_string(&member.skills)?;
        conn.execute(
            "INSERT INTO team_members
                (name, role, transport_id, secondary_channel_id, email, timezone, work_start, active, skills)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(name) DO UPDATE SET
                role=excluded.role, transport_id=excluded.transport_id,
                secondary_channel_id=excluded.secondary_channel_id, email=excluded.email,
                timezone=excluded.timezone, work_start=excluded.work_start,
                active=excluded.active, skills=excluded.skills",
            params![
                member.name,
                member.role.to_string(),
                member.transport_id,
                member.secondary_channel_id,
                member.email,
                member.timezone,
                member.work_start,
                member.active as i64,
                skills_json,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_by_name(&self, name: &str) -> Result<Option<TeamMember>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT name, role, transport_id, secondary_channel_id, email, timezone, work_start, active, skills
             FROM team_members WHERE name = ?1 COLLATE NOCASE",
            params![name],
            row_to_member,
        )
        .optional()
        .map_err(DbError::from)
    }

    #[instrument(skip(self))]
    pub fn get_by_transport_id(&self, transport_id: &str) -> Result<Option<TeamMember>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT name, role, transport_id, secondary_channel_id, email, timezone, work_start, active, skills
             FROM team_members WHERE transport_id = ?1",
            params![transport_id],
            row_to_member,
        )
        .optional()
        .map_err(DbError::from)
    }

    #[instrument(skip(self))]
    pub fn list_active(&self) -> Result<Vec<TeamMember>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT name, role, transport_id, secondary_channel_id, email, timezone, work_start, active, skills
             FROM team_members WHERE active = 1 ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_member)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<TeamMember> {
    let role_str: String = row.get(1)?;
    let skills_json: String = row.get(8)?;
    Ok(TeamMember {
        name: row.get(0)?,
        role: TeamRole::from_str(&role_str).unwrap_or_default(),
        transport_id: row.get(2)?,
        secondary_channel_id: row.get(3)?,
        email: row.get(4)?,
        timezone: row.get(5)?,
        work_start: row.get(6)?,
        active: row.get::<_, i64>(7)? != 0,
        skills: serde_json::from_str(&skills_json).unwrap_or_default(),
    })
}
