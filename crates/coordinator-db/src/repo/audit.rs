use rusqlite::params;
use tracing::instrument;

use crate::error::Result;
use crate::pool::Pool;
use crate::types::AuditEvent;

/// Append-only audit trail. Never updated or deleted.
pub struct AuditRepo {
    pool: Pool,
}

impl AuditRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, event))]
    pub fn record(&self, event: &AuditEvent) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO audit_logs (entity_type, entity_id, actor, action, before, after, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.entity_type,
                event.entity_id,
                event.actor,
                event.action,
                event.before.as_ref().map(|v| v.to_string()),
                event.after.as_ref().map(|v| v.to_string()),
                event.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn history_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditEvent>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT entity_type, entity_id, actor, action, before, after, timestamp
             FROM audit_logs WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(params![entity_type, entity_id], row_to_event)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEvent> {
    let before: Option<String> = row.get(4)?;
    let after: Option<String> = row.get(5)?;
    Ok(AuditEvent {
        entity_type: row.get(0)?,
        entity_id: row.get(1)?,
        actor: row.get(2)?,
        action: row.get(3)?,
        before: before.and_then(|b| serde_json::from_str(&b).ok()),
        after: after.and_then(|a| serde_json::from_str(&a).ok()),
        timestamp: super::parse_dt(row.get::<_, String>(6)?),
    })
}
