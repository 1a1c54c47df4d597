use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::pool::Pool;
use crate::types::{ConversationRecord, MessageRecord};

pub struct ConversationRepo {
    pool: Pool,
}

impl ConversationRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub fn get_or_create(&self, transport: &str, transport_user: &str) -> Result<ConversationRecord> {
        if let Some(existing) = self.get(transport, transport_user)? {
            return Ok(existing);
        }
        let conn = self.pool.get()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO conversations (id, transport, transport_user, user_ref, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, 'idle', ?4, ?4)",
            params![id, transport, transport_user, now],
        )
        .map_err(DbError::from_write)?;
        self.get(transport, transport_user)?
            .ok_or_else(|| DbError::PersistenceFailed("conversation vanished after insert".into()))
    }

    #[instrument(skip(self))]
    pub fn get(&self, transport: &str, transport_user: &str) -> Result<Option<ConversationRecord>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, transport, transport_user, user_ref, state, created_at, updated_at
             FROM conversations WHERE transport = ?1 AND transport_user = ?2",
            params![transport, transport_user],
            row_to_conversation,
        )
        .optional()
        .map_err(DbError::from)
    }

    #[instrument(skip(self))]
    pub fn set_state(&self, id: &str, state: &str) -> Result<()> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE conversations SET state = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, state, now],
        )?;
        if n == 0 {
            return Err(DbError::NotFound(format!("conversation {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn append_message(&self, conversation_id: &str, role: &str, content: &str) -> Result<MessageRecord> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role, content, now],
        )
        .map_err(DbError::from_write)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, conversation_id, role, content, created_at FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )
        .map_err(DbError::from)
    }

    #[instrument(skip(self))]
    pub fn recent_messages(&self, conversation_id: &str, limit: i64) -> Result<Vec<MessageRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![conversation_id, limit], row_to_message)?;
        let mut msgs: Vec<_> = rows.filter_map(|r| r.ok()).collect();
        msgs.reverse();
        Ok(msgs)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: row.get(0)?,
        transport: row.get(1)?,
        transport_user: row.get(2)?,
        user_ref: row.get(3)?,
        state: row.get(4)?,
        created_at: crate::repo::parse_dt(row.get::<_, String>(5)?),
        updated_at: crate::repo::parse_dt(row.get::<_, String>(6)?),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        created_at: crate::repo::parse_dt(row.get::<_, String>(4)?),
    })
}
