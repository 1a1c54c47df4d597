use chrono::{Duration, Utc};
use rusqlite::params;
use tracing::instrument;

use crate::error::Result;
use crate::pool::Pool;

/// Dedup ledger for inbound webhook updates. 24h retention.
pub struct ProcessedUpdateRepo {
    pool: Pool,
}

impl ProcessedUpdateRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Returns `true` if this is the first time this update id has been
    /// seen (i.e. it should be processed); `false` if it's a duplicate.
    #[instrument(skip(self))]
    pub fn mark_seen(&self, transport_update_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO processed_updates (transport_update_id, first_seen_at) VALUES (?1, ?2)",
            params![transport_update_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    #[instrument(skip(self))]
    pub fn purge_older_than(&self, retention: Duration) -> Result<usize> {
        let conn = self.pool.get()?;
        let cutoff = (Utc::now() - retention).to_rfc3339();
        let n = conn.execute("DELETE FROM processed_updates WHERE first_seen_at < ?1", params![cutoff])?;
        Ok(n)
    }
}
