use rusqlite::params;
use tracing::instrument;

use crate::error::Result;
use crate::pool::Pool;
use crate::types::AttendanceRecord;

pub struct AttendanceRepo {
    pool: Pool,
}

impl AttendanceRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, record))]
    pub fn record(&self, record: &AttendanceRecord) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO attendance_records (user_name, date, status, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_name, date) DO UPDATE SET status=excluded.status, note=excluded.note",
            params![
                record.user_name,
                record.date.to_string(),
                record.status,
                record.note,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn for_date(&self, date: chrono::NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT user_name, date, status, note FROM attendance_records
             WHERE date = ?1 ORDER BY user_name",
        )?;
        let rows = stmt.query_map(params![date.to_string()], row_to_record)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let date_str: String = row.get(1)?;
    Ok(AttendanceRecord {
        user_name: row.get(0)?,
        date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        status: row.get(2)?,
        note: row.get(3)?,
    })
}
