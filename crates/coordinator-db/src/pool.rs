use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;
use crate::schema;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Bounded steady-state pool (~10 connections) with burst overflow (~20),
/// liveness probing, and hourly recycling.
pub fn build_pool(db_url: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(db_url).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = r2d2::Pool::builder()
        .min_idle(Some(10))
        .max_size(20)
        .max_lifetime(Some(Duration::from_secs(60 * 60)))
        .connection_timeout(Duration::from_secs(10))
        .test_on_check_out(true)
        .build(manager)?;

    {
        let conn = pool.get()?;
        schema::init_schema(&conn)?;
    }

    info!(db_url, "database pool initialized");
    Ok(pool)
}
