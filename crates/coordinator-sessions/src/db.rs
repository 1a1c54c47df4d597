use tracing::{info, warn};

/// Thin wrapper around an optional Redis-compatible connection.
///
/// Absence of `cache_url` degrades the store to in-memory only — connecting is attempted once at startup and never blocks
/// process start on failure.
pub struct CacheBackend {
    conn: Option<redis::aio::ConnectionManager>,
}

impl CacheBackend {
    /// Attempt to connect to `cache_url`. Logs the outcome either way and
    /// never returns an error — a failed connection just means every
    /// subsequent operation falls through to the local map.
    pub async fn connect(cache_url: Option<&str>) -> Self {
        let Some(url) = cache_url else {
            info!("no cache_url configured, session store running in-memory only");
            return Self { conn: None };
        };

        match redis::Client::open(url) {
            Ok(client) => match client.get_connection_manager().await {
                Ok(conn) => {
                    info!("connected to session cache backend");
                    Self { conn: Some(conn) }
                }
                Err(e) => {
                    warn!(error = %e, "failed to connect to session cache backend, falling back to in-memory");
                    Self { conn: None }
                }
            },
            Err(e) => {
                warn!(error = %e, "invalid cache_url, falling back to in-memory");
                Self { conn: None }
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone()?;
        redis::cmd("GET").arg(key).query_async(&mut conn).await.ok()
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<()>(&mut conn)
            .await
            .is_ok()
    }

    pub async fn del(&self, key: &str) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        redis::cmd("DEL").arg(key).query_async::<()>(&mut conn).await.is_ok()
    }
}
