use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use crate::crypto;
use crate::error::{DbError, Result};
use crate::pool::Pool;
use crate::types::OAuthToken;

/// Stores OAuth tokens ciphertext-at-rest when an encryption key is
/// configured; falls back to plaintext storage with a one-time warning
/// otherwise.
pub struct OAuthTokenRepo {
    pool: Pool,
    key: Option<[u8; 32]>,
}

impl OAuthTokenRepo {
    pub fn new(pool: Pool, key: Option<[u8; 32]>) -> Self {
        if key.is_none() {
            tracing::warn!("oauth token repo running without an encryption key — storing plaintext");
        }
        Self { pool, key }
    }

    #[instrument(skip(self, refresh_token, access_token))]
    pub fn upsert(
        &self,
        email: &str,
        service: &str,
        refresh_token: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let (refresh_stored, access_stored) = match &self.key {
            Some(key) => (crypto::encrypt(key, refresh_token)?, crypto::encrypt(key, access_token)?),
            None => (refresh_token.to_string(), access_token.to_string()),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO oauth_tokens (email, service, refresh_token, access_token, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(email, service) DO UPDATE SET
                refresh_token=excluded.refresh_token,
                access_token=excluded.access_token,
                expires_at=excluded.expires_at",
            params![email, service, refresh_stored, access_stored, expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get(&self, email: &str, service: &str) -> Result<Option<OAuthToken>> {
        let conn = self.pool.get()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT refresh_token, access_token, expires_at FROM oauth_tokens
                 WHERE email = ?1 AND service = ?2",
                params![email, service],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .map_err(DbError::from)?;

        let Some((refresh_ct, access_ct, expires_at)) = row else {
            return Ok(None);
        };

        let (refresh_token, access_token) = match &self.key {
            Some(key) => (crypto::decrypt(key, &refresh_ct)?, crypto::decrypt(key, &access_ct)?),
            None => (refresh_ct, access_ct),
        };

        Ok(Some(OAuthToken {
            email: email.to_string(),
            service: service.to_string(),
            refresh_token,
            access_token,
            expires_at: super::parse_dt(expires_at),
        }))
    }
}
