//! `POST /admin/:action` — operator-only maintenance routes.
//!
//! Every action requires the `X-Admin-Secret` header to match
//! `gateway.admin_secret` in constant time, mirroring the webhook
//! signature check in `webhooks.rs`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;

use coordinator_db::types::{TeamMember, TeamRole};
use coordinator_db::{DbError, PooledConn};

use crate::app::AppState;
use crate::error::GatewayError;

const MAX_FREE_TEXT_LEN: usize = 4096;

pub async fn admin_handler(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<Value>, GatewayError> {
    verify_admin_secret(&headers, &state.config.gateway.admin_secret)?;

    if body.len() > MAX_FREE_TEXT_LEN {
        return Err(GatewayError::BadRequest("request body too large".into()));
    }
    reject_html(&body)?;

    match action.as_str() {
        "run-migration" => run_migration(&state),
        "seed-test-team" => seed_test_team(&state),
        "clear-conversations" => clear_conversations(&state),
        "backup-oauth-tokens" => backup_oauth_tokens(&state),
        "verify-oauth-encryption" => verify_oauth_encryption(&state),
        "encrypt-oauth-tokens" => encrypt_oauth_tokens(&state),
        other => Err(GatewayError::NotFound(format!("unknown admin action '{other}'"))),
    }
}

fn pooled(state: &AppState) -> Result<PooledConn, GatewayError> {
    Ok(state.pool.get().map_err(DbError::from)?)
}

fn verify_admin_secret(headers: &HeaderMap, expected: &str) -> Result<(), GatewayError> {
    let provided = headers
        .get("x-admin-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Unauthorized("missing X-Admin-Secret header".into()))?;

    if provided.len() != expected.len()
        || !bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
    {
        return Err(GatewayError::Unauthorized("admin secret mismatch".into()));
    }
    Ok(())
}

fn reject_html(body: &[u8]) -> Result<(), GatewayError> {
    let text = String::from_utf8_lossy(body);
    if text.contains("<script") || text.contains("</script") {
        return Err(GatewayError::BadRequest(
            "request body must not contain script tags".into(),
        ));
    }
    Ok(())
}

fn run_migration(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let conn = pooled(state)?;
    coordinator_db::schema::init_schema(&conn).map_err(DbError::from)?;
    Ok(Json(json!({"ok": true, "action": "run-migration"})))
}

fn seed_test_team(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let defaults = [
        ("Test Dev", TeamRole::Developer),
        ("Test Admin", TeamRole::Admin),
        ("Test Marketer", TeamRole::Marketing),
        ("Test Designer", TeamRole::Design),
    ];

    for (name, role) in &defaults {
        state.team_repo.upsert(&TeamMember {
            name: name.to_string(),
            role: role.clone(),
            transport_id: None,
            secondary_channel_id: None,
            email: None,
            timezone: "UTC".to_string(),
            work_start: None,
            active: true,
            skills: Vec::new(),
        })?;
    }

    Ok(Json(json!({"ok": true, "action": "seed-test-team", "seeded": defaults.len()})))
}

fn clear_conversations(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let conn = pooled(state)?;
    let deleted = conn
        .execute("DELETE FROM conversations", [])
        .map_err(DbError::from)?;
    let deleted_messages = conn
        .execute("DELETE FROM messages", [])
        .map_err(DbError::from)?;
    Ok(Json(json!({
        "ok": true,
        "action": "clear-conversations",
        "conversations_deleted": deleted,
        "messages_deleted": deleted_messages,
    })))
}

fn backup_oauth_tokens(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let conn = pooled(state)?;
    let mut stmt = conn
        .prepare("SELECT email, service, refresh_token, access_token, expires_at FROM oauth_tokens")
        .map_err(DbError::from)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "email": r.get::<_, String>(0)?,
                "service": r.get::<_, String>(1)?,
                "refresh_token": r.get::<_, String>(2)?,
                "access_token": r.get::<_, String>(3)?,
                "expires_at": r.get::<_, String>(4)?,
            }))
        })
        .map_err(DbError::from)?;
    let tokens: Vec<Value> = rows.filter_map(|r| r.ok()).collect();
    Ok(Json(json!({"ok": true, "action": "backup-oauth-tokens", "tokens": tokens})))
}

fn verify_oauth_encryption(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let conn = pooled(state)?;
    let mut stmt = conn
        .prepare("SELECT refresh_token, access_token FROM oauth_tokens")
        .map_err(DbError::from)?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
        .map_err(DbError::from)?;

    let mut total = 0usize;
    let mut plaintext = 0usize;
    for row in rows {
        let (refresh, access) = row.map_err(DbError::from)?;
        total += 1;
        if !coordinator_db::crypto::is_ciphertext(&refresh) || !coordinator_db::crypto::is_ciphertext(&access) {
            plaintext += 1;
        }
    }

    Ok(Json(json!({
        "ok": true,
        "action": "verify-oauth-encryption",
        "encryption_enabled": state.config.encryption.enabled(),
        "total_tokens": total,
        "plaintext_tokens": plaintext,
    })))
}

fn encrypt_oauth_tokens(state: &AppState) -> Result<Json<Value>, GatewayError> {
    let Some(key) = state
        .config
        .encryption
        .key_bytes()
        .map_err(|_| GatewayError::BadRequest("encryption.key_hex is invalid".into()))?
    else {
        return Err(GatewayError::BadRequest(
            "encryption.key_hex is not configured".into(),
        ));
    };

    let conn = pooled(state)?;
    let rows: Vec<(String, String, String, String)> = {
        let mut stmt = conn
            .prepare("SELECT email, service, refresh_token, access_token FROM oauth_tokens")
            .map_err(DbError::from)?;
        let result = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .map_err(DbError::from)?
            .filter_map(|r| r.ok())
            .collect();
        result
    };

    let mut rewritten = 0usize;
    for (email, service, refresh, access) in rows {
        if coordinator_db::crypto::is_ciphertext(&refresh) && coordinator_db::crypto::is_ciphertext(&access) {
            continue;
        }
        let refresh_ct = coordinator_db::crypto::encrypt(&key, &refresh)?;
        let access_ct = coordinator_db::crypto::encrypt(&key, &access)?;
        conn.execute(
            "UPDATE oauth_tokens SET refresh_token = ?1, access_token = ?2 WHERE email = ?3 AND service = ?4",
            rusqlite::params![refresh_ct, access_ct, email, service],
        )
        .map_err(DbError::from)?;
        rewritten += 1;
    }

    Ok(Json(json!({"ok": true, "action": "encrypt-oauth-tokens", "rewritten": rewritten})))
}
