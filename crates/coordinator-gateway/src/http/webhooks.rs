//! Webhook ingress — `POST /webhook/:transport`.
//!
//! Verifies the transport's HMAC signature, de-duplicates by
//! `transport_update_id`, and hands the message off to [`crate::dispatch`]
//! on a bounded background task so the webhook call itself returns fast.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use coordinator_core::config::OUTBOX_DEFAULT_MAX_ATTEMPTS;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct InboundUpdate {
    transport_update_id: String,
    transport_user: String,
    text: String,
}

/// POST /webhook/:transport
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(transport): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_signature(&headers, &body, &state.config.transport.webhook_secret).map_err(|e| {
        warn!(%transport, error = %e, "webhook signature rejected");
        (StatusCode::UNAUTHORIZED, Json(json!({"error": e})))
    })?;

    let update: InboundUpdate = serde_json::from_slice(&body).map_err(|e| {
        warn!(%transport, error = %e, "invalid webhook body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid JSON body"})),
        )
    })?;

    let first_seen = state
        .processed_update_repo
        .mark_seen(&update.transport_update_id)
        .map_err(|e| {
            warn!(%transport, error = %e, "dedup ledger lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
        })?;

    if !first_seen {
        info!(%transport, update_id = %update.transport_update_id, "duplicate webhook update dropped");
        return Ok(Json(json!({"ok": true, "duplicate": true})));
    }

    let Ok(permit) = state.dialog_semaphore.clone().try_acquire_owned() else {
        warn!(%transport, "dialog concurrency cap reached, shedding webhook update");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "at capacity, retry shortly"})),
        ));
    };

    let state = state.clone();
    tokio::spawn(async move {
        let _permit = permit;
        if let Err(e) = process_update(&state, &transport, &update).await {
            warn!(%transport, error = %e, "failed processing webhook update");
        }
    });

    Ok(Json(json!({"ok": true})))
}

async fn process_update(
    state: &AppState,
    transport: &str,
    update: &InboundUpdate,
) -> Result<(), crate::error::GatewayError> {
    let replies =
        crate::dispatch::route_message(state, transport, &update.transport_user, &update.text)
            .await?;

    for reply in replies {
        state.outbox_repo.enqueue(
            "transport",
            &json!({
                "op": "send_message",
                "recipient": update.transport_user,
                "text": reply,
            }),
            &format!("reply:{}:{}", update.transport_update_id, transport),
            OUTBOX_DEFAULT_MAX_ATTEMPTS,
        )?;
    }

    Ok(())
}

fn verify_signature(headers: &HeaderMap, body: &Bytes, secret: &str) -> Result<(), String> {
    let sig_header = headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Webhook-Signature header".to_string())?;

    let sig_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);
    let provided = hex::decode(sig_hex).map_err(|_| "signature is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);
    let expected: Vec<u8> = mac.finalize().into_bytes().to_vec();

    if expected.len() != provided.len() {
        return Err("signature mismatch".to_string());
    }
    if expected.as_slice().ct_eq(provided.as_slice()).into() {
        Ok(())
    } else {
        Err("signature mismatch".to_string())
    }
}
