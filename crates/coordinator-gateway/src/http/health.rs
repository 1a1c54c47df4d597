use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe, no database round trip.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "dialog_permits_available": state.dialog_semaphore.available_permits(),
    }))
}

/// GET /health/db — pool stats plus a real round trip.
pub async fn health_db_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let pool_state = state.pool.state();

    let db_ok = match state.pool.get() {
        Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
        Err(_) => false,
    };

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "pool_connections": pool_state.connections,
        "pool_idle_connections": pool_state.idle_connections,
    }))
}
