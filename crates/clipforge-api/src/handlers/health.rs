//! Health endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe: verifies the queue connection.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let queue_ok = state
        .queue
        .len(clipforge_models::JobKind::Analyze)
        .await
        .is_ok();

    Json(json!({
        "status": if queue_ok { "ready" } else { "degraded" },
        "queue": queue_ok,
    }))
}
