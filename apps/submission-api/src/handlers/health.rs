use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Probes every external service's health check. Never returns a 5xx --
/// a degraded dependency is reported in the body, not the status line.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let services = json!({
        "datacite": state.doi.health_check().await,
        "pid": state.pid.health_check().await,
        "discovery": state.catalog.health_check().await,
        "rems": state.access.health_check().await,
        "ingestion": state.ingestion.health_check().await,
    });
    let all_healthy = services.as_object().map(|o| o.values().all(|v| v == true)).unwrap_or(false);

    Json(json!({
        "status": if all_healthy { "ok" } else { "degraded" },
        "services": services,
    }))
}
