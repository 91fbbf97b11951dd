use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use shared::ApiError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/schemas", get(list_schemas))
        .route("/v1/schemas/:schema", get(get_schema))
}

async fn list_schemas(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.schemas.known_json_types().map(str::to_string).collect())
}

async fn get_schema(State(state): State<AppState>, Path(schema): Path<String>) -> Result<Json<Value>, ApiError> {
    let json_schema = state.schemas.get_json_schema(&schema).map_err(|_| ApiError::NotFound(format!("unknown schema '{schema}'")))?;
    Ok(Json(json_schema.clone()))
}
