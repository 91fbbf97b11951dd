use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use shared::ApiError;
use workflow::WorkflowDocument;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workflows", get(list_workflows))
        .route("/v1/workflows/:name", get(get_workflow))
}

async fn list_workflows(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    let descriptions = state.workflows.list().map(|w| (w.name().to_string(), w.description().to_string())).collect();
    Json(descriptions)
}

async fn get_workflow(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<WorkflowDocument>, ApiError> {
    let workflow = state.workflows.get(&name).map_err(|_| ApiError::NotFound(format!("unknown workflow '{name}'")))?;
    Ok(Json(workflow.document().clone()))
}
