use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use external_clients::access_management::{License, Workflow};
use shared::ApiError;

use crate::state::AppState;

/// Read-through passthrough of the access-management service's
/// workflow/license vocabulary, for clients building a submission's
/// `rems` block.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/rems/workflows", get(list_workflows)).route("/v1/rems/licenses", get(list_licenses))
}

async fn list_workflows(State(state): State<AppState>) -> Result<Json<Vec<WorkflowDto>>, ApiError> {
    let workflows = state.access.list_workflows().await?;
    Ok(Json(workflows.into_iter().map(WorkflowDto::from).collect()))
}

async fn list_licenses(State(state): State<AppState>) -> Result<Json<Vec<LicenseDto>>, ApiError> {
    let licenses = state.access.list_licenses().await?;
    Ok(Json(licenses.into_iter().map(LicenseDto::from).collect()))
}

#[derive(serde::Serialize)]
struct WorkflowDto {
    id: u64,
    title: String,
}

impl From<Workflow> for WorkflowDto {
    fn from(w: Workflow) -> Self {
        WorkflowDto { id: w.id, title: w.title }
    }
}

#[derive(serde::Serialize)]
struct LicenseDto {
    id: u64,
    title: String,
}

impl From<License> for LicenseDto {
    fn from(l: License) -> Self {
        LicenseDto { id: l.id, title: l.title }
    }
}
