use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use database::models::File;
use serde::Deserialize;
use shared::ApiError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/files", get(list_files))
}

#[derive(Deserialize)]
struct ListFilesQuery {
    #[serde(rename = "projectId")]
    project_id: String,
}

async fn list_files(State(state): State<AppState>, auth: AuthUser, Query(query): Query<ListFilesQuery>) -> Result<Json<Vec<File>>, ApiError> {
    if !auth.owns_project(&query.project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{}'", query.project_id)));
    }
    let files = state.files.list_by_project(&query.project_id).await?;
    Ok(Json(files))
}
