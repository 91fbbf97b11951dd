use axum::extract::{Path, State};
use axum::routing::patch;
use axum::{Json, Router};
use serde_json::json;
use shared::ApiError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/publish/:id", patch(publish_submission))
}

async fn publish_submission(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let submission = state.submissions.get(&id).await?;
    if !auth.owns_project(&submission.project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{}'", submission.project_id)));
    }

    state.publish.publish(&id).await?;
    Ok(Json(json!({ "submissionId": id })))
}
