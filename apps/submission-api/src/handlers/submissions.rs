use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use database::repositories::{SubmissionFilter, SubmissionSort};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::dates::{parse_range_end, parse_range_start};
use shared::page::{link_header, PageMeta, PageRequest};
use shared::ApiError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/submissions", post(create_submission).get(list_submissions)).route("/v1/submissions/:id", axum::routing::patch(patch_submission))
}

async fn create_submission(State(state): State<AppState>, auth: AuthUser, Json(document): Json<Value>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let project_id = document
        .get("projectId")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_input("submission requires a 'projectId'"))?
        .to_string();
    if !auth.owns_project(&project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{project_id}'")));
    }

    let submission = state.submissions.create(metadata_core::NewSubmission { project_id, document }).await?;
    Ok((StatusCode::CREATED, Json(json!({ "submissionId": submission.submission_id }))))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "projectId")]
    project_id: Option<String>,
    name: Option<String>,
    published: Option<bool>,
    ingested: Option<bool>,
    date_created_start: Option<String>,
    date_created_end: Option<String>,
    date_modified_start: Option<String>,
    date_modified_end: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_submissions(State(state): State<AppState>, auth: AuthUser, Query(query): Query<ListQuery>) -> Result<(HeaderMap, Json<Value>), ApiError> {
    let project_id = query.project_id.clone().unwrap_or_else(|| auth.project_ids.first().cloned().unwrap_or_default());
    if !auth.owns_project(&project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{project_id}'")));
    }

    let filter = SubmissionFilter {
        project_id: Some(project_id),
        name_substring: query.name.clone(),
        is_published: query.published,
        is_ingested: query.ingested,
        created_start: query.date_created_start.as_deref().map(parse_range_start).transpose()?,
        created_end: query.date_created_end.as_deref().map(parse_range_end).transpose()?,
        modified_start: query.date_modified_start.as_deref().map(parse_range_start).transpose()?,
        modified_end: query.date_modified_end.as_deref().map(parse_range_end).transpose()?,
    };
    let page_request = PageRequest::new(query.page, query.per_page);

    let (items, total) = state.submissions.list(filter, SubmissionSort::CreatedDesc, &page_request).await?;

    let meta = PageMeta::new(&page_request, total);
    let body = json!({
        "page": meta,
        "totalSubmissions": total,
        "submissions": items,
    });

    let mut headers = HeaderMap::new();
    if let Some(link) = link_header("/v1/submissions?", &page_request, meta.total_pages) {
        headers.insert(axum::http::header::LINK, HeaderValue::from_str(&link).map_err(|e| ApiError::Internal(e.to_string()))?);
    }
    Ok((headers, Json(body)))
}

async fn patch_submission(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>, Json(patch): Json<Value>) -> Result<StatusCode, ApiError> {
    authorize_submission(&state, &auth, &id).await?;

    match patch {
        Value::Object(ref map) if map.len() == 1 && map.contains_key("name") => {
            let name = map["name"].as_str().ok_or_else(|| ApiError::bad_input("'name' must be a string"))?;
            state.submissions.update_name(&id, name.to_string()).await?;
        }
        Value::Object(ref map) if map.len() == 1 && map.contains_key("description") => {
            let description = map["description"].as_str().ok_or_else(|| ApiError::bad_input("'description' must be a string"))?;
            state.submissions.update_description(&id, description.to_string()).await?;
        }
        Value::Object(ref map) if map.len() == 1 && map.contains_key("folder") => {
            let folder = map["folder"].as_str().ok_or_else(|| ApiError::bad_input("'folder' must be a string"))?;
            state.submissions.update_folder(&id, folder.to_string()).await?;
        }
        Value::Object(ref map) if map.len() == 1 && map.contains_key("doiInfo") => {
            state.submissions.update_doi_info(&id, map["doiInfo"].clone()).await?;
        }
        Value::Object(ref map) if map.len() == 1 && map.contains_key("rems") => {
            state.submissions.update_rems(&id, map["rems"].clone()).await?;
        }
        other => {
            state.submissions.update_document(&id, other).await?;
        }
    }
    Ok(StatusCode::OK)
}

async fn authorize_submission(state: &AppState, auth: &AuthUser, submission_id: &str) -> Result<(), ApiError> {
    let submission = state.submissions.get(submission_id).await?;
    if !auth.owns_project(&submission.project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{}'", submission.project_id)));
    }
    Ok(())
}

