use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use database::models::MetadataObject;
use database::repositories::ObjectFilter;
use metadata_core::{ObjectDocument, ObjectFormat};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::ApiError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/objects", get(list_objects))
        .route("/v1/objects/:schema", post(add_object))
        .route("/v1/objects/:schema/:id", get(read_object).put(replace_object).patch(update_object).delete(delete_object))
}

#[derive(Deserialize)]
struct ListObjectsQuery {
    #[serde(rename = "submissionId")]
    submission_id: String,
    object_type: Option<String>,
    object_id: Option<String>,
    name: Option<String>,
}

/// `object_type` is a comma list; order is preserved into `ObjectFilter`
/// since the repository uses it as the type sort key when more than one
/// type is requested.
async fn list_objects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Json<Vec<MetadataObject>>, ApiError> {
    authorize_submission(&state, &auth, &query.submission_id).await?;

    let object_types = query
        .object_type
        .as_deref()
        .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let filter = ObjectFilter {
        submission_id: query.submission_id,
        object_types,
        object_id: query.object_id,
        name: query.name,
    };
    let objects = state.objects.list(filter).await?;
    Ok(Json(objects))
}

#[derive(Deserialize)]
struct AddObjectQuery {
    submission: String,
}

/// A JSON body is added as a single object; `multipart/form-data` carries
/// an XML payload, one field per schema type, named by it. Nested
/// multipart (`multipart/mixed`) and mixed CSV+XML parts are rejected.
async fn add_object(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schema): Path<String>,
    Query(query): Query<AddObjectQuery>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    authorize_submission(&state, &auth, &query.submission).await?;

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/mixed") {
        return Err(ApiError::UnsupportedMedia("nested multipart is not supported".to_string()));
    }

    let (payload, format) = if content_type.starts_with("multipart/form-data") {
        extract_multipart_payload(&state, headers, body).await?
    } else {
        (String::from_utf8(body.to_vec()).map_err(|e| ApiError::bad_input(format!("invalid UTF-8 body: {e}")))?, ObjectFormat::Json)
    };

    let added = state.objects.add_object(&query.submission, &schema, &payload, format).await?;
    let first = added.objects.first().ok_or_else(|| ApiError::Internal("add_object returned no objects".to_string()))?;
    Ok((StatusCode::CREATED, Json(json!({ "accessionId": first.object_id }))))
}

/// Multipart decoding lives here rather than in `metadata_core::ObjectService`,
/// since request framing is an HTTP concern; the service only ever sees a
/// single payload string plus its format.
async fn extract_multipart_payload(
    _state: &AppState,
    _headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<(String, ObjectFormat), ApiError> {
    use axum::body::Body;
    use axum::extract::FromRequest;

    let request = axum::http::Request::builder()
        .header(axum::http::header::CONTENT_TYPE, _headers.get(axum::http::header::CONTENT_TYPE).cloned().unwrap_or_default())
        .body(Body::from(body))
        .map_err(|e| ApiError::bad_input(format!("malformed multipart request: {e}")))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_input(format!("malformed multipart body: {e}")))?;

    let mut xml_part: Option<String> = None;
    let mut saw_non_xml_part = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::bad_input(format!("malformed multipart field: {e}")))? {
        let field_content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_input(format!("malformed multipart field body: {e}")))?;

        if field_content_type.starts_with("text/xml") || field_content_type.starts_with("application/xml") {
            if xml_part.is_some() {
                return Err(ApiError::bad_input("only one XML part is supported per request".to_string()));
            }
            xml_part = Some(String::from_utf8(bytes.to_vec()).map_err(|e| ApiError::bad_input(format!("invalid UTF-8 in XML part: {e}")))?);
        } else {
            saw_non_xml_part = true;
        }
    }

    if saw_non_xml_part {
        return Err(ApiError::UnsupportedMedia("mixed CSV and XML parts in one request are not supported".to_string()));
    }

    let xml = xml_part.ok_or_else(|| ApiError::bad_input("multipart request carries no XML part".to_string()))?;
    Ok((xml, ObjectFormat::Xml))
}

#[derive(Deserialize)]
struct FormatQuery {
    format: Option<String>,
}

async fn read_object(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((_schema, id)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let format = parse_format(query.format.as_deref())?;
    match state.objects.read_object(&id, format).await? {
        ObjectDocument::Json(document) => Ok(Json(document).into_response()),
        ObjectDocument::Xml(xml) => Ok(([(axum::http::header::CONTENT_TYPE, "text/xml")], xml).into_response()),
    }
}

async fn replace_object(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((_schema, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state.objects.replace_object(&id, payload).await?;
    Ok(Json(json!({ "accessionId": id })))
}

async fn update_object(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((_schema, id)): Path<(String, String)>,
    Json(partial): Json<Value>,
) -> Result<StatusCode, ApiError> {
    state.objects.update_object(&id, partial, ObjectFormat::Json).await?;
    Ok(StatusCode::OK)
}

async fn delete_object(State(state): State<AppState>, _auth: AuthUser, Path((_schema, id)): Path<(String, String)>) -> Result<StatusCode, ApiError> {
    state.objects.delete_object(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_format(raw: Option<&str>) -> Result<ObjectFormat, ApiError> {
    match raw {
        None | Some("json") => Ok(ObjectFormat::Json),
        Some("xml") => Ok(ObjectFormat::Xml),
        Some(other) => Err(ApiError::bad_input(format!("unknown format '{other}'"))),
    }
}

async fn authorize_submission(state: &AppState, auth: &AuthUser, submission_id: &str) -> Result<(), ApiError> {
    let submission = state.submissions.get(submission_id).await?;
    if !auth.owns_project(&submission.project_id) {
        return Err(ApiError::Forbidden(format!("not a member of project '{}'", submission.project_id)));
    }
    Ok(())
}
