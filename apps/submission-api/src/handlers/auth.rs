use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::ApiError;

use crate::middleware::auth::{encode_session_token, AuthUser};
use crate::state::AppState;

/// The OIDC handshake itself (redirect to `OIDC_URL`, exchange the
/// authorization code) is out of scope here (SPEC_FULL.md §4.K); this
/// surface takes claims already lifted from that flow and issues the
/// session token our own middleware understands, plus API-key
/// management on top of an established session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/api-keys", get(list_api_keys).post(issue_api_key))
        .route("/v1/auth/api-keys/:key_id", axum::routing::delete(revoke_api_key))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(rename = "externalId")]
    external_id: String,
    name: String,
    #[serde(default)]
    projects: Vec<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    #[serde(rename = "userId")]
    user_id: String,
}

async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    let claims = access::SessionClaims {
        external_id: request.external_id,
        name: request.name,
        project_external_ids: request.projects,
    };
    let resolved = state.sessions.resolve(&claims).await?;
    let token = encode_session_token(&state.config.jwt_secret, &claims, chrono::Duration::hours(12))?;
    Ok(Json(LoginResponse { token, user_id: resolved.user_id }))
}

#[derive(Deserialize)]
struct IssueApiKeyRequest {
    #[serde(rename = "keyId")]
    key_id: String,
}

#[derive(Serialize)]
struct IssuedApiKeyResponse {
    #[serde(rename = "keyId")]
    key_id: String,
    #[serde(rename = "apiKey")]
    api_key: String,
}

async fn issue_api_key(State(state): State<AppState>, auth: AuthUser, Json(request): Json<IssueApiKeyRequest>) -> Result<(StatusCode, Json<IssuedApiKeyResponse>), ApiError> {
    let issued = state.api_keys.issue(&auth.user_id, &request.key_id).await?;
    Ok((StatusCode::CREATED, Json(IssuedApiKeyResponse { key_id: issued.key_id, api_key: issued.raw_key })))
}

#[derive(Serialize)]
struct ApiKeySummary {
    #[serde(rename = "keyId")]
    key_id: String,
    #[serde(rename = "userKeyId")]
    user_key_id: String,
    #[serde(rename = "createdAt")]
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<database::models::ApiKey> for ApiKeySummary {
    fn from(key: database::models::ApiKey) -> Self {
        ApiKeySummary { key_id: key.key_id, user_key_id: key.user_key_id, created_at: key.created_at }
    }
}

async fn list_api_keys(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<ApiKeySummary>>, ApiError> {
    let keys = state.api_keys.list_for_user(&auth.user_id).await?;
    Ok(Json(keys.into_iter().map(ApiKeySummary::from).collect()))
}

async fn revoke_api_key(State(state): State<AppState>, _auth: AuthUser, Path(key_id): Path<String>) -> Result<StatusCode, ApiError> {
    state.api_keys.revoke(&key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
