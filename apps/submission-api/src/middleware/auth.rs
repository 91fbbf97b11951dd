use access::SessionClaims;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::ApiError;

use crate::state::AppState;

/// The identity a request authenticated as, surfacing only what spec.md
/// §4.K promises: `(user_id, user_name)` plus the project memberships
/// needed for the `Forbidden` ownership check (§7).
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub user_name: String,
    pub project_ids: Vec<String>,
}

impl AuthUser {
    pub fn owns_project(&self, project_id: &str) -> bool {
        self.project_ids.iter().any(|p| p == project_id)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("missing or invalid credentials".to_string()))
    }
}

/// Claims carried by a session token. Establishing that the bearer of
/// this token really is who it claims (the OIDC handshake) happens
/// upstream of this process; here we only decode and trust the
/// signature, per spec.md's scoping of the OIDC flow itself out of
/// `crates/access`.
#[derive(Debug, Serialize, Deserialize)]
struct SessionTokenClaims {
    sub: String,
    name: String,
    #[serde(default)]
    projects: Vec<String>,
    exp: usize,
}

pub fn encode_session_token(secret: &str, claims: &SessionClaims, ttl: chrono::Duration) -> Result<String, ApiError> {
    let exp = (chrono::Utc::now() + ttl).timestamp() as usize;
    let token_claims = SessionTokenClaims {
        sub: claims.external_id.clone(),
        name: claims.name.clone(),
        projects: claims.project_external_ids.clone(),
        exp,
    };
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &token_claims, &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| ApiError::Internal(format!("failed to sign session token: {e}")))
}

fn decode_session_token(secret: &str, token: &str) -> Option<SessionClaims> {
    let data = jsonwebtoken::decode::<SessionTokenClaims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default()).ok()?;
    Some(SessionClaims {
        external_id: data.claims.sub,
        name: data.claims.name,
        project_external_ids: data.claims.projects,
    })
}

/// Resolves `Authorization: Bearer <token>` into an `AuthUser` and injects
/// it into the request's extensions; absent or invalid credentials simply
/// leave no `AuthUser` behind; the [`AuthUser`] extractor is what turns
/// that into a 401 for handlers that require it.
///
/// A session token is a 3-part JWT (`header.payload.signature`); an API
/// key is `{key_id}.{secret}`, one dot. That format difference is what
/// tells the two apart -- no `env_`-style prefix is needed.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(user) = resolve_auth_user(&state, &req).await {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

async fn resolve_auth_user(state: &AppState, req: &Request) -> Option<AuthUser> {
    let header_value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header_value.strip_prefix("Bearer ")?;

    let user_id = if token.matches('.').count() == 2 {
        let claims = decode_session_token(&state.config.jwt_secret, token)?;
        state.sessions.resolve(&claims).await.ok()?.user_id
    } else {
        state.api_keys.validate(token).await.ok().flatten()?
    };

    let user = state.users.get_by_id(&user_id).await.ok().flatten()?;
    Some(AuthUser { user_id: user.user_id, user_name: user.name, project_ids: user.projects })
}
