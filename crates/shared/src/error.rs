use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

/// The error taxonomy surfaced to HTTP clients.
///
/// Every variant maps to exactly one status code; `detail` carries a
/// machine-readable reason and, for validation failures, the offending
/// JSON instance path or XML line number.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{reason}")]
    BadInput {
        reason: String,
        instance: Option<String>,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedMedia(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    ExternalClientError(String),
    #[error("{0}")]
    ExternalServerError(String),
    #[error("{0}")]
    ExternalTimeout(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_input(reason: impl Into<String>) -> Self {
        ApiError::BadInput {
            reason: reason.into(),
            instance: None,
        }
    }

    pub fn bad_input_at(reason: impl Into<String>, instance: impl Into<String>) -> Self {
        ApiError::BadInput {
            reason: reason.into(),
            instance: Some(instance.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Both external 4xx and 5xx surface to our callers as 502: the
            // upstream's status is not our caller's concern, only that the
            // registration step failed.
            ApiError::ExternalClientError(_) | ApiError::ExternalServerError(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::ExternalTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (reason, instance) = match &self {
            ApiError::BadInput { reason, instance } => (reason.clone(), instance.clone()),
            other => (other.to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(%status, %reason, "request failed");
        } else {
            tracing::debug!(%status, %reason, "request rejected");
        }

        (status, Json(ErrorBody { detail: ErrorDetail { reason, instance } })).into_response()
    }
}
