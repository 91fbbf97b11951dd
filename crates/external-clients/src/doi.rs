use serde::Deserialize;
use serde_json::{json, Value};
use shared::ApiError;

use crate::client::RetryingClient;

/// Draft-registration DOI provider (DataCite-shaped). Accepts the
/// JSON-API envelope `{data: {type: "dois", attributes: {...}}}`.
#[derive(Clone)]
pub struct DoiClient {
    http: RetryingClient,
    prefix: String,
}

pub struct CreatedDraft {
    pub doi: String,
    pub landing_url: String,
}

#[derive(Deserialize)]
struct JsonApiEnvelope<T> {
    data: JsonApiResource<T>,
}

#[derive(Deserialize)]
struct JsonApiResource<T> {
    attributes: T,
}

#[derive(Deserialize)]
struct DoiAttributes {
    doi: String,
    #[serde(default)]
    url: Option<String>,
}

impl DoiClient {
    pub fn new(http: RetryingClient, prefix: impl Into<String>) -> Self {
        DoiClient { http, prefix: prefix.into() }
    }

    pub async fn create_draft(&self) -> Result<CreatedDraft, ApiError> {
        let body = json!({
            "data": {
                "type": "dois",
                "attributes": {
                    "prefix": self.prefix,
                    "event": "draft",
                }
            }
        });
        let response = self.http.post("/dois", &body).await?;
        let envelope: JsonApiEnvelope<DoiAttributes> = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed DOI response: {e}")))?;
        Ok(CreatedDraft {
            landing_url: envelope.data.attributes.url.clone().unwrap_or_default(),
            doi: envelope.data.attributes.doi,
        })
    }

    pub async fn update(&self, doi: &str, payload: Value) -> Result<(), ApiError> {
        let body = json!({
            "data": {
                "type": "dois",
                "attributes": payload,
            }
        });
        self.http.put(&format!("/dois/{doi}"), &body).await?;
        Ok(())
    }

    pub async fn delete_draft(&self, doi: &str) -> Result<(), ApiError> {
        self.http.delete(&format!("/dois/{doi}")).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        self.http.get("/heartbeat").await.is_ok()
    }
}
