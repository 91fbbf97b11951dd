use serde::Deserialize;
use serde_json::Value;
use shared::ApiError;

use crate::client::RetryingClient;

/// Persistent-identifier service (CSC PID). Unlike the DOI service it has
/// no draft-delete operation: a minted id lives forever once created.
#[derive(Clone)]
pub struct PidClient {
    http: RetryingClient,
    api_key: String,
}

#[derive(Deserialize)]
struct CreateDraftResponse {
    doi: String,
}

impl PidClient {
    pub fn new(http: RetryingClient, api_key: impl Into<String>) -> Self {
        PidClient { http, api_key: api_key.into() }
    }

    pub async fn create_draft_doi(&self) -> Result<String, ApiError> {
        let response = self
            .http
            .post("/v1/pid/doi", &serde_json::json!({ "apikey": self.api_key }))
            .await?;
        let body: CreateDraftResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed PID response: {e}")))?;
        Ok(body.doi)
    }

    pub async fn publish(&self, payload: Value) -> Result<(), ApiError> {
        self.http.post("/v1/pid/publish", &payload).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        self.http.get("/v1/pid/health").await.is_ok()
    }
}
