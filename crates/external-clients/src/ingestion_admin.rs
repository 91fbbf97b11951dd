use serde_json::json;
use shared::ApiError;

use crate::client::RetryingClient;

/// File-ingestion admin service. Ingest status itself is advanced by
/// out-of-band callbacks the worker polls for (`FileService` in
/// `metadata-core`); this client only triggers the ingest and carries
/// accession assignment.
#[derive(Clone)]
pub struct IngestionAdminClient {
    http: RetryingClient,
}

impl IngestionAdminClient {
    pub fn new(http: RetryingClient) -> Self {
        IngestionAdminClient { http }
    }

    pub async fn ingest_file(&self, user: &str, path: &str) -> Result<(), ApiError> {
        self.http
            .post("/ingest", &json!({ "user": user, "filepath": path }))
            .await?;
        Ok(())
    }

    pub async fn list_user_files(&self, user: &str) -> Result<Vec<String>, ApiError> {
        let response = self.http.get(&format!("/files/{user}")).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed file list: {e}")))
    }

    pub async fn assign_accession(&self, user: &str, path: &str, accession_id: &str) -> Result<(), ApiError> {
        self.http
            .post("/accession", &json!({ "user": user, "filepath": path, "accessionId": accession_id }))
            .await?;
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        self.http.get("/health").await.is_ok()
    }
}
