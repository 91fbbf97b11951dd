use serde::Deserialize;
use serde_json::{json, Value};
use shared::ApiError;

use crate::client::RetryingClient;

/// Access-management (REMS-like) service: resource/workflow/license
/// vocabulary for controlled-access datasets.
#[derive(Clone)]
pub struct AccessManagementClient {
    http: RetryingClient,
    user_id: String,
}

#[derive(Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub title: String,
}

#[derive(Deserialize)]
pub struct License {
    pub id: u64,
    pub title: String,
}

#[derive(Deserialize)]
struct ResourceResponse {
    id: u64,
}

#[derive(Deserialize)]
struct CatalogueItemResponse {
    id: u64,
}

impl AccessManagementClient {
    pub fn new(http: RetryingClient, user_id: impl Into<String>) -> Self {
        AccessManagementClient { http, user_id: user_id.into() }
    }

    pub async fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError> {
        let response = self.http.get("/api/workflows").await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed workflow list: {e}")))
    }

    pub async fn list_licenses(&self) -> Result<Vec<License>, ApiError> {
        let response = self.http.get("/api/licenses").await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed license list: {e}")))
    }

    /// Rejects a workflow/license pairing that the access-management
    /// service doesn't recognize, before any resource is created.
    pub async fn validate_workflow_licenses(
        &self,
        organization: &str,
        workflow_id: u64,
        license_ids: &[u64],
    ) -> Result<(), ApiError> {
        let workflows = self.list_workflows().await?;
        if !workflows.iter().any(|w| w.id == workflow_id) {
            return Err(ApiError::bad_input(format!("workflow {workflow_id} is not known to {organization}")));
        }
        let licenses = self.list_licenses().await?;
        let known: std::collections::HashSet<u64> = licenses.iter().map(|l| l.id).collect();
        if let Some(missing) = license_ids.iter().find(|id| !known.contains(id)) {
            return Err(ApiError::bad_input(format!("license {missing} is not known to {organization}")));
        }
        Ok(())
    }

    pub async fn create_resource(&self, doi: &str, organization: &str, license_ids: &[u64]) -> Result<u64, ApiError> {
        let body = json!({
            "resid": doi,
            "organization": { "organization/id": organization },
            "licenses": license_ids,
            "userid": self.user_id,
        });
        let response = self.http.post("/api/resources/create", &body).await?;
        let parsed: ResourceResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed resource response: {e}")))?;
        Ok(parsed.id)
    }

    pub async fn create_catalogue_item(
        &self,
        resource_id: u64,
        workflow_id: u64,
        organization: &str,
        localizations: Value,
    ) -> Result<u64, ApiError> {
        let body = json!({
            "resid": resource_id,
            "wfid": workflow_id,
            "organization": { "organization/id": organization },
            "localizations": localizations,
            "userid": self.user_id,
        });
        let response = self.http.post("/api/catalogue-items/create", &body).await?;
        let parsed: CatalogueItemResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed catalogue-item response: {e}")))?;
        Ok(parsed.id)
    }

    pub async fn health_check(&self) -> bool {
        self.http.get("/api/health").await.is_ok()
    }
}
