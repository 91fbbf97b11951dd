use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub project_id: String,
    pub external_id: String,
    pub templates: Value,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub user_id: String,
    pub external_id: String,
    pub name: String,
    pub projects: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub submission_id: String,
    pub name: String,
    pub project_id: String,
    pub workflow_name: String,
    pub folder: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub document: Value,
    pub is_published: bool,
    pub is_ingested: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MetadataObject {
    pub id: Uuid,
    pub object_id: String,
    pub submission_id: String,
    pub project_id: String,
    pub object_type: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub document: Value,
    pub xml_document: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Added,
    Verified,
    Ready,
    Failed,
}

impl IngestStatus {
    /// `ingest_status` advances only along `added -> verified -> ready`,
    /// with `failed` reachable from any non-terminal state.
    pub fn can_transition_to(self, next: IngestStatus) -> bool {
        use IngestStatus::*;
        match (self, next) {
            (Added, Verified) | (Added, Failed) => true,
            (Verified, Ready) | (Verified, Failed) => true,
            (Ready, Failed) => false, // Ready is terminal on the happy path
            (same, other) if same == other => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorType {
    UserError,
    TransientError,
    PermanentError,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    pub file_id: String,
    pub submission_id: String,
    pub object_id: Option<String>,
    pub path: String,
    pub bytes: i64,
    pub unencrypted_checksum: String,
    pub encrypted_checksum: Option<String>,
    pub checksum_method: String,
    pub ingest_status: String,
    pub ingest_error: Option<String>,
    pub ingest_error_type: Option<String>,
    pub ingest_error_count: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl File {
    pub fn status(&self) -> IngestStatus {
        match self.ingest_status.as_str() {
            "verified" => IngestStatus::Verified,
            "ready" => IngestStatus::Ready,
            "failed" => IngestStatus::Failed,
            _ => IngestStatus::Added,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub submission_id: String,
    pub object_id: Option<String>,
    pub object_type: String,
    pub title: String,
    pub description: Option<String>,
    pub doi: Option<String>,
    pub metax_id: Option<String>,
    pub datacite_url: Option<String>,
    pub rems_url: Option<String>,
    pub rems_resource_id: Option<String>,
    pub rems_catalogue_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: Uuid,
    pub key_id: String,
    pub user_id: String,
    pub user_key_id: String,
    pub api_key_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_status_follows_partial_order() {
        assert!(IngestStatus::Added.can_transition_to(IngestStatus::Verified));
        assert!(IngestStatus::Verified.can_transition_to(IngestStatus::Ready));
        assert!(IngestStatus::Added.can_transition_to(IngestStatus::Failed));
        assert!(!IngestStatus::Ready.can_transition_to(IngestStatus::Added));
        assert!(!IngestStatus::Added.can_transition_to(IngestStatus::Ready));
    }
}
