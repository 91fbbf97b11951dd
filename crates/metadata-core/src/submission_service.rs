use std::sync::Arc;

use chrono::Utc;
use database::repositories::{SubmissionFilter, SubmissionRepository, SubmissionSort};
use database::models::Submission;
use ids::IdentifierService;
use serde_json::{Map, Value};
use shared::ApiError;
use workflow::WorkflowRegistry;

/// Fields a client must never set directly; stripped from the incoming
/// document on create, and protected from overwrite on whole-document
/// update.
const CLIENT_FORBIDDEN_FIELDS: &[&str] = &[
    "submissionId",
    "createdAt",
    "modifiedAt",
    "publishedAt",
    "ingestedAt",
    "isPublished",
    "isIngested",
];

/// Sub-documents that a whole-document update must not silently drop.
const PRESERVED_SUBDOCUMENTS: &[&str] = &["rems", "doiInfo"];

/// Fields that cannot change once set, enforced on whole-document update.
const IMMUTABLE_FIELDS: &[&str] = &["workflow", "projectId", "linkedFolder"];

pub struct SubmissionService {
    repo: SubmissionRepository,
    ids: Arc<IdentifierService>,
    workflows: Arc<WorkflowRegistry>,
}

pub struct NewSubmission {
    pub project_id: String,
    pub document: Value,
}

impl SubmissionService {
    pub fn new(repo: SubmissionRepository, ids: Arc<IdentifierService>, workflows: Arc<WorkflowRegistry>) -> Self {
        SubmissionService { repo, ids, workflows }
    }

    pub async fn create(&self, input: NewSubmission) -> Result<Submission, ApiError> {
        let mut document = match input.document {
            Value::Object(map) => map,
            _ => return Err(ApiError::bad_input("submission document must be a JSON object")),
        };

        for field in CLIENT_FORBIDDEN_FIELDS {
            document.remove(*field);
        }

        let name = document
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::bad_input("submission requires a 'name'"))?
            .to_string();
        let workflow_name = document
            .get("workflow")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::bad_input("submission requires a 'workflow'"))?
            .to_string();

        self.workflows
            .get(&workflow_name)
            .map_err(|_| ApiError::NotFound(format!("unknown workflow '{workflow_name}'")))?;

        if self.repo.get_by_name(&input.project_id, &name).await.map_err(internal)?.is_some() {
            return Err(ApiError::Conflict(format!(
                "submission named '{name}' already exists in this project"
            )));
        }

        let folder = document.get("folder").and_then(Value::as_str).map(str::to_string);

        document.remove("name");
        document.remove("projectId");
        document.remove("workflow");
        document.remove("folder");

        let submission_id = self.mint_unique_submission_id().await?;

        let submission = Submission {
            id: uuid::Uuid::new_v4(),
            submission_id,
            name,
            project_id: input.project_id,
            workflow_name,
            folder,
            title: document.get("title").and_then(Value::as_str).map(str::to_string),
            description: document.get("description").and_then(Value::as_str).map(str::to_string),
            document: Value::Object(document),
            is_published: false,
            is_ingested: false,
            published_at: None,
            ingested_at: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        };

        self.repo.add(&submission).await.map_err(internal)
    }

    /// The stored document merged with repository-managed fields.
    pub async fn get_document(&self, submission_id: &str) -> Result<Value, ApiError> {
        let submission = self.get(submission_id).await?;
        let mut document = match submission.document.clone() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        document.insert("submissionId".into(), Value::String(submission.submission_id));
        document.insert("name".into(), Value::String(submission.name));
        document.insert("projectId".into(), Value::String(submission.project_id));
        document.insert("workflow".into(), Value::String(submission.workflow_name));
        if let Some(folder) = submission.folder {
            document.insert("folder".into(), Value::String(folder));
        }
        document.insert("createdAt".into(), Value::String(submission.created_at.to_rfc3339()));
        document.insert("modifiedAt".into(), Value::String(submission.modified_at.to_rfc3339()));
        document.insert("isPublished".into(), Value::Bool(submission.is_published));
        document.insert("isIngested".into(), Value::Bool(submission.is_ingested));
        if let Some(published_at) = submission.published_at {
            document.insert("publishedAt".into(), Value::String(published_at.to_rfc3339()));
        }
        if let Some(ingested_at) = submission.ingested_at {
            document.insert("ingestedAt".into(), Value::String(ingested_at.to_rfc3339()));
        }
        Ok(Value::Object(document))
    }

    pub async fn get(&self, submission_id: &str) -> Result<Submission, ApiError> {
        self.repo
            .get_by_id(submission_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::NotFound(format!("no submission '{submission_id}'")))
    }

    pub async fn list(
        &self,
        filter: SubmissionFilter,
        sort: SubmissionSort,
        page: &shared::PageRequest,
    ) -> Result<(Vec<Submission>, i64), ApiError> {
        self.repo
            .list(&filter, sort, page.offset(), page.limit())
            .await
            .map_err(internal)
    }

    pub async fn update_name(&self, submission_id: &str, name: String) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        self.repo
            .update(submission_id, |s| s.name = name)
            .await
            .map_err(internal)
    }

    pub async fn update_description(&self, submission_id: &str, description: String) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        self.repo
            .update(submission_id, |s| s.description = Some(description))
            .await
            .map_err(internal)
    }

    pub async fn update_folder(&self, submission_id: &str, folder: String) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        self.repo
            .update(submission_id, |s| s.folder = Some(folder))
            .await
            .map_err(internal)
    }

    pub async fn update_doi_info(&self, submission_id: &str, doi_info: Value) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        self.repo
            .update(submission_id, |s| {
                if let Value::Object(doc) = &mut s.document {
                    doc.insert("doiInfo".into(), doi_info);
                }
            })
            .await
            .map_err(internal)
    }

    pub async fn update_rems(&self, submission_id: &str, rems: Value) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        self.repo
            .update(submission_id, |s| {
                if let Value::Object(doc) = &mut s.document {
                    doc.insert("rems".into(), rems);
                }
            })
            .await
            .map_err(internal)
    }

    /// Whole-document update: refuses to change immutable fields or drop
    /// preserved sub-documents, then bumps `modified_at`.
    pub async fn update_document(&self, submission_id: &str, new_document: Value) -> Result<(), ApiError> {
        self.check_not_published(submission_id).await?;
        let current = self.get(submission_id).await?;

        let new_map = match &new_document {
            Value::Object(map) => map,
            _ => return Err(ApiError::bad_input("submission document must be a JSON object")),
        };

        if let Value::Object(current_map) = &current.document {
            for field in IMMUTABLE_FIELDS {
                let before = current_map.get(*field);
                let after = new_map.get(*field);
                if before.is_some() && before != after {
                    return Err(ApiError::bad_input(format!("field '{field}' is immutable once set")));
                }
            }
            for sub in PRESERVED_SUBDOCUMENTS {
                if current_map.contains_key(*sub) && !new_map.contains_key(*sub) {
                    return Err(ApiError::bad_input(format!("update must not drop '{sub}'")));
                }
            }
        }

        let mut sanitized = new_map.clone();
        for field in CLIENT_FORBIDDEN_FIELDS {
            sanitized.remove(*field);
        }

        self.repo
            .update(submission_id, |s| s.document = Value::Object(sanitized))
            .await
            .map_err(internal)
    }

    pub async fn is_owner(&self, user_projects: &[String], submission_id: &str) -> Result<bool, ApiError> {
        let submission = self.get(submission_id).await?;
        Ok(user_projects.iter().any(|p| p == &submission.project_id))
    }

    pub async fn check_not_published(&self, submission_id: &str) -> Result<Submission, ApiError> {
        let submission = self.get(submission_id).await?;
        if submission.is_published {
            return Err(ApiError::Conflict(format!("submission '{submission_id}' is already published")));
        }
        Ok(submission)
    }

    async fn mint_unique_submission_id(&self) -> Result<String, ApiError> {
        let first = self.ids.new_accession();
        if self.repo.get_by_id(&first).await.map_err(internal)?.is_none() {
            return Ok(first);
        }
        tracing::warn!(candidate = %first, "submission id collision, retrying once");
        let second = self.ids.new_accession();
        if self.repo.get_by_id(&second).await.map_err(internal)?.is_none() {
            return Ok(second);
        }
        Err(ApiError::Internal("accession id collided twice".to_string()))
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_fields_list_matches_spec() {
        assert!(CLIENT_FORBIDDEN_FIELDS.contains(&"submissionId"));
        assert!(CLIENT_FORBIDDEN_FIELDS.contains(&"isPublished"));
        assert!(IMMUTABLE_FIELDS.contains(&"workflow"));
        assert!(PRESERVED_SUBDOCUMENTS.contains(&"doiInfo"));
    }
}
