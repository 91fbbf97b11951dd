//! Publish orchestrator (SPEC_FULL.md §4.J): pre-flight checks, ordered
//! external calls, update-if-null bookkeeping in `registrations`, and
//! the compensations that undo unpublished external drafts on failure.

pub mod recovery;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use database::models::Registration;
use database::repositories::{FileRepository, ObjectRepository, RegistrationRepository, SubmissionRepository};
use external_clients::access_management::AccessManagementClient;
use external_clients::catalog::{self, CatalogClient};
use external_clients::doi::DoiClient;
use external_clients::ingestion_admin::IngestionAdminClient;
use serde_json::{json, Value};
use shared::ApiError;
use workflow::WorkflowRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The submission was already published; repeating `publish` is a no-op.
    AlreadyPublished,
    Published,
}

pub struct PublishOrchestrator {
    submissions: SubmissionRepository,
    objects: ObjectRepository,
    registrations: RegistrationRepository,
    files: FileRepository,
    workflows: Arc<WorkflowRegistry>,
    doi: DoiClient,
    catalog: CatalogClient,
    access: AccessManagementClient,
    ingestion: IngestionAdminClient,
}

/// One DOI-bearing object tracked through the pipeline, so a mid-way
/// failure knows exactly which drafts to compensate.
struct Pending {
    object_id: String,
    object_type: String,
    document: Value,
    doi: String,
    doi_minted_this_run: bool,
    catalog_id: Option<String>,
}

impl PublishOrchestrator {
    pub fn new(
        submissions: SubmissionRepository,
        objects: ObjectRepository,
        registrations: RegistrationRepository,
        files: FileRepository,
        workflows: Arc<WorkflowRegistry>,
        doi: DoiClient,
        catalog: CatalogClient,
        access: AccessManagementClient,
        ingestion: IngestionAdminClient,
    ) -> Self {
        PublishOrchestrator { submissions, objects, registrations, files, workflows, doi, catalog, access, ingestion }
    }

    pub async fn publish(&self, submission_id: &str) -> Result<PublishOutcome, ApiError> {
        let submission = self
            .submissions
            .get_by_id(submission_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::NotFound(format!("no submission '{submission_id}'")))?;

        if submission.is_published {
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let workflow = self
            .workflows
            .get(&submission.workflow_name)
            .map_err(|_| ApiError::Internal(format!("submission references unknown workflow '{}'", submission.workflow_name)))?;

        let counts = self.object_counts(submission_id).await?;
        let satisfaction = workflow.is_satisfied_by(&counts);
        if !satisfaction.is_satisfied() {
            return Err(ApiError::Conflict(format!(
                "workflow '{}' is not satisfied: missing {:?}, over single-instance {:?}, unmet requires {:?}, unmet requires_or {:?}",
                submission.workflow_name,
                satisfaction.missing_required,
                satisfaction.over_single_instance,
                satisfaction.unmet_requires,
                satisfaction.unmet_requires_or,
            )));
        }

        let config = workflow.publish_config();
        let doi_schemas: HashSet<String> = config.and_then(|c| c.datacite.as_ref()).map(|s| s.schemas.iter().cloned().collect()).unwrap_or_default();
        let discovery_schemas: HashSet<String> = config.and_then(|c| c.discovery.as_ref()).map(|s| s.schemas.iter().cloned().collect()).unwrap_or_default();
        let rems_schemas: HashSet<String> = config.and_then(|c| c.rems.as_ref()).map(|s| s.schemas.iter().cloned().collect()).unwrap_or_default();

        for endpoint in workflow.publish_endpoints() {
            let healthy = match endpoint.as_str() {
                "datacite" => self.doi.health_check().await,
                "discovery" => self.catalog.health_check().await,
                "rems" => self.access.health_check().await,
                _ => true,
            };
            if !healthy {
                return Err(ApiError::ExternalServerError(format!("publish endpoint '{endpoint}' failed its health check")));
            }
        }

        let all_objects = self.objects.list(&database::repositories::ObjectFilter {
            submission_id: submission_id.to_string(),
            ..Default::default()
        }).await.map_err(internal)?;

        let doi_info = submission.document.get("doiInfo").cloned().unwrap_or_else(|| json!({}));
        let existing_registrations = self.registrations.list_by_submission(submission_id).await.map_err(internal)?;

        let mut pending: Vec<Pending> = Vec::new();
        for object in all_objects.iter().filter(|o| doi_schemas.contains(&o.object_type)) {
            let already_registered = existing_registrations.iter().any(|r| r.object_id.as_deref() == Some(&object.object_id) && r.doi.is_some());

            let (doi, minted, landing_url) = match object.document.get("doi").and_then(Value::as_str) {
                Some(doi) => (doi.to_string(), false, None),
                None => {
                    let draft = self.doi.create_draft().await?;
                    let mut document = object.document.clone();
                    document["doi"] = json!(draft.doi);
                    self.objects.update(&object.object_id, |o| o.document = document).await.map_err(internal)?;
                    (draft.doi, true, Some(draft.landing_url))
                }
            };

            if !already_registered {
                self.ensure_registration(&submission_id.to_string(), object, &doi, landing_url.as_deref()).await?;
            }

            let mut document = object.document.clone();
            document["doi"] = json!(doi);
            pending.push(Pending {
                object_id: object.object_id.clone(),
                object_type: object.object_type.clone(),
                document,
                doi,
                doi_minted_this_run: minted,
                catalog_id: None,
            });
        }

        if let Err(err) = self.update_doi_info(&pending, &doi_info).await {
            self.compensate(&pending).await;
            return Err(err);
        }

        if let Err(err) = self.register_with_catalog(submission_id, &mut pending, &doi_info, &discovery_schemas).await {
            self.compensate(&pending).await;
            return Err(err);
        }

        if !rems_schemas.is_empty() {
            if let Err(err) = self.register_with_access_management(submission_id, &submission.document, &pending, &rems_schemas).await {
                self.compensate(&pending).await;
                return Err(err);
            }
        }

        let now = Utc::now();
        self.submissions
            .update(submission_id, |s| {
                s.is_published = true;
                s.published_at = Some(now);
            })
            .await
            .map_err(internal)?;

        self.trigger_ingestion(&submission.project_id, submission_id).await;

        Ok(PublishOutcome::Published)
    }

    async fn object_counts(&self, submission_id: &str) -> Result<HashMap<String, usize>, ApiError> {
        let rows = self.objects.count_by_type(submission_id).await.map_err(internal)?;
        Ok(rows.into_iter().map(|(t, n)| (t, n as usize)).collect())
    }

    async fn ensure_registration(
        &self,
        submission_id: &str,
        object: &database::models::MetadataObject,
        doi: &str,
        datacite_url: Option<&str>,
    ) -> Result<(), ApiError> {
        let registration = Registration {
            id: uuid::Uuid::new_v4(),
            submission_id: submission_id.to_string(),
            object_id: Some(object.object_id.clone()),
            object_type: object.object_type.clone(),
            title: object.title.clone().unwrap_or_default(),
            description: object.description.clone(),
            doi: Some(doi.to_string()),
            metax_id: None,
            datacite_url: datacite_url.map(|s| s.to_string()),
            rems_url: None,
            rems_resource_id: None,
            rems_catalogue_id: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        };
        self.registrations.add(&registration).await.map_err(internal)?;
        Ok(())
    }

    async fn update_doi_info(&self, pending: &[Pending], doi_info: &Value) -> Result<(), ApiError> {
        for item in pending {
            let payload = build_doi_payload(&item.doi, &item.document, doi_info);
            self.doi.update(&item.doi, payload).await?;
        }
        Ok(())
    }

    async fn register_with_catalog(
        &self,
        submission_id: &str,
        pending: &mut [Pending],
        doi_info: &Value,
        discovery_schemas: &HashSet<String>,
    ) -> Result<(), ApiError> {
        let mut datasets = Vec::new();
        for item in pending.iter_mut().filter(|p| discovery_schemas.contains(&p.object_type)) {
            let draft_payload = json!({
                "data_catalog": self.catalog.data_catalog(),
                "research_dataset": catalog::map_to_research_dataset(&item.doi, doi_info, &item.document),
            });
            let catalog_id = self.catalog.create_draft(draft_payload).await?;
            item.catalog_id = Some(catalog_id);
        }

        let bulk_payloads: Vec<Value> = pending
            .iter()
            .filter_map(|p| p.catalog_id.as_ref().map(|id| json!({
                "identifier": id,
                "research_dataset": catalog::map_to_research_dataset(&p.doi, doi_info, &p.document),
            })))
            .collect();
        if !bulk_payloads.is_empty() {
            self.catalog.bulk_update(bulk_payloads).await?;
        }

        for item in pending.iter().filter(|p| p.catalog_id.is_some()) {
            let catalog_id = item.catalog_id.as_ref().unwrap();
            let preferred_identifier = self.catalog.publish(catalog_id).await?;
            self.registrations
                .update_if_null(submission_id, Some(&item.object_id), None, Some(&preferred_identifier), None, None, None)
                .await
                .map_err(internal)?;
        }
        Ok(())
    }

    async fn register_with_access_management(
        &self,
        submission_id: &str,
        submission_document: &Value,
        pending: &[Pending],
        rems_schemas: &HashSet<String>,
    ) -> Result<(), ApiError> {
        let rems_config = parse_rems_config(submission_document);

        self.access
            .validate_workflow_licenses(&rems_config.organization, rems_config.workflow_id, &rems_config.license_ids)
            .await?;

        for item in pending.iter().filter(|p| rems_schemas.contains(&p.object_type)) {
            let resource_id = self.access.create_resource(&item.doi, &rems_config.organization, &rems_config.license_ids).await?;
            let localizations = json!({
                "en": {"title": item.document.get("title").cloned().unwrap_or(Value::Null)},
            });
            let catalogue_id = self
                .access
                .create_catalogue_item(resource_id, rems_config.workflow_id, &rems_config.organization, localizations)
                .await?;

            self.registrations
                .update_if_null(submission_id, Some(&item.object_id), None, None, Some(&resource_id.to_string()), Some(&catalogue_id.to_string()), None)
                .await
                .map_err(internal)?;
        }
        Ok(())
    }

    async fn trigger_ingestion(&self, project_id: &str, submission_id: &str) {
        let Ok(files) = self.files.list_by_submission(submission_id).await else { return };
        for file in files {
            if let Err(e) = self.ingestion.assign_accession(project_id, &file.path, &file.file_id).await {
                tracing::warn!(path = %file.path, error = %e, "failed to assign accession to file");
                continue;
            }
            if let Err(e) = self.ingestion.ingest_file(project_id, &file.path).await {
                tracing::warn!(path = %file.path, error = %e, "failed to trigger file ingestion");
            }
        }
    }

    /// Deletes DOI and catalog drafts that were created but never
    /// published, per SPEC_FULL.md §4.J's compensation rule.
    async fn compensate(&self, pending: &[Pending]) {
        for item in pending {
            if item.doi_minted_this_run {
                if let Err(e) = self.doi.delete_draft(&item.doi).await {
                    tracing::error!(doi = %item.doi, error = %e, "failed to compensate unpublished DOI draft");
                }
            }
            if let Some(catalog_id) = &item.catalog_id {
                if let Err(e) = self.catalog.delete_draft(catalog_id).await {
                    tracing::error!(catalog_id, error = %e, "failed to compensate unpublished catalog draft");
                }
            }
        }
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}

fn build_doi_payload(doi: &str, object_document: &Value, doi_info: &Value) -> Value {
    json!({
        "doi": doi,
        "titles": [{"title": object_document.get("title").cloned().unwrap_or(Value::Null)}],
        "descriptions": [{"description": object_document.get("description").cloned().unwrap_or(Value::Null)}],
        "creators": doi_info.get("creator").cloned().unwrap_or_else(|| json!([])),
        "contributors": doi_info.get("contributor").cloned().unwrap_or_else(|| json!([])),
        "publicationYear": doi_info.get("publicationYear").cloned().unwrap_or(Value::Null),
    })
}

struct RemsConfig {
    organization: String,
    workflow_id: u64,
    license_ids: Vec<u64>,
}

fn parse_rems_config(submission_document: &Value) -> RemsConfig {
    let rems = submission_document.get("rems").cloned().unwrap_or_else(|| json!({}));
    RemsConfig {
        organization: rems.get("organization").and_then(Value::as_str).unwrap_or_default().to_string(),
        workflow_id: rems.get("workflowId").and_then(Value::as_u64).unwrap_or_default(),
        license_ids: rems
            .get("licenses")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_u64)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doi_payload_carries_object_title_and_submission_creators() {
        let object = json!({"title": "A dataset", "description": "desc"});
        let doi_info = json!({"creator": [{"name": "Doe, Jane"}], "publicationYear": 2026});

        let payload = build_doi_payload("10.1234/abc", &object, &doi_info);

        assert_eq!(payload["doi"], "10.1234/abc");
        assert_eq!(payload["titles"][0]["title"], "A dataset");
        assert_eq!(payload["creators"][0]["name"], "Doe, Jane");
        assert_eq!(payload["publicationYear"], 2026);
    }

    #[test]
    fn doi_payload_defaults_missing_fields_to_null_or_empty() {
        let payload = build_doi_payload("10.1234/abc", &json!({}), &json!({}));

        assert_eq!(payload["titles"][0]["title"], Value::Null);
        assert_eq!(payload["creators"], json!([]));
        assert_eq!(payload["publicationYear"], Value::Null);
    }

    #[test]
    fn rems_config_parses_organization_workflow_and_licenses() {
        let document = json!({
            "rems": {"organization": "CSC", "workflowId": 7, "licenses": [1, 2, 3]},
        });

        let config = parse_rems_config(&document);

        assert_eq!(config.organization, "CSC");
        assert_eq!(config.workflow_id, 7);
        assert_eq!(config.license_ids, vec![1, 2, 3]);
    }

    #[test]
    fn rems_config_defaults_when_submission_has_no_rems_block() {
        let config = parse_rems_config(&json!({}));

        assert_eq!(config.organization, "");
        assert_eq!(config.workflow_id, 0);
        assert!(config.license_ids.is_empty());
    }
}
