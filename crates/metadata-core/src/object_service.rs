use std::sync::Arc;

use database::models::MetadataObject;
use database::repositories::{ObjectFilter, ObjectRepository, SubmissionRepository};
use ids::IdentifierService;
use schema::{validate_json, SchemaRegistry, ValidationOutcome};
use serde_json::Value;
use shared::ApiError;
use workflow::WorkflowRegistry;

/// Keys a replace/patch payload must never carry: they are system-assigned.
const FORBIDDEN_OBJECT_FIELDS: &[&str] = &["accessionId", "publishDate", "dateCreated", "metaxIdentifier", "doi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    Json,
    Xml,
}

pub struct ObjectService {
    repo: ObjectRepository,
    submissions: SubmissionRepository,
    schemas: Arc<SchemaRegistry>,
    workflows: Arc<WorkflowRegistry>,
    ids: Arc<IdentifierService>,
}

pub struct AddedObject {
    pub objects: Vec<MetadataObject>,
}

/// What `read_object` found, still distinguishing JSON from raw XML so the
/// HTTP layer can serve the latter as bytes instead of a JSON string.
pub enum ObjectDocument {
    Json(Value),
    Xml(String),
}

impl ObjectService {
    pub fn new(
        repo: ObjectRepository,
        submissions: SubmissionRepository,
        schemas: Arc<SchemaRegistry>,
        workflows: Arc<WorkflowRegistry>,
        ids: Arc<IdentifierService>,
    ) -> Self {
        ObjectService { repo, submissions, schemas, workflows, ids }
    }

    pub async fn add_object(
        &self,
        submission_id: &str,
        object_type: &str,
        payload: &str,
        format: ObjectFormat,
    ) -> Result<AddedObject, ApiError> {
        let submission = self
            .submissions
            .get_by_id(submission_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::NotFound(format!("no submission '{submission_id}'")))?;

        if submission.is_published {
            return Err(ApiError::Conflict("cannot add objects to a published submission".to_string()));
        }

        let workflow = self
            .workflows
            .get(&submission.workflow_name)
            .map_err(|_| ApiError::Internal(format!("submission references unknown workflow '{}'", submission.workflow_name)))?;

        if workflow.single_instance_schemas().contains(object_type) {
            let existing = self.repo.count_by_type(submission_id).await.map_err(internal)?;
            if existing.iter().any(|(t, n)| t == object_type && *n > 0) {
                return Err(ApiError::Conflict(format!(
                    "workflow '{}' allows only one '{object_type}' object per submission",
                    submission.workflow_name
                )));
            }
        }

        let (documents, xml_documents): (Vec<Value>, Vec<Option<String>>) = match format {
            ObjectFormat::Json => {
                let mut doc: Value = serde_json::from_str(payload)
                    .map_err(|e| ApiError::bad_input(format!("malformed JSON: {e}")))?;
                validate_json(&self.schemas, object_type, &mut doc).map_err(validation_error)?;
                (vec![doc], vec![None])
            }
            ObjectFormat::Xml => {
                let outcome = schema::xml::parse(&self.schemas, object_type, payload, || self.ids.new_accession())
                    .map_err(xml_error)?;
                match outcome.objects {
                    schema::xml::ParsedObjects::Single(obj) => (vec![obj], vec![Some(payload.to_string())]),
                    schema::xml::ParsedObjects::Multiple(list) => {
                        let xml = outcome.rewritten_xml.unwrap_or_else(|| payload.to_string());
                        let n = list.len();
                        (list, std::iter::once(Some(xml)).chain(std::iter::repeat(None).take(n.saturating_sub(1))).collect())
                    }
                }
            }
        };

        let mut persisted = Vec::with_capacity(documents.len());
        for (document, xml_document) in documents.into_iter().zip(xml_documents) {
            let name = document.get("name").and_then(Value::as_str).map(str::to_string);
            if let Some(name) = &name {
                if self
                    .repo
                    .get_by_name(&submission.project_id, object_type, name)
                    .await
                    .map_err(internal)?
                    .is_some()
                {
                    return Err(ApiError::Conflict(format!(
                        "object named '{name}' of type '{object_type}' already exists in this project"
                    )));
                }
            }

            let object_id = match document.get("accessionId").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => self.mint_unique_object_id().await?,
            };

            let object = MetadataObject {
                id: uuid::Uuid::new_v4(),
                object_id,
                submission_id: submission_id.to_string(),
                project_id: submission.project_id.clone(),
                object_type: object_type.to_string(),
                name,
                title: document.get("title").and_then(Value::as_str).map(str::to_string),
                description: document.get("description").and_then(Value::as_str).map(str::to_string),
                document,
                xml_document,
                created_at: chrono::Utc::now(),
                modified_at: chrono::Utc::now(),
            };

            persisted.push(self.repo.add(&object).await.map_err(internal)?);
        }

        Ok(AddedObject { objects: persisted })
    }

    pub async fn replace_object(&self, object_id: &str, payload: Value) -> Result<(), ApiError> {
        reject_forbidden_fields(&payload)?;
        let object = self.get_enforcing_not_published(object_id).await?;
        let mut validated = payload.clone();
        validate_json(&self.schemas, &object.object_type, &mut validated).map_err(validation_error)?;

        self.repo
            .update(object_id, |o| {
                o.document = validated;
                o.xml_document = None;
            })
            .await
            .map_err(internal)
    }

    pub async fn update_object(&self, object_id: &str, partial: Value, format: ObjectFormat) -> Result<(), ApiError> {
        if format == ObjectFormat::Xml {
            return Err(ApiError::UnsupportedMedia("XML partial patch is not supported".to_string()));
        }
        reject_forbidden_fields(&partial)?;
        let object = self.get_enforcing_not_published(object_id).await?;

        let mut merged = object.document.clone();
        merge_json(&mut merged, &partial);

        self.repo
            .update(object_id, |o| o.document = merged)
            .await
            .map_err(internal)
    }

    pub async fn read_object(&self, object_id: &str, format: ObjectFormat) -> Result<ObjectDocument, ApiError> {
        let object = self
            .repo
            .get_by_id(object_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::NotFound(format!("no object '{object_id}'")))?;

        match format {
            ObjectFormat::Json => Ok(ObjectDocument::Json(object.document)),
            ObjectFormat::Xml => match object.xml_document {
                Some(xml) => Ok(ObjectDocument::Xml(xml)),
                None => Err(ApiError::NotFound(format!("object '{object_id}' has no stored XML"))),
            },
        }
    }

    pub async fn delete_object(&self, object_id: &str) -> Result<(), ApiError> {
        self.get_enforcing_not_published(object_id).await?;
        let deleted = self.repo.delete_by_id(object_id).await.map_err(internal)?;
        if !deleted {
            return Err(ApiError::NotFound(format!("no object '{object_id}'")));
        }
        Ok(())
    }

    pub async fn list(&self, filter: ObjectFilter) -> Result<Vec<MetadataObject>, ApiError> {
        self.repo.list(&filter).await.map_err(internal)
    }

    async fn get_enforcing_not_published(&self, object_id: &str) -> Result<MetadataObject, ApiError> {
        let object = self
            .repo
            .get_by_id(object_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::NotFound(format!("no object '{object_id}'")))?;

        let submission = self
            .submissions
            .get_by_id(&object.submission_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::Internal("object references a missing submission".to_string()))?;

        if submission.is_published {
            return Err(ApiError::Conflict("cannot mutate an object of a published submission".to_string()));
        }
        Ok(object)
    }

    async fn mint_unique_object_id(&self) -> Result<String, ApiError> {
        let first = self.ids.new_accession();
        if self.repo.get_by_id(&first).await.map_err(internal)?.is_none() {
            return Ok(first);
        }
        let second = self.ids.new_accession();
        if self.repo.get_by_id(&second).await.map_err(internal)?.is_none() {
            return Ok(second);
        }
        Err(ApiError::Internal("accession id collided twice".to_string()))
    }
}

fn reject_forbidden_fields(payload: &Value) -> Result<(), ApiError> {
    if let Value::Object(map) = payload {
        for field in FORBIDDEN_OBJECT_FIELDS {
            if map.contains_key(*field) {
                return Err(ApiError::bad_input(format!("field '{field}' is system-assigned and cannot be set")));
            }
        }
    }
    Ok(())
}

fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                merge_json(base_map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}

fn validation_error(err: ValidationOutcome) -> ApiError {
    match err {
        ValidationOutcome::SchemaError(e) => ApiError::NotFound(e.to_string()),
        ValidationOutcome::Invalid(e) => ApiError::BadInput {
            reason: e.reason,
            instance: if e.instance_path.is_empty() { None } else { Some(e.instance_path) },
        },
    }
}

fn xml_error(err: schema::xml::XmlParseError) -> ApiError {
    use schema::xml::XmlParseError;
    match err {
        XmlParseError::Schema(e) => ApiError::NotFound(e.to_string()),
        XmlParseError::Invalid { reason, instance } => ApiError::BadInput {
            reason,
            instance: if instance.is_empty() { None } else { Some(instance) },
        },
        XmlParseError::Syntax(e) => ApiError::bad_input(format!("malformed XML: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_nested_objects_without_dropping_siblings() {
        let mut base = serde_json::json!({"a": 1, "nested": {"x": 1, "y": 2}});
        let patch = serde_json::json!({"nested": {"y": 3}});
        merge_json(&mut base, &patch);
        assert_eq!(base, serde_json::json!({"a": 1, "nested": {"x": 1, "y": 3}}));
    }

    #[test]
    fn forbidden_fields_are_rejected() {
        let payload = serde_json::json!({"accessionId": "x"});
        assert!(reject_forbidden_fields(&payload).is_err());
    }
}
