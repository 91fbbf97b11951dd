//! Workflow documents: which schema types a submission workflow
//! recognizes, which are mandatory, which allow at most one object, and
//! where a satisfied submission gets published to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to parse workflow document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read workflow directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown workflow '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRef {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_allow_multiple", rename = "allowMultipleObjects")]
    pub allow_multiple_objects: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub requires_or: Vec<String>,
}

fn default_allow_multiple() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub schemas: Vec<SchemaRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEndpoint {
    pub endpoint: String,
    #[serde(default, rename = "requiredSchemas")]
    pub required_schemas: Vec<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub datacite: Option<ServiceSchemas>,
    #[serde(default)]
    pub rems: Option<ServiceSchemas>,
    #[serde(default)]
    pub discovery: Option<ServiceSchemas>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSchemas {
    pub service: String,
    #[serde(default)]
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub publish: Vec<PublishEndpoint>,
    #[serde(default)]
    pub publish_config: Option<PublishConfig>,
}

/// A loaded, queryable workflow. Carries no behavior of its own beyond
/// derived views over the document -- `is_satisfied_by` is the one
/// piece of actual logic, and it's pure.
#[derive(Debug, Clone)]
pub struct Workflow {
    document: WorkflowDocument,
}

impl Workflow {
    pub fn from_yaml(text: &str) -> Result<Self, WorkflowError> {
        let document: WorkflowDocument = serde_yaml::from_str(text)?;
        Ok(Workflow { document })
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn description(&self) -> &str {
        &self.document.description
    }

    pub fn document(&self) -> &WorkflowDocument {
        &self.document
    }

    fn schema_refs(&self) -> impl Iterator<Item = &SchemaRef> {
        self.document.steps.iter().flat_map(|step| step.schemas.iter())
    }

    /// All schema types referenced anywhere in the workflow.
    pub fn schemas(&self) -> HashSet<String> {
        self.schema_refs().map(|s| s.name.clone()).collect()
    }

    /// Union of: schemas marked `required`; schemas named in any
    /// `requires`/`requires_or` of a required schema; schemas named in
    /// any publish endpoint's `requiredSchemas`.
    pub fn required_schemas(&self) -> HashSet<String> {
        let mut required = HashSet::new();
        for schema in self.schema_refs() {
            if schema.required {
                required.insert(schema.name.clone());
                required.extend(schema.requires.iter().cloned());
                required.extend(schema.requires_or.iter().cloned());
            }
        }
        for publish in &self.document.publish {
            required.extend(publish.required_schemas.iter().cloned());
        }
        required
    }

    /// Schemas with `allowMultipleObjects=false`.
    pub fn single_instance_schemas(&self) -> HashSet<String> {
        self.schema_refs()
            .filter(|s| !s.allow_multiple_objects)
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn publish_endpoints(&self) -> Vec<String> {
        self.document.publish.iter().map(|p| p.endpoint.clone()).collect()
    }

    pub fn publish_config(&self) -> Option<&PublishConfig> {
        self.document.publish_config.as_ref()
    }

    /// A submission is satisfied by this workflow iff: every required
    /// schema has at least one object; every single-instance schema has
    /// at most one object; for every present schema, every `requires`
    /// element has at least one object, and at least one `requires_or`
    /// element has at least one object.
    ///
    /// `object_counts` maps schema type -> number of objects of that
    /// type the submission currently holds.
    pub fn is_satisfied_by(&self, object_counts: &std::collections::HashMap<String, usize>) -> SatisfactionResult {
        let count_of = |name: &str| object_counts.get(name).copied().unwrap_or(0);
        let mut missing_required = Vec::new();
        for name in self.required_schemas() {
            if count_of(&name) == 0 {
                missing_required.push(name);
            }
        }

        let mut over_single_instance = Vec::new();
        for name in self.single_instance_schemas() {
            if count_of(&name) > 1 {
                over_single_instance.push(name);
            }
        }

        let mut unmet_requires = Vec::new();
        let mut unmet_requires_or = Vec::new();
        for schema in self.schema_refs() {
            if count_of(&schema.name) == 0 {
                continue;
            }
            for req in &schema.requires {
                if count_of(req) == 0 {
                    unmet_requires.push((schema.name.clone(), req.clone()));
                }
            }
            if !schema.requires_or.is_empty() && !schema.requires_or.iter().any(|r| count_of(r) > 0) {
                unmet_requires_or.push((schema.name.clone(), schema.requires_or.clone()));
            }
        }

        SatisfactionResult {
            missing_required,
            over_single_instance,
            unmet_requires,
            unmet_requires_or,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SatisfactionResult {
    pub missing_required: Vec<String>,
    pub over_single_instance: Vec<String>,
    pub unmet_requires: Vec<(String, String)>,
    pub unmet_requires_or: Vec<(String, Vec<String>)>,
}

impl SatisfactionResult {
    pub fn is_satisfied(&self) -> bool {
        self.missing_required.is_empty()
            && self.over_single_instance.is_empty()
            && self.unmet_requires.is_empty()
            && self.unmet_requires_or.is_empty()
    }
}

/// In-memory registry of named workflow documents, loaded once at
/// startup -- the workflow analogue of `schema::SchemaRegistry`.
pub struct WorkflowRegistry {
    workflows: std::collections::HashMap<String, Workflow>,
}

impl WorkflowRegistry {
    pub fn load_from_dir(dir: &std::path::Path) -> Result<Self, WorkflowError> {
        let mut workflows = std::collections::HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let workflow = Workflow::from_yaml(&text)?;
            tracing::info!(workflow = %workflow.name(), "workflow loaded");
            workflows.insert(workflow.name().to_string(), workflow);
        }
        Ok(WorkflowRegistry { workflows })
    }

    pub fn get(&self, name: &str) -> Result<&Workflow, WorkflowError> {
        self.workflows.get(name).ok_or_else(|| WorkflowError::NotFound(name.to_string()))
    }

    pub fn list(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FEGA_YAML: &str = r#"
name: fega
description: "FEGA submission workflow"
steps:
  - title: "Study"
    schemas:
      - name: study
        required: true
  - title: "Dataset"
    schemas:
      - name: dataset
        required: true
        requires: [study]
  - title: "DAC"
    schemas:
      - name: dac
        required: true
publish:
  - endpoint: discovery
    requiredSchemas: [study, dataset]
"#;

    #[test]
    fn required_schemas_include_requires_transitively() {
        let workflow = Workflow::from_yaml(FEGA_YAML).unwrap();
        let required = workflow.required_schemas();
        assert!(required.contains("study"));
        assert!(required.contains("dataset"));
        assert!(required.contains("dac"));
    }

    #[test]
    fn missing_required_schema_fails_satisfaction() {
        let workflow = Workflow::from_yaml(FEGA_YAML).unwrap();
        let mut counts = HashMap::new();
        counts.insert("study".to_string(), 1);
        let result = workflow.is_satisfied_by(&counts);
        assert!(!result.is_satisfied());
        assert!(result.missing_required.contains(&"dataset".to_string()));
    }

    #[test]
    fn fully_satisfied_when_all_required_present() {
        let workflow = Workflow::from_yaml(FEGA_YAML).unwrap();
        let mut counts = HashMap::new();
        counts.insert("study".to_string(), 1);
        counts.insert("dataset".to_string(), 1);
        counts.insert("dac".to_string(), 1);
        assert!(workflow.is_satisfied_by(&counts).is_satisfied());
    }

    #[test]
    fn single_instance_violation_is_flagged() {
        const YAML: &str = r#"
name: bigpicture
description: "Bigpicture workflow"
steps:
  - title: "Dataset"
    schemas:
      - name: bpdataset
        required: true
        allowMultipleObjects: false
"#;
        let workflow = Workflow::from_yaml(YAML).unwrap();
        assert!(workflow.single_instance_schemas().contains("bpdataset"));
        let mut counts = HashMap::new();
        counts.insert("bpdataset".to_string(), 2);
        let result = workflow.is_satisfied_by(&counts);
        assert!(result.over_single_instance.contains(&"bpdataset".to_string()));
    }

    #[test]
    fn requires_or_needs_at_least_one_member_present() {
        const YAML: &str = r#"
name: rems
description: "REMS workflow"
steps:
  - title: "Dataset"
    schemas:
      - name: dataset
        required: true
        requires_or: [policy, dac]
"#;
        let workflow = Workflow::from_yaml(YAML).unwrap();
        let mut counts = HashMap::new();
        counts.insert("dataset".to_string(), 1);
        let result = workflow.is_satisfied_by(&counts);
        assert!(!result.is_satisfied());
        counts.insert("policy".to_string(), 1);
        assert!(workflow.is_satisfied_by(&counts).is_satisfied());
    }
}
