use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown schema type '{0}'")]
    SchemaNotFound(String),
    #[error("failed to read schema directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed schema file '{file}': {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A lightweight structural descriptor for an XML schema type: the
/// expected root element and the child elements that must be present.
/// This stands in for full XSD validation, which none of the crates
/// available to this workspace provide; it reproduces the part of the
/// original behavior spec.md actually exercises (required-element
/// presence and source-line error reporting), not full XSD semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct XmlSchema {
    pub root: String,
    #[serde(default)]
    pub required_elements: Vec<String>,
    /// Bigpicture-style types whose root may wrap more than one object,
    /// each needing its own accession id minted and stamped back into
    /// the XML.
    #[serde(default)]
    pub multi_object: bool,
}

/// In-memory `schema_type -> artifact` map, populated once at startup
/// from a read-only schemas directory. No invalidation, no hot-reload.
pub struct SchemaRegistry {
    json_schemas: HashMap<String, Value>,
    xml_schemas: HashMap<String, XmlSchema>,
}

impl SchemaRegistry {
    /// Loads `<dir>/<name>.json` as JSON Schemas and `<dir>/<name>.xml.json`
    /// as the lightweight XML schema descriptors described above.
    pub fn load_from_dir(dir: &Path) -> Result<Self, SchemaError> {
        let mut json_schemas = HashMap::new();
        let mut xml_schemas = HashMap::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            if let Some(name) = file_name.strip_suffix(".xml.json") {
                let raw = fs::read_to_string(&path)?;
                let schema: XmlSchema = serde_json::from_str(&raw).map_err(|source| SchemaError::Malformed {
                    file: file_name.clone(),
                    source,
                })?;
                xml_schemas.insert(name.to_string(), schema);
            } else if let Some(name) = file_name.strip_suffix(".json") {
                let raw = fs::read_to_string(&path)?;
                let schema: Value = serde_json::from_str(&raw).map_err(|source| SchemaError::Malformed {
                    file: file_name.clone(),
                    source,
                })?;
                json_schemas.insert(name.to_string(), schema);
            }
        }

        tracing::info!(
            json_schemas = json_schemas.len(),
            xml_schemas = xml_schemas.len(),
            "schema registry loaded"
        );

        Ok(SchemaRegistry { json_schemas, xml_schemas })
    }

    pub fn get_json_schema(&self, name: &str) -> Result<&Value, SchemaError> {
        self.json_schemas
            .get(name)
            .ok_or_else(|| SchemaError::SchemaNotFound(name.to_string()))
    }

    pub fn get_xml_schema(&self, name: &str) -> Result<&XmlSchema, SchemaError> {
        self.xml_schemas
            .get(name)
            .ok_or_else(|| SchemaError::SchemaNotFound(name.to_string()))
    }

    pub fn known_json_types(&self) -> impl Iterator<Item = &str> {
        self.json_schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("src/schemas")
    }

    #[test]
    fn loads_bundled_schemas() {
        let registry = SchemaRegistry::load_from_dir(&fixture_dir()).unwrap();
        assert!(registry.get_json_schema("study").is_ok());
        assert!(registry.get_xml_schema("study").is_ok());
    }

    #[test]
    fn unknown_schema_is_not_found() {
        let registry = SchemaRegistry::load_from_dir(&fixture_dir()).unwrap();
        assert!(matches!(
            registry.get_json_schema("not-a-real-type"),
            Err(SchemaError::SchemaNotFound(_))
        ));
    }
}
