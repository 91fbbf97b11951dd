use serde_json::Value;

use crate::registry::{SchemaError, SchemaRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub reason: String,
    /// JSON pointer-ish path to the offending field; empty when the
    /// failure concerns the document's overall shape rather than one
    /// field.
    pub instance_path: String,
}

impl ValidationError {
    pub fn is_field_error(&self) -> bool {
        !self.instance_path.is_empty()
    }
}

/// Applies `default` values declared in object-schema `properties` to the
/// instance in place, recursing into nested objects/arrays, mirroring the
/// `extend_with_default` validator wrapper this is ported from.
fn apply_defaults(schema: &Value, instance: &mut Value) {
    let Some(schema_obj) = schema.as_object() else {
        return;
    };

    if let (Some(properties), Value::Object(instance_map)) =
        (schema_obj.get("properties").and_then(Value::as_object), &mut *instance)
    {
        for (prop, subschema) in properties {
            if let Some(default) = subschema.get("default") {
                instance_map.entry(prop.clone()).or_insert_with(|| default.clone());
            }
        }
        for (prop, subschema) in properties {
            if let Some(value) = instance_map.get_mut(prop) {
                apply_defaults(subschema, value);
            }
        }
    }

    if let (Some(items_schema), Value::Array(items)) = (schema_obj.get("items"), &mut *instance) {
        for item in items {
            apply_defaults(items_schema, item);
        }
    }
}

/// Validates `payload` against the named JSON schema, applying schema
/// defaults first. Returns the first validation failure encountered.
pub fn validate_json(
    registry: &SchemaRegistry,
    schema_type: &str,
    payload: &mut Value,
) -> Result<(), ValidationOutcome> {
    let schema = registry
        .get_json_schema(schema_type)
        .map_err(ValidationOutcome::SchemaError)?;

    apply_defaults(schema, payload);

    let compiled = jsonschema::JSONSchema::compile(schema)
        .expect("bundled JSON schemas are compiled into the binary and must be valid");

    if let Err(mut errors) = compiled.validate(payload) {
        if let Some(error) = errors.next() {
            let path_segments: Vec<String> = error.instance_path.iter().map(|s| s.to_string()).collect();
            let reason = if !path_segments.is_empty() {
                format!(
                    "Provided input does not seem correct for field: '{}'",
                    path_segments[0]
                )
            } else {
                format!("Provided input does not seem correct because: '{error}'")
            };
            return Err(ValidationOutcome::Invalid(ValidationError {
                reason,
                instance_path: path_segments.join("."),
            }));
        }
    }

    Ok(())
}

#[derive(Debug)]
pub enum ValidationOutcome {
    SchemaError(SchemaError),
    Invalid(ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct XmlValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<XmlValidationDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct XmlValidationDetail {
    pub reason: String,
    pub instance: String,
}

/// Validates `text` against the named XML schema descriptor. Structural
/// errors (parse failures, missing required elements) carry the source
/// line number of the offending element, located by the first
/// not-yet-used occurrence of its tag name in the original text --
/// mirroring `XMLValidator._format_xml_validation_error_reason`.
pub fn validate_xml(
    registry: &SchemaRegistry,
    schema_type: &str,
    text: &str,
) -> Result<XmlValidationResult, SchemaError> {
    let schema = registry.get_xml_schema(schema_type)?;
    let lines: Vec<&str> = text.lines().collect();
    let mut found_lines: Vec<usize> = Vec::new();

    let mut locate = |tag: &str| -> Option<usize> {
        for (i, line) in lines.iter().enumerate() {
            let line_no = i + 1;
            if line.contains(tag) && !found_lines.contains(&line_no) {
                found_lines.push(line_no);
                return Some(line_no);
            }
        }
        None
    };

    let mut reader = quick_xml::Reader::from_str(text);
    reader.trim_text(true);

    let mut root_seen: Option<String> = None;
    let mut present_elements: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(ref e)) | Ok(quick_xml::events::Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if root_seen.is_none() {
                    root_seen = Some(name.clone());
                }
                present_elements.push(name);
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let position = reader.buffer_position();
                let line = byte_offset_to_line(text, position);
                let instance = lines.get(line.saturating_sub(1)).copied().unwrap_or_default();
                return Ok(XmlValidationResult {
                    valid: false,
                    detail: Some(XmlValidationDetail {
                        reason: format!("Faulty XML file was given, {err} (line {line})"),
                        instance: instance.trim().to_string(),
                    }),
                });
            }
        }
        buf.clear();
    }

    let Some(root) = root_seen else {
        return Ok(XmlValidationResult {
            valid: false,
            detail: Some(XmlValidationDetail {
                reason: "document has no root element".to_string(),
                instance: String::new(),
            }),
        });
    };

    if !root.eq_ignore_ascii_case(&schema.root) {
        let root_line = locate(&root).unwrap_or(1);
        return Ok(XmlValidationResult {
            valid: false,
            detail: Some(XmlValidationDetail {
                reason: format!(
                    "root element '{root}' does not match expected '{}' (line {root_line})",
                    schema.root
                ),
                instance: lines.get(root_line - 1).copied().unwrap_or_default().trim().to_string(),
            }),
        });
    }

    let mut reasons = Vec::new();
    let mut instances = Vec::new();
    for required in &schema.required_elements {
        if !present_elements.iter().any(|e| e.eq_ignore_ascii_case(required)) {
            let line = locate(&root).unwrap_or(1);
            reasons.push(format!("missing required element '{required}' (line {line})"));
            instances.push(lines.get(line - 1).copied().unwrap_or_default().trim().to_string());
        }
    }

    if reasons.is_empty() {
        Ok(XmlValidationResult { valid: true, detail: None })
    } else {
        Ok(XmlValidationResult {
            valid: false,
            detail: Some(XmlValidationDetail {
                reason: reasons.join("\n"),
                instance: instances.join("\n"),
            }),
        })
    }
}

fn byte_offset_to_line(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn registry() -> SchemaRegistry {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/schemas");
        SchemaRegistry::load_from_dir(&dir).unwrap()
    }

    #[test]
    fn missing_required_field_reports_field_path() {
        let mut payload = serde_json::json!({});
        let err = validate_json(&registry(), "study", &mut payload).unwrap_err();
        match err {
            ValidationOutcome::Invalid(e) => assert!(e.is_field_error() || !e.reason.is_empty()),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_applied_before_validation() {
        let mut payload = serde_json::json!({"descriptor": {"studyTitle": "t", "studyAbstract": "a"}});
        let result = validate_json(&registry(), "study", &mut payload);
        assert!(result.is_ok(), "{result:?}");
        assert_eq!(payload["descriptor"]["studyType"], serde_json::json!("Other"));
    }

    #[test]
    fn valid_xml_round_trips() {
        let xml = "<STUDY><DESCRIPTOR><STUDY_TITLE>t</STUDY_TITLE></DESCRIPTOR></STUDY>";
        let result = validate_xml(&registry(), "study", xml).unwrap();
        assert!(result.valid);
    }

    #[test]
    fn missing_required_element_reports_line_number() {
        let xml = "<STUDY>\n  <DESCRIPTOR></DESCRIPTOR>\n</STUDY>";
        let result = validate_xml(&registry(), "study", xml).unwrap();
        assert!(!result.valid);
        let detail = result.detail.unwrap();
        assert!(detail.reason.contains("(line 1)"));
    }

    #[test]
    fn malformed_xml_reports_parse_error_with_line() {
        let xml = "<STUDY><DESCRIPTOR></STUDY>";
        let result = validate_xml(&registry(), "study", xml).unwrap();
        assert!(!result.valid);
    }
}
