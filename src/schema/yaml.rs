use serde_json::Value;
use tracing::info;

use super::normalize::{normalize_schema, NormalizeOptions, Normalized};
use crate::error::SchemaLoadError;

/// Parse a YAML schema document and normalize it.
///
/// YAML is read into the same JSON value model the normalizer works on, so
/// both loaders enforce identical rules.
pub fn load_schema_yaml(text: &str, options: NormalizeOptions) -> Result<Normalized, SchemaLoadError> {
    let doc: Value = serde_yaml::from_str(text)?;
    load(doc, options)
}

/// Parse a JSON schema document and normalize it.
pub fn load_schema_json(text: &str, options: NormalizeOptions) -> Result<Normalized, SchemaLoadError> {
    let doc: Value = serde_json::from_str(text)?;
    load(doc, options)
}

fn load(doc: Value, options: NormalizeOptions) -> Result<Normalized, SchemaLoadError> {
    let normalized = normalize_schema(&doc, options)?;
    info!(
        sections = normalized.schema.len(),
        fields = normalized.schema.field_count(),
        warnings = normalized.warnings.len(),
        "form schema loaded"
    );
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaErrorKind;

    #[test]
    fn yaml_and_json_agree() {
        let yaml = r#"
- sectionTitle: Marriage Information
  fields:
    - name: maritalStatus
      type: radio
      options:
        - { value: married, label: Married }
        - { value: widowed, label: Widowed }
    - name: formerSpouseName
      type: text
      dependency:
        field: maritalStatus
        values: [widowed, divorced]
"#;
        let json = r#"[{"sectionTitle": "Marriage Information", "fields": [
            {"name": "maritalStatus", "type": "radio", "options": [
                {"value": "married", "label": "Married"},
                {"value": "widowed", "label": "Widowed"}]},
            {"name": "formerSpouseName", "type": "text",
             "dependency": {"field": "maritalStatus", "values": ["widowed", "divorced"]}}]}]"#;

        let from_yaml = load_schema_yaml(yaml, NormalizeOptions::default()).unwrap();
        let from_json = load_schema_json(json, NormalizeOptions::default()).unwrap();
        assert_eq!(from_yaml.schema, from_json.schema);
    }

    #[test]
    fn unquoted_yes_no_stay_strings() {
        let yaml = r#"
- fields:
    - name: living
      type: radio
      options: [{ value: yes }, { value: no }]
"#;
        let normalized = load_schema_yaml(yaml, NormalizeOptions::default()).unwrap();
        let options = &normalized.schema.section(0).unwrap().fields[0].options;
        assert_eq!(options[0].value, "yes");
        assert_eq!(options[1].value, "no");
    }

    #[test]
    fn parse_failure_is_not_a_schema_error() {
        let err = load_schema_yaml("- [unclosed", NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Yaml(_)));
    }

    #[test]
    fn invalid_schema_is_wrapped() {
        let err = load_schema_json(r#"{"sections": []}"#, NormalizeOptions::default()).unwrap_err();
        match err {
            SchemaLoadError::Invalid(e) => {
                assert!(matches!(e.kind, SchemaErrorKind::NotASequence { .. }))
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
