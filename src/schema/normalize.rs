//! Schema validation and normalization.
//!
//! Runs once per schema load. Fatal problems become a [`SchemaError`]; problems
//! the form can live with become [`SchemaWarning`]s and are logged.
//!
//! Defaults applied:
//! - section title → `Section {index}`
//! - field name → `field-{index}`, label → name, type → `text`
//! - options → empty (and dropped for types that do not use them)
//! - option label → option value
//! - malformed dependency → `{field, values: []}`, which never activates

use std::collections::HashSet;

use form_types::{Dependency, FieldOption, FieldType};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{FieldDef, FormSchema, Repeat, SectionDef};
use crate::config::EngineConfig;
use crate::error::{SchemaError, SchemaErrorKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Reject dependencies on fields not declared in the same section.
    pub strict_dependencies: bool,
}

impl From<&EngineConfig> for NormalizeOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            strict_dependencies: config.strict_dependencies,
        }
    }
}

/// A non-fatal finding about a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaWarning {
    pub location: String,
    pub message: String,
}

impl SchemaWarning {
    fn new(location: &str, message: impl Into<String>) -> Self {
        Self {
            location: location.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.location, self.message)
    }
}

/// Result of a successful normalization pass.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub schema: FormSchema,
    pub warnings: Vec<SchemaWarning>,
}

/// Validate a schema document and build the normalized tree.
pub fn normalize_schema(doc: &Value, options: NormalizeOptions) -> Result<Normalized, SchemaError> {
    let raw_sections = match doc {
        Value::Array(items) if !items.is_empty() => items,
        Value::Array(_) => {
            return Err(SchemaError::new(
                SchemaErrorKind::NotASequence {
                    found: "an empty sequence".into(),
                },
                "schema",
            ))
        }
        other => {
            return Err(SchemaError::new(
                SchemaErrorKind::NotASequence {
                    found: describe(other).into(),
                },
                "schema",
            ))
        }
    };

    let mut warnings = Vec::new();
    let mut sections = Vec::with_capacity(raw_sections.len());
    for (index, raw) in raw_sections.iter().enumerate() {
        sections.push(normalize_section(index, raw, options, &mut warnings)?);
    }

    for warning in &warnings {
        warn!(location = %warning.location, "schema warning: {}", warning.message);
    }
    debug!(
        sections = sections.len(),
        warnings = warnings.len(),
        "schema normalized"
    );

    Ok(Normalized {
        schema: FormSchema::from_sections(sections),
        warnings,
    })
}

fn normalize_section(
    index: usize,
    raw: &Value,
    options: NormalizeOptions,
    warnings: &mut Vec<SchemaWarning>,
) -> Result<SectionDef, SchemaError> {
    let location = format!("sections[{index}]");
    let obj = raw.as_object().ok_or_else(|| {
        SchemaError::new(
            SchemaErrorKind::NotASequence {
                found: format!("{} at position {index}", describe(raw)),
            },
            &location,
        )
    })?;

    let title = text_attr(obj, "sectionTitle")
        .or_else(|| text_attr(obj, "title"))
        .unwrap_or_else(|| format!("Section {index}"));
    let description = text_attr(obj, "description");

    let raw_fields = match obj.get("fields") {
        Some(Value::Array(fields)) => fields,
        _ => {
            return Err(SchemaError::new(
                SchemaErrorKind::MissingFields { section: title },
                &location,
            ))
        }
    };

    let repeat = if obj.get("repeatable").and_then(Value::as_bool).unwrap_or(false) {
        let bound = obj
            .get("maxInstances")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .and_then(|n| usize::try_from(n).ok());
        match bound {
            Some(max_instances) => Repeat::Bounded { max_instances },
            None => {
                let found = obj
                    .get("maxInstances")
                    .map(Value::to_string)
                    .unwrap_or_else(|| "nothing".into());
                return Err(SchemaError::new(
                    SchemaErrorKind::InvalidRepeatableBound {
                        section: title,
                        found,
                    },
                    &location,
                ));
            }
        }
    } else {
        Repeat::Single
    };

    let mut fields: Vec<FieldDef> = Vec::with_capacity(raw_fields.len());
    let mut seen: HashSet<String> = HashSet::new();
    for (field_index, raw_field) in raw_fields.iter().enumerate() {
        let field_location = format!("{location}.fields[{field_index}]");
        let Some(field_obj) = raw_field.as_object() else {
            warnings.push(SchemaWarning::new(
                &field_location,
                format!("skipped {} where a field object was expected", describe(raw_field)),
            ));
            continue;
        };

        let field = normalize_field(field_index, field_obj, &field_location, warnings)?;
        if !seen.insert(field.name.clone()) {
            return Err(SchemaError::new(
                SchemaErrorKind::DuplicateFieldName {
                    section: title,
                    field: field.name,
                },
                &field_location,
            ));
        }
        fields.push(field);
    }

    // Dependencies are checked once the whole field list is known; a field may
    // depend on one declared after it.
    for field in &fields {
        let Some(dependency) = &field.dependency else {
            continue;
        };
        if seen.contains(dependency.field()) {
            continue;
        }
        if options.strict_dependencies {
            return Err(SchemaError::new(
                SchemaErrorKind::UnknownDependencyField {
                    field: field.name.clone(),
                    target: dependency.field().to_string(),
                },
                &location,
            ));
        }
        warnings.push(SchemaWarning::new(
            &location,
            format!(
                "field '{}' depends on undeclared field '{}' and will never be active",
                field.name,
                dependency.field()
            ),
        ));
    }

    Ok(SectionDef {
        title,
        description,
        repeat,
        fields,
    })
}

fn normalize_field(
    index: usize,
    obj: &Map<String, Value>,
    location: &str,
    warnings: &mut Vec<SchemaWarning>,
) -> Result<FieldDef, SchemaError> {
    let name = text_attr(obj, "name").unwrap_or_else(|| format!("field-{index}"));
    let label = text_attr(obj, "label").unwrap_or_else(|| name.clone());

    let field_type = match obj.get("type").and_then(scalar_string) {
        None => FieldType::Text,
        Some(raw) if raw.is_empty() => FieldType::Text,
        Some(raw) => raw.parse::<FieldType>().map_err(|_| {
            SchemaError::new(
                SchemaErrorKind::UnknownFieldType {
                    field: name.clone(),
                    found: raw.clone(),
                },
                location,
            )
        })?,
    };
    if matches!(obj.get("type"), Some(Value::Array(_) | Value::Object(_))) {
        return Err(SchemaError::new(
            SchemaErrorKind::UnknownFieldType {
                field: name,
                found: "a structured value".into(),
            },
            location,
        ));
    }

    let description = text_attr(obj, "description");

    let options = if field_type.uses_options() {
        normalize_options(obj.get("options"), location, warnings)
    } else {
        if obj.get("options").is_some_and(|o| !o.is_null()) {
            debug!(%location, field_type = %field_type, "options ignored for this field type");
        }
        Vec::new()
    };
    if options.is_empty() && matches!(field_type, FieldType::Radio | FieldType::Select) {
        warnings.push(SchemaWarning::new(
            location,
            format!("{field_type} field '{name}' declares no options"),
        ));
    }

    let dependency = match obj.get("dependency") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(normalize_dependency(raw, location, warnings)),
    };

    Ok(FieldDef {
        name,
        label,
        field_type,
        description,
        options,
        dependency,
    })
}

fn normalize_options(
    raw: Option<&Value>,
    location: &str,
    warnings: &mut Vec<SchemaWarning>,
) -> Vec<FieldOption> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warnings.push(SchemaWarning::new(
                location,
                format!("`options` should be a sequence, found {}", describe(other)),
            ));
            return Vec::new();
        }
    };

    let mut options = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            warnings.push(SchemaWarning::new(
                &format!("{location}.options[{i}]"),
                format!("skipped {} where an option object was expected", describe(item)),
            ));
            continue;
        };
        let value = obj.get("value").and_then(scalar_string).unwrap_or_default();
        let label = text_attr(obj, "label").unwrap_or_else(|| value.clone());
        options.push(FieldOption { value, label });
    }
    options
}

fn normalize_dependency(raw: &Value, location: &str, warnings: &mut Vec<SchemaWarning>) -> Dependency {
    let target = raw
        .get("field")
        .and_then(scalar_string)
        .filter(|f| !f.is_empty());

    match (target, raw.get("values"), raw.get("value")) {
        (Some(field), Some(Value::Array(values)), _) => Dependency::OneOf {
            field,
            values: values.iter().filter_map(scalar_string).collect(),
        },
        (Some(field), None, Some(value)) if scalar_string(value).is_some() => Dependency::Equals {
            field,
            value: scalar_string(value).unwrap_or_default(),
        },
        (target, _, _) => {
            warnings.push(SchemaWarning::new(
                location,
                "malformed dependency; the field will never be active",
            ));
            Dependency::OneOf {
                field: target.unwrap_or_default(),
                values: Vec::new(),
            }
        }
    }
}

/// Trimmed, non-empty string form of a scalar attribute.
fn text_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_string).filter(|s| !s.is_empty())
}

/// String form of a scalar, trimmed. Numbers use the same rendering the
/// dependency resolver applies to stored numbers.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        Value::Number(n) => n.as_f64().map(|f| f.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
