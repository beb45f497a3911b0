//! Normalized form schema.
//!
//! A [`FormSchema`] only comes out of [`normalize_schema`] (directly or via the
//! YAML/JSON loaders), so every tree in memory has passed validation and has
//! its optional attributes defaulted. Rendering never re-validates.

mod normalize;
mod yaml;

pub use normalize::{normalize_schema, NormalizeOptions, Normalized, SchemaWarning};
pub use yaml::{load_schema_json, load_schema_yaml};

use form_types::{Dependency, FieldOption, FieldType, FieldValue};
use serde_json::{Map, Value};

use crate::error::SchemaLoadError;

/// Ordered sections. Position defines payload ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    sections: Vec<SectionDef>,
}

/// Whether a section renders once or as a bounded list of instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Single,
    Bounded { max_instances: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDef {
    pub title: String,
    pub description: Option<String>,
    pub repeat: Repeat,
    /// Shared by every instance of the section.
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    /// Helper text shown under the input.
    pub description: Option<String>,
    /// Empty unless `field_type` uses options.
    pub options: Vec<FieldOption>,
    pub dependency: Option<Dependency>,
}

impl FormSchema {
    pub(crate) fn from_sections(sections: Vec<SectionDef>) -> Self {
        Self { sections }
    }

    /// Parse and normalize a YAML schema document, logging any warnings.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaLoadError> {
        Ok(load_schema_yaml(text, NormalizeOptions::default())?.schema)
    }

    pub fn sections(&self) -> &[SectionDef] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&SectionDef> {
        self.sections.get(index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Field definitions across all sections (not counting instances).
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// Export as a schema document in the same shape the normalizer accepts.
    ///
    /// Normalizing the exported document yields a tree equal to `self`.
    pub fn to_document(&self) -> Value {
        Value::Array(self.sections.iter().map(SectionDef::to_document).collect())
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_document())
    }
}

impl SectionDef {
    pub fn is_repeatable(&self) -> bool {
        matches!(self.repeat, Repeat::Bounded { .. })
    }

    /// Upper bound on instances; 1 for non-repeatable sections.
    pub fn max_instances(&self) -> usize {
        match self.repeat {
            Repeat::Single => 1,
            Repeat::Bounded { max_instances } => max_instances,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("sectionTitle".into(), Value::String(self.title.clone()));
        if let Some(description) = &self.description {
            doc.insert("description".into(), Value::String(description.clone()));
        }
        if let Repeat::Bounded { max_instances } = self.repeat {
            doc.insert("repeatable".into(), Value::Bool(true));
            doc.insert("maxInstances".into(), Value::from(max_instances));
        }
        doc.insert(
            "fields".into(),
            Value::Array(self.fields.iter().map(FieldDef::to_document).collect()),
        );
        Value::Object(doc)
    }
}

impl FieldDef {
    /// A checkbox with options holds a set of selected values.
    pub fn is_multi_choice(&self) -> bool {
        self.field_type == FieldType::Checkbox && !self.options.is_empty()
    }

    /// The value a freshly created instance stores for this field.
    pub fn default_value(&self) -> FieldValue {
        FieldValue::default_for(self.field_type, !self.options.is_empty())
    }

    fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("name".into(), Value::String(self.name.clone()));
        doc.insert("label".into(), Value::String(self.label.clone()));
        doc.insert("type".into(), Value::String(self.field_type.as_str().into()));
        if let Some(description) = &self.description {
            doc.insert("description".into(), Value::String(description.clone()));
        }
        if !self.options.is_empty() {
            let options = self
                .options
                .iter()
                .map(|o| {
                    let mut opt = Map::new();
                    opt.insert("value".into(), Value::String(o.value.clone()));
                    opt.insert("label".into(), Value::String(o.label.clone()));
                    Value::Object(opt)
                })
                .collect();
            doc.insert("options".into(), Value::Array(options));
        }
        if let Some(dependency) = &self.dependency {
            let mut dep = Map::new();
            dep.insert("field".into(), Value::String(dependency.field().to_string()));
            match dependency {
                Dependency::Equals { value, .. } => {
                    dep.insert("value".into(), Value::String(value.clone()));
                }
                Dependency::OneOf { values, .. } => {
                    dep.insert(
                        "values".into(),
                        Value::Array(values.iter().cloned().map(Value::String).collect()),
                    );
                }
            }
            doc.insert("dependency".into(), Value::Object(dep));
        }
        Value::Object(doc)
    }
}
