//! Form Types - Foundation Types for the Intake Form Engine
//!
//! Pure data structures shared by the engine, the submission client and the
//! CLI. This crate depends on nothing else in the workspace.
//!
//! ## Contents
//!
//! - Field types (the closed set a schema may use)
//! - Options and dependency predicates as they appear in schema documents
//! - Field values held by the form state store
//! - Field paths addressing one value in a form
//!
//! ## Rules
//!
//! 1. **NO ENGINE LOGIC** - resolution, instantiation and serialization live in `intake-form`
//! 2. **SERIALIZABLE** - every type round-trips through serde
//! 3. **NO WORKSPACE DEPENDENCIES**

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FIELD TYPES
// ============================================================================

/// The closed set of input types a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Tel,
    Email,
    Date,
    Textarea,
    Radio,
    Checkbox,
    Select,
}

impl FieldType {
    /// Every accepted type, in documentation order.
    pub const ALL: [FieldType; 9] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Tel,
        FieldType::Email,
        FieldType::Date,
        FieldType::Textarea,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Select,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Tel => "tel",
            FieldType::Email => "email",
            FieldType::Date => "date",
            FieldType::Textarea => "textarea",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
        }
    }

    /// Radio, checkbox and select fields choose from a declared option list.
    pub fn uses_options(&self) -> bool {
        matches!(
            self,
            FieldType::Radio | FieldType::Checkbox | FieldType::Select
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a type name is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type '{0}'")]
pub struct FieldTypeError(pub String);

impl FromStr for FieldType {
    type Err = FieldTypeError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| FieldTypeError(s.to_string()))
    }
}

// ============================================================================
// OPTIONS AND DEPENDENCIES
// ============================================================================

/// One selectable (value, label) pair of a radio, checkbox or select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Predicate over another field of the same section instance.
///
/// Serialized exactly as schema documents write it:
/// `{field: X, value: V}` or `{field: X, values: [V1, V2]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    /// Active when the controlling field is one of `values`.
    OneOf { field: String, values: Vec<String> },
    /// Active when the controlling field equals `value`.
    Equals { field: String, value: String },
}

impl Dependency {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Dependency::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dependency::OneOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Name of the controlling field.
    pub fn field(&self) -> &str {
        match self {
            Dependency::OneOf { field, .. } | Dependency::Equals { field, .. } => field,
        }
    }

    /// Whether `candidate` is an accepted value of the controlling field.
    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            Dependency::Equals { value, .. } => value == candidate,
            Dependency::OneOf { values, .. } => values.iter().any(|v| v == candidate),
        }
    }
}

// ============================================================================
// FIELD VALUES
// ============================================================================

/// A value held by the form state store.
///
/// Coercion from raw UI input (checkbox booleans, number parsing) is the
/// rendering layer's job; the store keeps whatever it is given. Form sessions
/// refuse non-finite numbers, which serde_json would write as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Selected option values of a checkbox field with options.
    Selection(BTreeSet<String>),
}

impl FieldValue {
    /// The empty default for a field of type `field_type`.
    ///
    /// `has_options` distinguishes a single boolean checkbox from a
    /// multi-option checkbox group.
    pub fn default_for(field_type: FieldType, has_options: bool) -> Self {
        match field_type {
            FieldType::Checkbox if has_options => FieldValue::Selection(BTreeSet::new()),
            FieldType::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn selection<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Selection(values.into_iter().map(Into::into).collect())
    }

    /// String form used for dependency comparisons.
    ///
    /// Numbers render in their shortest display form (`5`, `2.5`), booleans as
    /// `true`/`false`. Selections have no single string form.
    pub fn as_match_str(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            FieldValue::Number(n) => Some(Cow::Owned(n.to_string())),
            FieldValue::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            FieldValue::Selection(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

// ============================================================================
// FIELD PATHS
// ============================================================================

/// Address of one value: `(section index, instance index, field name)`.
///
/// Instance indices are positions. Removing an instance shifts the ones after
/// it down by one, so a path is only meaningful against the current state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath {
    pub section: usize,
    pub instance: usize,
    pub field: String,
}

impl FieldPath {
    pub fn new(section: usize, instance: usize, field: impl Into<String>) -> Self {
        Self {
            section,
            instance,
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.section, self.instance, self.field)
    }
}
