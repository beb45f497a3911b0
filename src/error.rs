//! Typed error model for the form engine.
//!
//! ```text
//! load time   → SchemaError (fatal, blocks rendering)
//! user action → InstanceError | FormError (recoverable, no-op + message)
//! dependency  → never an error; unknown fields resolve to inactive
//! ```
//!
//! `thiserror` for every enum, no manual `Display` impls.

use form_types::FieldPath;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SchemaError
// ---------------------------------------------------------------------------

/// A schema document that cannot be normalized. Carries the failure kind and
/// the document location that produced it (e.g. `sections[5].fields[2]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub location: String,
}

impl SchemaError {
    pub fn new(kind: SchemaErrorKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }
}

/// Every way a schema document can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error_kind", rename_all = "snake_case")]
pub enum SchemaErrorKind {
    /// The document (or one of its elements) is not a section object sequence.
    #[error("expected a non-empty sequence of section objects, found {found}")]
    NotASequence { found: String },

    #[error("section '{section}' has no `fields` sequence")]
    MissingFields { section: String },

    #[error("repeatable section '{section}' needs a positive integer `maxInstances`, found {found}")]
    InvalidRepeatableBound { section: String, found: String },

    #[error("field '{field}' has unknown type '{found}'")]
    UnknownFieldType { field: String, found: String },

    #[error("field name '{field}' appears more than once in section '{section}'")]
    DuplicateFieldName { section: String, field: String },

    /// Only produced when strict dependency checking is enabled.
    #[error("field '{field}' depends on '{target}', which is not declared in the same section")]
    UnknownDependencyField { field: String, target: String },
}

/// Failure to turn schema text into a normalized schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("schema YAML could not be parsed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("schema JSON could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema is invalid: {0}")]
    Invalid(#[from] SchemaError),
}

// ---------------------------------------------------------------------------
// Per-operation errors
// ---------------------------------------------------------------------------

/// Rejections from the section instantiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error_kind", rename_all = "snake_case")]
pub enum InstanceError {
    #[error("section {section} already has the maximum of {max} instances")]
    InstanceLimitReached { section: usize, max: usize },

    #[error("section {section} has no instance {instance}")]
    InstanceNotFound { section: usize, instance: usize },

    #[error("section {section} is not repeatable")]
    NotRepeatable { section: usize },

    #[error("schema has no section {section}")]
    SectionNotFound { section: usize },
}

/// Errors surfaced by a form session for a single user action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("no rendered field at {path}")]
    UnknownField { path: FieldPath },

    /// NaN and infinities have no JSON form.
    #[error("{path}: number must be finite, got {value}")]
    NonFiniteNumber { path: FieldPath, value: f64 },
}
