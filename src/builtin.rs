//! Bundled schemas.

use crate::error::SchemaLoadError;
use crate::schema::FormSchema;

/// Revocable Living Trust intake sheet (26 sections).
pub const TRUST_INTAKE_YAML: &str = include_str!("../schemas/trust_intake.yaml");

/// Parse and normalize the bundled trust intake schema.
pub fn trust_intake_schema() -> Result<FormSchema, SchemaLoadError> {
    FormSchema::from_yaml_str(TRUST_INTAKE_YAML)
}
