//! Schema-driven intake form engine.
//!
//! A declarative schema (ordered sections of typed fields, dependency
//! predicates, bounded repeatable sections) is normalized once, then driven
//! through a [`FormSession`]: values are stored per field path, activity is
//! recomputed after every change, and [`FormSession::submit`] yields a flat,
//! deterministic [`SubmissionPayload`].
//!
//! ```text
//! YAML/JSON ─▶ normalize_schema ─▶ FormSchema ─▶ FormSession ─▶ SubmissionPayload
//!                                                  │
//!                        FormState + SectionInstantiator + ActivityResolver
//! ```
//!
//! The engine does no I/O. Sending a payload lives in `intake-client`.

pub mod builtin;
pub mod config;
pub mod dependency;
pub mod error;
pub mod instances;
pub mod schema;
pub mod serializer;
pub mod session;
pub mod state;

pub use config::{ConfigError, DependencyMode, EngineConfig, InitialInstances, KeyStyle};
pub use dependency::{dependency_satisfied, is_active, ActivityResolver};
pub use error::{FormError, InstanceError, SchemaError, SchemaErrorKind, SchemaLoadError};
pub use instances::SectionInstantiator;
pub use schema::{
    load_schema_json, load_schema_yaml, normalize_schema, FieldDef, FormSchema, NormalizeOptions,
    Normalized, Repeat, SchemaWarning, SectionDef,
};
pub use serializer::{serialize, SubmissionPayload, SubmissionSerializer};
pub use session::{
    EventOutcome, FieldView, FormChange, FormEvent, FormObserver, FormSession, FormView,
    InstanceView, SectionView,
};
pub use state::{FormState, InstanceKey, InstanceValues};

pub use form_types::{Dependency, FieldOption, FieldPath, FieldType, FieldValue};
