//! Form session.
//!
//! The explicit state object a renderer drives. Every mutation goes through the
//! session, is followed by a `recompute()` that rebuilds the [`FormView`], and
//! then notifies the registered observers. Nothing is reactive; a renderer
//! reads the view after each call.
//!
//! ```text
//! FormEvent ──apply──▶ set_value / add_instance / remove_instance
//!                          │
//!                          ▼
//!                     recompute() ──▶ FormView
//!                          │
//!                          ▼
//!                  observers.on_change(FormChange, &FormView)
//! ```

use std::sync::Arc;

use form_types::{FieldPath, FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dependency::ActivityResolver;
use crate::error::FormError;
use crate::instances::SectionInstantiator;
use crate::schema::FormSchema;
use crate::serializer::{SubmissionPayload, SubmissionSerializer};
use crate::state::FormState;

/// Receives a callback after every successful mutation.
pub trait FormObserver: Send {
    fn on_change(&mut self, change: &FormChange, view: &FormView);
}

/// What a mutation did.
#[derive(Debug, Clone, PartialEq)]
pub enum FormChange {
    ValueSet { path: FieldPath },
    InstanceAdded { section: usize, instance: usize },
    InstanceRemoved { section: usize, instance: usize },
}

/// User intent arriving from the rendering boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    SetValue { path: FieldPath, value: FieldValue },
    AddInstance { section: usize },
    RemoveInstance { section: usize, instance: usize },
}

/// Result of [`FormSession::apply`]. A rejected event changed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Rejected { message: String },
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied)
    }
}

/// Snapshot of everything a renderer needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormView {
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub index: usize,
    pub title: String,
    pub description: Option<String>,
    pub repeatable: bool,
    /// Whether the "add" control is enabled.
    pub can_add: bool,
    pub instances: Vec<InstanceView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceView {
    pub index: usize,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub path: FieldPath,
    pub label: String,
    pub field_type: FieldType,
    pub active: bool,
    pub value: FieldValue,
}

impl FormView {
    pub fn field(&self, path: &FieldPath) -> Option<&FieldView> {
        self.sections
            .get(path.section)?
            .instances
            .get(path.instance)?
            .fields
            .iter()
            .find(|f| f.path.field == path.field)
    }
}

pub struct FormSession {
    schema: Arc<FormSchema>,
    config: EngineConfig,
    state: FormState,
    instances: SectionInstantiator,
    view: FormView,
    observers: Vec<Box<dyn FormObserver>>,
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("sections", &self.schema.len())
            .field("config", &self.config)
            .field("entries", &self.state.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl FormSession {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self::with_config(schema, EngineConfig::default())
    }

    /// Open a session: load-time instances are created and the first view is
    /// computed before this returns.
    pub fn with_config(schema: Arc<FormSchema>, config: EngineConfig) -> Self {
        let mut state = FormState::new();
        let instances = SectionInstantiator::new(&schema, &mut state, config.initial_instances);
        let mut session = Self {
            schema,
            config,
            state,
            instances,
            view: FormView::default(),
            observers: Vec::new(),
        };
        session.recompute();
        session
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn view(&self) -> &FormView {
        &self.view
    }

    pub fn instance_count(&self, section: usize) -> usize {
        self.instances.instance_count(section)
    }

    pub fn can_add(&self, section: usize) -> bool {
        self.instances.can_add(&self.schema, section)
    }

    pub fn add_observer(&mut self, observer: Box<dyn FormObserver>) {
        self.observers.push(observer);
    }

    /// Store a value for a rendered field. Inactive fields accept values too;
    /// they are kept and reappear when the field is re-activated. Numbers must
    /// be finite.
    pub fn set_value(&mut self, path: FieldPath, value: FieldValue) -> Result<(), FormError> {
        if let FieldValue::Number(n) = value {
            if !n.is_finite() {
                return Err(FormError::NonFiniteNumber { path, value: n });
            }
        }
        let rendered = self.instances.contains(path.section, path.instance)
            && self
                .schema
                .section(path.section)
                .is_some_and(|s| s.field(&path.field).is_some());
        if !rendered {
            return Err(FormError::UnknownField { path });
        }

        self.state.set(path.clone(), value);
        self.commit(FormChange::ValueSet { path });
        Ok(())
    }

    pub fn add_instance(&mut self, section: usize) -> Result<usize, FormError> {
        let instance = self
            .instances
            .add_instance(&self.schema, &mut self.state, section)?;
        self.commit(FormChange::InstanceAdded { section, instance });
        Ok(instance)
    }

    pub fn remove_instance(&mut self, section: usize, instance: usize) -> Result<(), FormError> {
        self.instances
            .remove_instance(&self.schema, &mut self.state, section, instance)?;
        self.commit(FormChange::InstanceRemoved { section, instance });
        Ok(())
    }

    /// Run an event, turning any error into a rejection message.
    pub fn apply(&mut self, event: FormEvent) -> EventOutcome {
        let result = match event {
            FormEvent::SetValue { path, value } => self.set_value(path, value),
            FormEvent::AddInstance { section } => self.add_instance(section).map(|_| ()),
            FormEvent::RemoveInstance { section, instance } => {
                self.remove_instance(section, instance)
            }
        };
        match result {
            Ok(()) => EventOutcome::Applied,
            Err(e) => {
                warn!(error = %e, "form event rejected");
                EventOutcome::Rejected {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Active flag from the last recompute; `false` for unrendered paths.
    pub fn is_active(&self, path: &FieldPath) -> bool {
        self.view.field(path).is_some_and(|f| f.active)
    }

    /// Stored value, falling back to the field's default.
    pub fn value(&self, path: &FieldPath) -> Option<FieldValue> {
        let field = self.schema.section(path.section)?.field(&path.field)?;
        Some(self.state.get_or(path, field.default_value()))
    }

    /// Rebuild the view from schema + state.
    pub fn recompute(&mut self) {
        let schema = &self.schema;
        let mode = self.config.dependency_mode;
        let mut active_count = 0usize;

        let sections = schema
            .sections()
            .iter()
            .enumerate()
            .map(|(section_index, section)| {
                let resolver = ActivityResolver::new(section, mode);
                let instances = self
                    .state
                    .instances_of(section_index)
                    .map(|(instance_index, values)| {
                        let flags = resolver.resolve(values);
                        let fields = section
                            .fields
                            .iter()
                            .zip(flags)
                            .map(|(field, active)| {
                                active_count += usize::from(active);
                                FieldView {
                                    path: FieldPath::new(section_index, instance_index, &field.name),
                                    label: field.label.clone(),
                                    field_type: field.field_type,
                                    active,
                                    value: values
                                        .get(&field.name)
                                        .cloned()
                                        .unwrap_or_else(|| field.default_value()),
                                }
                            })
                            .collect();
                        InstanceView {
                            index: instance_index,
                            fields,
                        }
                    })
                    .collect();
                SectionView {
                    index: section_index,
                    title: section.title.clone(),
                    description: section.description.clone(),
                    repeatable: section.is_repeatable(),
                    can_add: self.instances.can_add(schema, section_index),
                    instances,
                }
            })
            .collect();

        self.view = FormView { sections };
        debug!(active = active_count, "form view recomputed");
    }

    /// Serialize the current state with the session's key style and
    /// dependency mode.
    pub fn payload(&self) -> SubmissionPayload {
        SubmissionSerializer::new(self.config.key_style, self.config.dependency_mode)
            .serialize(&self.schema, &self.state)
    }

    /// Finish the form. The session and its state are discarded.
    pub fn submit(self) -> SubmissionPayload {
        let payload = self.payload();
        debug!(entries = payload.len(), "form session submitted");
        payload
    }

    fn commit(&mut self, change: FormChange) {
        debug!(?change, "form change");
        self.recompute();
        for observer in &mut self.observers {
            observer.on_change(&change, &self.view);
        }
    }
}
