//! Form state store.
//!
//! The single source of truth for entered values: an ordered map from
//! `(section, instance)` to that instance's values, each instance keeping its
//! fields in schema-declared order. `BTreeMap` keeps iteration deterministic;
//! instance buckets are seeded with every field when the instance is created,
//! so insertion order within a bucket is declaration order.

use std::collections::BTreeMap;

use form_types::{FieldPath, FieldValue};
use tracing::trace;

use crate::schema::FieldDef;

/// Key of one section instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub section: usize,
    pub instance: usize,
}

impl InstanceKey {
    pub fn new(section: usize, instance: usize) -> Self {
        Self { section, instance }
    }

    pub fn path(&self, field: impl Into<String>) -> FieldPath {
        FieldPath::new(self.section, self.instance, field)
    }
}

/// Values of one section instance, in field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceValues {
    entries: Vec<(String, FieldValue)>,
}

impl InstanceValues {
    /// Every field of the section at its default value.
    pub fn seeded(fields: &[FieldDef]) -> Self {
        Self {
            entries: fields
                .iter()
                .map(|f| (f.name.clone(), f.default_value()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Overwrite an existing entry, or append a new one.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + Clone + '_ {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    instances: BTreeMap<InstanceKey, InstanceValues>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.instances
            .get(&InstanceKey::new(path.section, path.instance))
            .and_then(|values| values.get(&path.field))
    }

    /// The stored value, or `default` when the path has no entry.
    pub fn get_or(&self, path: &FieldPath, default: FieldValue) -> FieldValue {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Store `value` at `path`, overwriting any existing entry. Never fails;
    /// type coercion is the caller's responsibility.
    pub fn set(&mut self, path: FieldPath, value: FieldValue) {
        trace!(%path, ?value, "set field value");
        self.instances
            .entry(InstanceKey::new(path.section, path.instance))
            .or_default()
            .set(path.field, value);
    }

    pub fn instance(&self, section: usize, instance: usize) -> Option<&InstanceValues> {
        self.instances.get(&InstanceKey::new(section, instance))
    }

    /// Instances of one section in index order.
    pub fn instances_of(&self, section: usize) -> impl Iterator<Item = (usize, &InstanceValues)> + '_ {
        self.instances
            .range(InstanceKey::new(section, 0)..=InstanceKey::new(section, usize::MAX))
            .map(|(key, values)| (key.instance, values))
    }

    /// Create (or reset) an instance with every field at its default.
    pub fn seed_instance(&mut self, key: InstanceKey, fields: &[FieldDef]) {
        self.instances.insert(key, InstanceValues::seeded(fields));
    }

    /// Delete an instance and every entry under it, then shift the later
    /// instances of the same section down by one so indices stay contiguous.
    pub fn remove_instance(&mut self, section: usize, instance: usize) -> Option<InstanceValues> {
        let removed = self.instances.remove(&InstanceKey::new(section, instance))?;

        let later: Vec<InstanceKey> = self
            .instances
            .range(InstanceKey::new(section, instance)..=InstanceKey::new(section, usize::MAX))
            .map(|(key, _)| *key)
            .collect();
        for key in later {
            if let Some(values) = self.instances.remove(&key) {
                self.instances
                    .insert(InstanceKey::new(section, key.instance - 1), values);
            }
        }
        Some(removed)
    }

    /// Lazy `(path, value)` sequence in section/instance/field order.
    ///
    /// Each call starts over, and the returned iterator can be cloned to replay
    /// from its current position.
    pub fn values(&self) -> impl Iterator<Item = (FieldPath, &FieldValue)> + Clone + '_ {
        self.instances.iter().flat_map(|(key, values)| {
            values
                .entries
                .iter()
                .map(move |(name, value)| (key.path(name.as_str()), value))
        })
    }

    /// Number of stored entries across all instances.
    pub fn len(&self) -> usize {
        self.instances.values().map(InstanceValues::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
