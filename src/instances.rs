//! Section instantiation.
//!
//! Tracks how many instances each section has and keeps the state store in
//! step: adding seeds every field of the new instance, removing deletes the
//! instance's entries and re-indexes the rest.
//!
//! Instance indices are positions, not identifiers. Removing instance 0 of
//! `[0, 1, 2]` leaves the former 1 and 2 addressed as 0 and 1, and payload keys
//! follow the new positions.

use tracing::debug;

use crate::config::InitialInstances;
use crate::error::InstanceError;
use crate::schema::{FormSchema, SectionDef};
use crate::state::{FormState, InstanceKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInstantiator {
    counts: Vec<usize>,
}

impl SectionInstantiator {
    /// Create the load-time instances: exactly one per non-repeatable section,
    /// and `initial` (capped at the bound) per repeatable section.
    pub fn new(schema: &FormSchema, state: &mut FormState, initial: InitialInstances) -> Self {
        let counts = schema
            .sections()
            .iter()
            .enumerate()
            .map(|(index, section)| {
                let count = if section.is_repeatable() {
                    initial.count().min(section.max_instances())
                } else {
                    1
                };
                for instance in 0..count {
                    state.seed_instance(InstanceKey::new(index, instance), &section.fields);
                }
                count
            })
            .collect();
        Self { counts }
    }

    pub fn instance_count(&self, section: usize) -> usize {
        self.counts.get(section).copied().unwrap_or(0)
    }

    pub fn contains(&self, section: usize, instance: usize) -> bool {
        instance < self.instance_count(section)
    }

    /// Whether another instance of `section` may be added.
    pub fn can_add(&self, schema: &FormSchema, section: usize) -> bool {
        schema
            .section(section)
            .is_some_and(|s| s.is_repeatable() && self.instance_count(section) < s.max_instances())
    }

    /// Append an instance with every field at its default and return its index.
    pub fn add_instance(
        &mut self,
        schema: &FormSchema,
        state: &mut FormState,
        section: usize,
    ) -> Result<usize, InstanceError> {
        let def = repeatable_section(schema, section)?;
        let count = self.instance_count(section);
        if count >= def.max_instances() {
            return Err(InstanceError::InstanceLimitReached {
                section,
                max: def.max_instances(),
            });
        }

        state.seed_instance(InstanceKey::new(section, count), &def.fields);
        self.counts[section] = count + 1;
        debug!(section, instance = count, "section instance added");
        Ok(count)
    }

    /// Delete an instance and all its state entries; later instances shift down.
    pub fn remove_instance(
        &mut self,
        schema: &FormSchema,
        state: &mut FormState,
        section: usize,
        instance: usize,
    ) -> Result<(), InstanceError> {
        repeatable_section(schema, section)?;
        if !self.contains(section, instance) {
            return Err(InstanceError::InstanceNotFound { section, instance });
        }

        state.remove_instance(section, instance);
        self.counts[section] -= 1;
        debug!(
            section,
            instance,
            remaining = self.counts[section],
            "section instance removed"
        );
        Ok(())
    }
}

fn repeatable_section(schema: &FormSchema, section: usize) -> Result<&SectionDef, InstanceError> {
    let def = schema
        .section(section)
        .ok_or(InstanceError::SectionNotFound { section })?;
    if !def.is_repeatable() {
        return Err(InstanceError::NotRepeatable { section });
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_types::{FieldPath, FieldValue};

    fn schema() -> FormSchema {
        FormSchema::from_yaml_str(
            r#"
- sectionTitle: Trust Type & Name
  fields:
    - name: desiredTrustName
- sectionTitle: Guardian Of Minor Children
  repeatable: true
  maxInstances: 2
  fields:
    - name: guardianFullNameAddress
      type: textarea
    - name: guardianRelationship
"#,
        )
        .unwrap()
    }

    #[test]
    fn load_time_instances() {
        let schema = schema();
        let mut state = FormState::new();
        let instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::None);
        assert_eq!(instances.instance_count(0), 1);
        assert_eq!(instances.instance_count(1), 0);
        assert_eq!(state.len(), 1);

        let mut state = FormState::new();
        let instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::One);
        assert_eq!(instances.instance_count(1), 1);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn add_until_limit() {
        let schema = schema();
        let mut state = FormState::new();
        let mut instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::None);

        assert_eq!(instances.add_instance(&schema, &mut state, 1), Ok(0));
        assert_eq!(instances.add_instance(&schema, &mut state, 1), Ok(1));
        assert!(!instances.can_add(&schema, 1));
        assert_eq!(
            instances.add_instance(&schema, &mut state, 1),
            Err(InstanceError::InstanceLimitReached { section: 1, max: 2 })
        );
        assert_eq!(instances.instance_count(1), 2);
        assert_eq!(
            state.get(&FieldPath::new(1, 1, "guardianRelationship")),
            Some(&FieldValue::text(""))
        );
    }

    #[test]
    fn non_repeatable_rejects_both_operations() {
        let schema = schema();
        let mut state = FormState::new();
        let mut instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::One);

        assert_eq!(
            instances.add_instance(&schema, &mut state, 0),
            Err(InstanceError::NotRepeatable { section: 0 })
        );
        assert_eq!(
            instances.remove_instance(&schema, &mut state, 0, 0),
            Err(InstanceError::NotRepeatable { section: 0 })
        );
        assert_eq!(instances.instance_count(0), 1);
    }

    #[test]
    fn unknown_section_and_instance() {
        let schema = schema();
        let mut state = FormState::new();
        let mut instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::One);

        assert_eq!(
            instances.add_instance(&schema, &mut state, 9),
            Err(InstanceError::SectionNotFound { section: 9 })
        );
        assert_eq!(
            instances.remove_instance(&schema, &mut state, 1, 1),
            Err(InstanceError::InstanceNotFound {
                section: 1,
                instance: 1
            })
        );
    }

    #[test]
    fn remove_deletes_entries_and_reindexes() {
        let schema = schema();
        let mut state = FormState::new();
        let mut instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::One);
        instances.add_instance(&schema, &mut state, 1).unwrap();
        state.set(FieldPath::new(1, 0, "guardianRelationship"), FieldValue::text("aunt"));
        state.set(FieldPath::new(1, 1, "guardianRelationship"), FieldValue::text("uncle"));

        instances.remove_instance(&schema, &mut state, 1, 0).unwrap();

        assert_eq!(instances.instance_count(1), 1);
        assert_eq!(
            state.get(&FieldPath::new(1, 0, "guardianRelationship")),
            Some(&FieldValue::text("uncle"))
        );
        assert!(state.instance(1, 1).is_none());
        // removing the last one is allowed; count never goes negative
        instances.remove_instance(&schema, &mut state, 1, 0).unwrap();
        assert_eq!(instances.instance_count(1), 0);
        assert!(instances.remove_instance(&schema, &mut state, 1, 0).is_err());
    }
}
