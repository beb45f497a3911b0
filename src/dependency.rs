//! Dependency resolution.
//!
//! Decides whether a field is active (visible and included in the payload)
//! from the values of its own section instance. Lookups never leave the
//! instance, and a predicate naming a field the section does not declare is
//! unsatisfied even if the store holds a value under that name. Resolution
//! never fails.

use form_types::{Dependency, FieldValue};

use crate::config::DependencyMode;
use crate::schema::{FieldDef, SectionDef};
use crate::state::InstanceValues;

/// Whether `field` is active given the values of its section instance.
///
/// No dependency → active. Otherwise the controlling field must be declared
/// in `section` and its stored value must satisfy the predicate (compared in
/// string form).
pub fn is_active(section: &SectionDef, field: &FieldDef, instance: &InstanceValues) -> bool {
    match &field.dependency {
        None => true,
        Some(dependency) => {
            section.field(dependency.field()).is_some() && dependency_satisfied(dependency, instance)
        }
    }
}

/// Evaluate a predicate against an instance's stored values.
pub fn dependency_satisfied(dependency: &Dependency, instance: &InstanceValues) -> bool {
    match instance.get(dependency.field()) {
        None => false,
        Some(value) => value_satisfies(dependency, value),
    }
}

fn value_satisfies(dependency: &Dependency, value: &FieldValue) -> bool {
    match value {
        FieldValue::Selection(selected) => selected.iter().any(|v| dependency.accepts(v)),
        other => other
            .as_match_str()
            .is_some_and(|s| dependency.accepts(s.as_ref())),
    }
}

/// Resolves activity for every field of a section instance at once.
pub struct ActivityResolver<'a> {
    section: &'a SectionDef,
    mode: DependencyMode,
}

impl<'a> ActivityResolver<'a> {
    pub fn new(section: &'a SectionDef, mode: DependencyMode) -> Self {
        Self { section, mode }
    }

    /// One flag per field of the section, in declaration order.
    pub fn resolve(&self, instance: &InstanceValues) -> Vec<bool> {
        match self.mode {
            DependencyMode::Direct => self
                .section
                .fields
                .iter()
                .map(|f| is_active(self.section, f, instance))
                .collect(),
            DependencyMode::Transitive => {
                let mut memo: Vec<Resolution> = vec![Resolution::Pending; self.section.fields.len()];
                (0..self.section.fields.len())
                    .map(|i| self.resolve_chain(i, instance, &mut memo))
                    .collect()
            }
        }
    }

    /// A field is active when its predicate holds and its controlling field
    /// is itself active. A cycle resolves to inactive.
    fn resolve_chain(&self, index: usize, instance: &InstanceValues, memo: &mut [Resolution]) -> bool {
        match memo[index] {
            Resolution::Done(active) => return active,
            Resolution::Visiting => return false,
            Resolution::Pending => {}
        }
        memo[index] = Resolution::Visiting;

        let field = &self.section.fields[index];
        let active = match &field.dependency {
            None => true,
            Some(dependency) => {
                dependency_satisfied(dependency, instance)
                    && self
                        .section
                        .field_position(dependency.field())
                        .is_some_and(|controller| self.resolve_chain(controller, instance, memo))
            }
        };

        memo[index] = Resolution::Done(active);
        active
    }
}

#[derive(Debug, Clone, Copy)]
enum Resolution {
    Pending,
    Visiting,
    Done(bool),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FormSchema;

    fn children() -> SectionDef {
        FormSchema::from_yaml_str(
            r#"
- sectionTitle: Children
  repeatable: true
  maxInstances: 4
  fields:
    - { name: childName, type: text }
    - name: childLiving
      type: radio
      options: [{ value: "yes" }, { value: "no" }]
    - { name: childDistribution, type: radio, options: [{ value: atAge }], dependency: { field: childLiving, value: "no" } }
    - { name: childDistributionAge, type: number, dependency: { field: childDistribution, value: atAge } }
    - { name: ghost, type: text, dependency: { field: notAField, value: "x" } }
"#,
        )
        .unwrap()
        .section(0)
        .cloned()
        .unwrap()
    }

    fn instance(pairs: &[(&str, FieldValue)]) -> InstanceValues {
        let mut values = InstanceValues::seeded(&children().fields);
        for (name, value) in pairs {
            values.set(*name, value.clone());
        }
        values
    }

    #[test]
    fn no_dependency_is_always_active() {
        let section = children();
        assert!(is_active(&section, &section.fields[0], &InstanceValues::default()));
    }

    #[test]
    fn equality_dependency() {
        let section = children();
        let dist = &section.fields[2];
        assert!(is_active(&section, dist, &instance(&[("childLiving", FieldValue::text("no"))])));
        assert!(!is_active(&section, dist, &instance(&[("childLiving", FieldValue::text("yes"))])));
        assert!(!is_active(&section, dist, &instance(&[])));
    }

    #[test]
    fn unknown_controlling_field_never_activates() {
        let section = children();
        let ghost = &section.fields[4];
        assert!(!is_active(&section, ghost, &instance(&[("childName", FieldValue::text("x"))])));
        assert!(!is_active(&section, ghost, &InstanceValues::default()));
    }

    #[test]
    fn stored_value_under_undeclared_name_never_activates() {
        let section = children();
        let ghost = &section.fields[4];
        let values = instance(&[("notAField", FieldValue::text("x"))]);

        assert!(!is_active(&section, ghost, &values));
        for mode in [DependencyMode::Direct, DependencyMode::Transitive] {
            let flags = ActivityResolver::new(&section, mode).resolve(&values);
            assert!(!flags[4], "{mode:?}");
        }
    }

    #[test]
    fn scalars_compare_as_strings() {
        let mut values = InstanceValues::default();
        values.set("count", FieldValue::Number(3.0));
        values.set("flag", FieldValue::Bool(true));

        assert!(dependency_satisfied(&Dependency::equals("count", "3"), &values));
        assert!(dependency_satisfied(&Dependency::one_of("flag", ["true"]), &values));
        assert!(!dependency_satisfied(&Dependency::equals("count", "3.0"), &values));
    }

    #[test]
    fn selection_matches_any_selected_option() {
        let mut values = InstanceValues::default();
        values.set("originalTrustees", FieldValue::selection(["husbandOnly", "other"]));

        assert!(dependency_satisfied(&Dependency::equals("originalTrustees", "other"), &values));
        assert!(!dependency_satisfied(&Dependency::equals("originalTrustees", "wifeOnly"), &values));
    }

    #[test]
    fn direct_mode_ignores_chain() {
        let section = children();
        let values = instance(&[
            ("childLiving", FieldValue::text("yes")),
            ("childDistribution", FieldValue::text("atAge")),
        ]);
        let flags = ActivityResolver::new(&section, DependencyMode::Direct).resolve(&values);
        assert_eq!(flags, vec![true, true, false, true, false]);
    }

    #[test]
    fn transitive_mode_collapses_chain() {
        let section = children();
        let values = instance(&[
            ("childLiving", FieldValue::text("yes")),
            ("childDistribution", FieldValue::text("atAge")),
        ]);
        let flags = ActivityResolver::new(&section, DependencyMode::Transitive).resolve(&values);
        assert_eq!(flags, vec![true, true, false, false, false]);

        let values = instance(&[
            ("childLiving", FieldValue::text("no")),
            ("childDistribution", FieldValue::text("atAge")),
        ]);
        let flags = ActivityResolver::new(&section, DependencyMode::Transitive).resolve(&values);
        assert_eq!(flags, vec![true, true, true, true, false]);
    }

    #[test]
    fn transitive_cycle_is_inactive() {
        let section = FormSchema::from_yaml_str(
            r#"
- fields:
    - { name: a, dependency: { field: b, value: "x" } }
    - { name: b, dependency: { field: a, value: "x" } }
"#,
        )
        .unwrap()
        .section(0)
        .cloned()
        .unwrap();
        let mut values = InstanceValues::seeded(&section.fields);
        values.set("a", FieldValue::text("x"));
        values.set("b", FieldValue::text("x"));

        let flags = ActivityResolver::new(&section, DependencyMode::Transitive).resolve(&values);
        assert_eq!(flags, vec![false, false]);
        let flags = ActivityResolver::new(&section, DependencyMode::Direct).resolve(&values);
        assert_eq!(flags, vec![true, true]);
    }
}
