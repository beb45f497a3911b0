//! Submission serialization.
//!
//! Walks the schema in declared order (sections, then the instances present in
//! state, then fields), keeps the active fields, and emits a flat ordered
//! payload. Inactive fields are left out entirely; they are never emitted as
//! null. The same schema and state always give the same keys in the same
//! order, so the JSON bytes and the fingerprint are stable across runs.

use std::collections::HashSet;

use form_types::FieldValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{DependencyMode, KeyStyle};
use crate::dependency::ActivityResolver;
use crate::schema::FormSchema;
use crate::state::FormState;

/// Flat key/value payload handed to the submission client.
///
/// Serializes as a JSON object whose keys keep payload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPayload {
    entries: Vec<(String, FieldValue)>,
}

impl SubmissionPayload {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON in payload order.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// SHA-256 (hex) of the compact JSON form. Identical payloads always share
    /// a fingerprint, so it doubles as an idempotency key for re-submission.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    fn push(&mut self, key: String, value: FieldValue) {
        self.entries.push((key, value));
    }
}

impl Serialize for SubmissionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Turns schema + state into a payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionSerializer {
    pub key_style: KeyStyle,
    pub dependency_mode: DependencyMode,
}

impl SubmissionSerializer {
    pub fn new(key_style: KeyStyle, dependency_mode: DependencyMode) -> Self {
        Self {
            key_style,
            dependency_mode,
        }
    }

    pub fn serialize(&self, schema: &FormSchema, state: &FormState) -> SubmissionPayload {
        let keys = PayloadKeys::new(schema, self.key_style);
        let mut payload = SubmissionPayload::default();
        let mut omitted = 0usize;

        for (section_index, section) in schema.sections().iter().enumerate() {
            let resolver = ActivityResolver::new(section, self.dependency_mode);
            for (instance_index, values) in state.instances_of(section_index) {
                let active = resolver.resolve(values);
                for (field, is_active) in section.fields.iter().zip(active) {
                    if !is_active {
                        omitted += 1;
                        continue;
                    }
                    let value = values
                        .get(&field.name)
                        .cloned()
                        .unwrap_or_else(|| field.default_value());
                    payload.push(keys.key(section_index, instance_index, &field.name), value);
                }
            }
        }

        debug!(
            entries = payload.len(),
            omitted, "submission payload serialized"
        );
        payload
    }
}

/// Serialize with the default key style and dependency mode.
pub fn serialize(schema: &FormSchema, state: &FormState) -> SubmissionPayload {
    SubmissionSerializer::default().serialize(schema, state)
}

/// Derives payload keys for one schema.
struct PayloadKeys {
    style: KeyStyle,
    /// Per-section prefix for `KeyStyle::Titled`.
    slugs: Vec<String>,
}

impl PayloadKeys {
    fn new(schema: &FormSchema, style: KeyStyle) -> Self {
        let slugs = match style {
            KeyStyle::Indexed => Vec::new(),
            KeyStyle::Titled => section_slugs(schema),
        };
        Self { style, slugs }
    }

    fn key(&self, section: usize, instance: usize, field: &str) -> String {
        match self.style {
            KeyStyle::Indexed => format!("{section}.{instance}.{field}"),
            KeyStyle::Titled => format!("{}[{instance}].{field}", self.slugs[section]),
        }
    }
}

/// Slugs for every section title; a slug already taken by an earlier section
/// gets `_{section index}` appended until it is unique.
fn section_slugs(schema: &FormSchema) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    schema
        .sections()
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let mut slug = slugify(&section.title);
            while taken.contains(&slug) {
                slug = format!("{slug}_{index}");
            }
            taken.insert(slug.clone());
            slug
        })
        .collect()
}

/// Lower-case ASCII alphanumerics; every other run of characters becomes `_`.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialInstances;
    use crate::instances::SectionInstantiator;
    use form_types::FieldPath;
    use pretty_assertions::assert_eq;

    fn schema() -> FormSchema {
        FormSchema::from_yaml_str(
            r#"
- sectionTitle: Trust Type & Name
  fields:
    - name: isRestatementOrAmendment
      type: radio
      options: [{ value: "no" }, { value: "yes" }]
    - name: dateOfOriginalTrust
      type: date
      dependency: { field: isRestatementOrAmendment, value: "yes" }
- sectionTitle: Gifts
  repeatable: true
  maxInstances: 2
  fields:
    - name: giftTo
- sectionTitle: Gifts
  fields:
    - name: giftNotes
      type: textarea
"#,
        )
        .unwrap()
    }

    fn loaded() -> (FormSchema, FormState, SectionInstantiator) {
        let schema = schema();
        let mut state = FormState::new();
        let instances = SectionInstantiator::new(&schema, &mut state, InitialInstances::One);
        (schema, state, instances)
    }

    #[test]
    fn indexed_keys_in_schema_order() {
        let (schema, mut state, mut instances) = loaded();
        instances.add_instance(&schema, &mut state, 1).unwrap();
        state.set(FieldPath::new(1, 1, "giftTo"), FieldValue::text("Library"));

        let payload = serialize(&schema, &state);
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(
            keys,
            vec![
                "0.0.isRestatementOrAmendment",
                "1.0.giftTo",
                "1.1.giftTo",
                "2.0.giftNotes"
            ]
        );
        assert_eq!(payload.get("1.1.giftTo"), Some(&FieldValue::text("Library")));
    }

    #[test]
    fn inactive_fields_are_omitted() {
        let (schema, mut state, _) = loaded();
        state.set(FieldPath::new(0, 0, "isRestatementOrAmendment"), "no".into());
        state.set(FieldPath::new(0, 0, "dateOfOriginalTrust"), "2001-02-03".into());

        let payload = serialize(&schema, &state);
        assert!(!payload.contains_key("0.0.dateOfOriginalTrust"));
        assert!(!payload.to_json_string().unwrap().contains("null"));

        state.set(FieldPath::new(0, 0, "isRestatementOrAmendment"), "yes".into());
        let payload = serialize(&schema, &state);
        assert_eq!(
            payload.get("0.0.dateOfOriginalTrust"),
            Some(&FieldValue::text("2001-02-03"))
        );
    }

    #[test]
    fn titled_keys_disambiguate_repeated_titles() {
        let (schema, state, _) = loaded();
        let payload = SubmissionSerializer::new(KeyStyle::Titled, DependencyMode::Direct)
            .serialize(&schema, &state);
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(
            keys,
            vec![
                "trust_type_name[0].isRestatementOrAmendment",
                "gifts[0].giftTo",
                "gifts_2[0].giftNotes"
            ]
        );
    }

    #[test]
    fn titled_keys_stay_unique_when_suffix_matches_a_title() {
        let schema = FormSchema::from_yaml_str(
            r#"
- sectionTitle: Gifts 2
  fields: [{ name: note }]
- sectionTitle: Gifts
  fields: [{ name: note }]
- sectionTitle: Gifts
  fields: [{ name: note }]
"#,
        )
        .unwrap();
        let mut state = FormState::new();
        SectionInstantiator::new(&schema, &mut state, InitialInstances::One);
        state.set(FieldPath::new(0, 0, "note"), "first".into());
        state.set(FieldPath::new(2, 0, "note"), "third".into());

        let payload = SubmissionSerializer::new(KeyStyle::Titled, DependencyMode::Direct)
            .serialize(&schema, &state);
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(
            keys,
            vec!["gifts_2[0].note", "gifts[0].note", "gifts_2_2[0].note"]
        );

        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&payload.to_json_string().unwrap()).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["gifts_2[0].note"], "first");
        assert_eq!(parsed["gifts_2_2[0].note"], "third");
    }

    #[test]
    fn json_preserves_payload_order() {
        let (schema, mut state, _) = loaded();
        state.set(FieldPath::new(2, 0, "giftNotes"), "see attached".into());
        let json = serialize(&schema, &state).to_json_string().unwrap();
        assert_eq!(
            json,
            r#"{"0.0.isRestatementOrAmendment":"","1.0.giftTo":"","2.0.giftNotes":"see attached"}"#
        );
    }

    #[test]
    fn fingerprint_tracks_content() {
        let (schema, mut state, _) = loaded();
        let first = serialize(&schema, &state).fingerprint().unwrap();
        let again = serialize(&schema, &state).fingerprint().unwrap();
        assert_eq!(first, again);
        assert_eq!(first.len(), 64);

        state.set(FieldPath::new(1, 0, "giftTo"), "Museum".into());
        assert_ne!(serialize(&schema, &state).fingerprint().unwrap(), first);
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Client's Residence"), "client_s_residence");
        assert_eq!(slugify("Vehicles, Mobile Homes, Boats, Aircrafts, etc."), "vehicles_mobile_homes_boats_aircrafts_etc");
        assert_eq!(slugify("  ***  "), "section");
    }
}
