//! Answers scripts for `intake fill`.
//!
//! ```yaml
//! - set: { section: 5, instance: 0, field: childLiving, value: "no" }
//! - add: 5
//! - remove: { section: 5, instance: 1 }
//! ```

use anyhow::{bail, Context, Result};
use intake_form::{FieldPath, FieldValue, FormEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Step {
    set: Option<SetStep>,
    add: Option<usize>,
    remove: Option<RemoveStep>,
}

#[derive(Debug, Deserialize)]
struct SetStep {
    section: usize,
    #[serde(default)]
    instance: usize,
    field: String,
    value: FieldValue,
}

#[derive(Debug, Deserialize)]
struct RemoveStep {
    section: usize,
    instance: usize,
}

/// Parse a script into session events, in order.
pub fn parse_script(text: &str) -> Result<Vec<FormEvent>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let steps: Vec<Step> = serde_yaml::from_str(text).context("answers script is not valid YAML")?;
    steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| step_event(step).with_context(|| format!("step {index}")))
        .collect()
}

fn step_event(step: Step) -> Result<FormEvent> {
    match (step.set, step.add, step.remove) {
        (Some(set), None, None) => Ok(FormEvent::SetValue {
            path: FieldPath::new(set.section, set.instance, set.field),
            value: set.value,
        }),
        (None, Some(section), None) => Ok(FormEvent::AddInstance { section }),
        (None, None, Some(remove)) => Ok(FormEvent::RemoveInstance {
            section: remove.section,
            instance: remove.instance,
        }),
        _ => bail!("expected exactly one of `set`, `add` or `remove`"),
    }
}
