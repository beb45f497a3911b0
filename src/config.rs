//! Engine configuration.
//!
//! Every setting has a default, so an empty YAML document (or no config at all)
//! gives the standard behaviour: indexed payload keys, one
//! initial instance per repeatable section, direct dependency resolution and
//! lenient dependency validation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_KEY_STYLE: &str = "INTAKE_KEY_STYLE";
pub const ENV_INITIAL_INSTANCES: &str = "INTAKE_INITIAL_INSTANCES";
pub const ENV_DEPENDENCY_MODE: &str = "INTAKE_DEPENDENCY_MODE";
pub const ENV_STRICT_DEPENDENCIES: &str = "INTAKE_STRICT_DEPENDENCIES";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config YAML could not be parsed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value '{value}' for {key}, expected one of: {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How submission payload keys are derived from a field path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStyle {
    /// `{section}.{instance}.{field}`, e.g. `5.0.childName`
    #[default]
    Indexed,
    /// `{section_slug}[{instance}].{field}`, e.g. `children[0].childName`
    Titled,
}

/// Instances a repeatable section starts with when the form is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialInstances {
    None,
    #[default]
    One,
}

impl InitialInstances {
    pub fn count(&self) -> usize {
        match self {
            InitialInstances::None => 0,
            InitialInstances::One => 1,
        }
    }
}

/// How far dependency resolution looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
    /// A field is active when its own predicate holds on the stored value.
    #[default]
    Direct,
    /// The controlling field must also be active; chains collapse together.
    Transitive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub key_style: KeyStyle,
    pub initial_instances: InitialInstances,
    pub dependency_mode: DependencyMode,
    /// Reject schemas whose dependencies name fields missing from their section.
    pub strict_dependencies: bool,
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `INTAKE_*` environment overrides on top of this config.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_KEY_STYLE) {
            self.key_style = parse_setting(ENV_KEY_STYLE, &v, "indexed, titled")?;
        }
        if let Some(v) = lookup(ENV_INITIAL_INSTANCES) {
            self.initial_instances = parse_setting(ENV_INITIAL_INSTANCES, &v, "none, one")?;
        }
        if let Some(v) = lookup(ENV_DEPENDENCY_MODE) {
            self.dependency_mode = parse_setting(ENV_DEPENDENCY_MODE, &v, "direct, transitive")?;
        }
        if let Some(v) = lookup(ENV_STRICT_DEPENDENCIES) {
            self.strict_dependencies = bool::from_str(v.trim().to_ascii_lowercase().as_str())
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_STRICT_DEPENDENCIES,
                    value: v.clone(),
                    expected: "true, false",
                })?;
        }
        Ok(self)
    }
}

/// Parse a snake_case enum setting through its serde representation.
fn parse_setting<T>(key: &'static str, value: &str, expected: &'static str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let normalized = value.trim().to_ascii_lowercase();
    serde_yaml::from_str(&normalized).map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = EngineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.key_style, KeyStyle::Indexed);
        assert_eq!(config.initial_instances.count(), 1);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = EngineConfig::from_yaml_str("key_style: titled\n").unwrap();
        assert_eq!(config.key_style, KeyStyle::Titled);
        assert_eq!(config.dependency_mode, DependencyMode::Direct);
        assert!(!config.strict_dependencies);
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_DEPENDENCY_MODE, "Transitive"),
            (ENV_INITIAL_INSTANCES, "none"),
            (ENV_STRICT_DEPENDENCIES, "TRUE"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default()
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.dependency_mode, DependencyMode::Transitive);
        assert_eq!(config.initial_instances, InitialInstances::None);
        assert!(config.strict_dependencies);
    }

    #[test]
    fn bad_override_is_reported() {
        let err = EngineConfig::default()
            .apply_overrides(|k| (k == ENV_KEY_STYLE).then(|| "camel".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_KEY_STYLE));
    }
}
