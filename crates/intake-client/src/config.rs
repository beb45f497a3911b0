//! Client configuration from the environment.

use std::time::Duration;

use crate::ClientError;

pub const ENV_API_URL: &str = "INTAKE_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "INTAKE_API_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "INTAKE_API_KEY";

const DEFAULT_API_URL: &str = "http://localhost:4000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the intake API, without the `/api/intake` path.
    pub api_url: String,
    pub timeout_secs: u64,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

impl ClientConfig {
    /// Load from `INTAKE_API_*` variables. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(ENV_API_TIMEOUT_SECS) {
            config.timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ClientError::Config(format!(
                        "{ENV_API_TIMEOUT_SECS} must be a positive integer, got '{raw}'"
                    ))
                })?;
        }
        config.api_key = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty());
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn intake_endpoint(&self) -> String {
        format!("{}/api/intake", self.api_url.trim_end_matches('/'))
    }
}
