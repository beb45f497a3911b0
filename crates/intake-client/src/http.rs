//! reqwest-backed submission sink.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::envelope::{ErrorBody, SubmissionEnvelope, SubmissionReceipt};
use crate::{ClientError, SubmissionSink};

/// Posts envelopes to `{api_url}/api/intake`.
pub struct HttpSubmissionClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSubmissionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            endpoint: config.intake_endpoint(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(&ClientConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionClient {
    async fn submit(&self, envelope: &SubmissionEnvelope) -> Result<SubmissionReceipt, ClientError> {
        debug!(
            endpoint = %self.endpoint,
            submission_id = %envelope.submission_id,
            entries = envelope.form_data.len(),
            "posting intake submission"
        );

        let mut request = self.http.post(&self.endpoint).json(envelope);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let receipt: SubmissionReceipt = response.json().await?;
        info!(
            submission_id = %envelope.submission_id,
            id = receipt.id.as_deref().unwrap_or("-"),
            "intake submission accepted"
        );
        Ok(receipt)
    }

    fn sink_name(&self) -> &'static str {
        "http"
    }
}

/// Pull `message`/`error` out of a JSON error body, or fall back to the first
/// 200 characters of the raw text.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            error,
        }) => match error {
            Some(detail) => format!("{message} ({detail})"),
            None => message,
        },
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_prefers_json_fields() {
        assert_eq!(
            rejection_message(r#"{"success": false, "message": "User ID is required"}"#),
            "User ID is required"
        );
        assert_eq!(
            rejection_message(r#"{"message": "Failed to submit form", "error": "timeout"}"#),
            "Failed to submit form (timeout)"
        );
        assert_eq!(rejection_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn endpoint_comes_from_config() {
        let config = ClientConfig {
            api_url: "http://intake.local:4000".into(),
            ..ClientConfig::default()
        };
        let client = HttpSubmissionClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://intake.local:4000/api/intake");
        assert_eq!(client.sink_name(), "http");
    }
}
