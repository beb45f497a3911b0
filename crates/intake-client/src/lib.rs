//! Submission client for intake form payloads.
//!
//! The form engine stops at a [`SubmissionPayload`](intake_form::SubmissionPayload).
//! This crate wraps it in a [`SubmissionEnvelope`], hands it to a
//! [`SubmissionSink`] (normally [`HttpSubmissionClient`]), and offers
//! [`spawn_submission`] for callers that do not wait on the outcome.

mod config;
mod envelope;
mod http;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use config::{ClientConfig, ENV_API_KEY, ENV_API_TIMEOUT_SECS, ENV_API_URL};
pub use envelope::{SubmissionEnvelope, SubmissionReceipt};
pub use http::HttpSubmissionClient;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("User ID is required")]
    MissingUserId,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("intake API rejected submission ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("client configuration error: {0}")]
    Config(String),
}

/// Somewhere a finished form can be sent.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, envelope: &SubmissionEnvelope) -> Result<SubmissionReceipt, ClientError>;

    /// Name of this sink for logging
    fn sink_name(&self) -> &'static str;
}

/// Send `envelope` on a detached task. The outcome is only logged; there is
/// no retry and no status to poll. The handle may be awaited or dropped.
pub fn spawn_submission(sink: Arc<dyn SubmissionSink>, envelope: SubmissionEnvelope) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sink.submit(&envelope).await {
            Ok(receipt) if receipt.success => info!(
                sink = sink.sink_name(),
                submission_id = %envelope.submission_id,
                message = %receipt.message,
                "submission delivered"
            ),
            Ok(receipt) => warn!(
                sink = sink.sink_name(),
                submission_id = %envelope.submission_id,
                message = %receipt.message,
                "submission acknowledged without success"
            ),
            Err(e) => warn!(
                sink = sink.sink_name(),
                submission_id = %envelope.submission_id,
                error = %e,
                "submission failed"
            ),
        }
    })
}
