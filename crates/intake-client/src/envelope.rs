//! Wire types for `POST /api/intake`.

use chrono::{DateTime, Utc};
use intake_form::SubmissionPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ClientError;

/// Request body: the payload plus who submitted it.
///
/// `submissionId` is fresh per envelope; `fingerprint` only depends on the
/// payload, so a server can spot a resubmitted form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEnvelope {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub submission_id: Uuid,
    pub fingerprint: String,
    pub submitted_at: DateTime<Utc>,
    pub form_data: SubmissionPayload,
}

impl SubmissionEnvelope {
    /// Wrap a payload. A blank `user_id` is refused here rather than by the
    /// server.
    pub fn new(
        user_id: impl Into<String>,
        client_id: Option<String>,
        form_data: SubmissionPayload,
    ) -> Result<Self, ClientError> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(ClientError::MissingUserId);
        }
        Ok(Self {
            user_id,
            client_id: client_id.filter(|c| !c.trim().is_empty()),
            submission_id: Uuid::new_v4(),
            fingerprint: form_data.fingerprint()?,
            submitted_at: Utc::now(),
            form_data,
        })
    }
}

/// Server acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionReceipt {
    pub success: bool,
    pub message: String,
    /// Stored form id.
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub submission_id: Option<String>,
}

/// Error body the API sends with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_form::{FieldPath, FormSchema, FormSession};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn payload() -> SubmissionPayload {
        let schema = FormSchema::from_yaml_str(
            "- sectionTitle: Notes\n  fields:\n    - { name: notes, type: textarea }\n",
        )
        .unwrap();
        let mut session = FormSession::new(Arc::new(schema));
        session
            .set_value(FieldPath::new(0, 0, "notes"), "call after 5pm".into())
            .unwrap();
        session.submit()
    }

    #[test]
    fn envelope_json_is_camel_case() {
        let envelope = SubmissionEnvelope::new("user-42", None, payload()).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["userId"], "user-42");
        assert_eq!(json["formData"]["0.0.notes"], "call after 5pm");
        assert_eq!(json["fingerprint"], payload().fingerprint().unwrap());
        assert!(json.get("clientId").is_none());
        assert!(json.get("submissionId").is_some());
        assert!(json.get("submittedAt").is_some());
    }

    #[test]
    fn blank_user_id_is_refused() {
        let err = SubmissionEnvelope::new("   ", None, payload()).unwrap_err();
        assert!(matches!(err, ClientError::MissingUserId));
    }

    #[test]
    fn each_envelope_gets_its_own_submission_id() {
        let a = SubmissionEnvelope::new("u", Some("c-1".into()), payload()).unwrap();
        let b = SubmissionEnvelope::new("u", Some("c-1".into()), payload()).unwrap();
        assert_ne!(a.submission_id, b.submission_id);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn receipt_tolerates_extra_and_missing_keys() {
        let receipt: SubmissionReceipt = serde_json::from_str(
            r#"{"success": true, "message": "Form submitted successfully!", "id": "665f", "status": "submitted"}"#,
        )
        .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.id.as_deref(), Some("665f"));
        assert_eq!(receipt.submission_id, None);
    }
}
