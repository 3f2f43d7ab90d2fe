//! The unit the pipeline manages: one send request and its lifecycle

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use mailroom_core::{JobId, UtcDateTime};

use crate::providers::ProviderKind;

/// Delivery status state machine.
///
/// `Queued` and `Processing` are transient, `Sent` and `Failed` are
/// terminal. Post-send states (delivered, bounced, opened, clicked)
/// are applied by an external ingress and never by this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Sent,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Sent => write!(f, "sent"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

/// A single addressee, tagged with how it appears in the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    #[serde(rename = "type", default = "RecipientKind::to")]
    pub kind: RecipientKind,
}

impl RecipientKind {
    fn to() -> Self {
        RecipientKind::To
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    #[schema(example = "invoice.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Base64-encoded payload
    pub content: String,
    pub size: u64,
}

/// Ledger record for one email send job.
///
/// `id`, `tenant_id` and `api_key_id` are immutable after creation.
/// Each timestamp is set exactly once, on the matching transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailJob {
    #[schema(value_type = Uuid)]
    pub id: JobId,
    pub tenant_id: Uuid,
    /// Which API key submitted the job
    pub api_key_id: Uuid,

    // Envelope
    pub from_email: String,
    pub from_name: Option<String>,
    /// Merged to/cc/bcc list, in request order. Never empty.
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub attachments: Vec<Attachment>,
    pub template_id: Option<Uuid>,
    pub template_variables: HashMap<String, String>,

    // Delivery tracking
    pub provider: ProviderKind,
    pub status: JobStatus,
    /// Set only on success
    pub provider_message_id: Option<String>,
    /// Set only on failure
    pub error_message: Option<String>,

    // Timestamps
    #[schema(value_type = String, format = "date-time")]
    pub created_at: UtcDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub queued_at: Option<UtcDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub processing_started_at: Option<UtcDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sent_at: Option<UtcDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub failed_at: Option<UtcDateTime>,

    // Scheduling (accepted and persisted; no scheduler enqueues these)
    pub send_immediately: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub scheduled_at: Option<UtcDateTime>,

    // Owner-supplied, never interpreted by the pipeline
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}
