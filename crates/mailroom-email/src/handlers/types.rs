//! Request and response bodies for the email HTTP surface

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use mailroom_core::{JobId, UtcDateTime};

use crate::job::{Attachment, EmailJob, JobStatus, Recipient};
use crate::providers::ProviderKind;
use crate::services::{AnalyticsOverview, EmailService, SendEmailRequest, SendEmailResponse};

/// Shared state for the email handlers
pub struct AppState {
    pub email_service: Arc<EmailService>,
}

fn default_true() -> bool {
    true
}

/// Body of `POST /v1/emails`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendEmailRequestBody {
    #[schema(example = "noreply@example.com")]
    pub from_email: String,
    pub from_name: Option<String>,
    pub to: Vec<Recipient>,
    #[serde(default)]
    pub cc: Vec<Recipient>,
    #[serde(default)]
    pub bcc: Vec<Recipient>,
    pub subject: String,
    pub html_content: Option<String>,
    pub text_content: Option<String>,
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub template_variables: HashMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Delivery transport; defaults to the simulated smtp transport
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "default_true")]
    pub send_immediately: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub scheduled_at: Option<UtcDateTime>,
}

impl From<SendEmailRequestBody> for SendEmailRequest {
    fn from(body: SendEmailRequestBody) -> Self {
        SendEmailRequest {
            from_email: body.from_email,
            from_name: body.from_name,
            to: body.to,
            cc: body.cc,
            bcc: body.bcc,
            subject: body.subject,
            html_content: body.html_content,
            text_content: body.text_content,
            attachments: body.attachments,
            template_id: body.template_id,
            template_variables: body.template_variables,
            provider: body.provider,
            tags: body.tags,
            metadata: body.metadata,
            send_immediately: body.send_immediately,
            scheduled_at: body.scheduled_at,
        }
    }
}

/// Synchronous acknowledgement of an accepted send request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendEmailResponseBody {
    #[schema(value_type = Uuid)]
    pub id: JobId,
    pub status: JobStatus,
    pub message: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: UtcDateTime,
}

impl SendEmailResponseBody {
    pub fn from_response(response: SendEmailResponse, immediate: bool) -> Self {
        let message = if immediate {
            "Email queued for sending".to_string()
        } else {
            "Email accepted for scheduled delivery".to_string()
        };
        Self {
            id: response.id,
            status: response.status,
            message,
            created_at: response.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmailListResponse {
    pub emails: Vec<EmailJob>,
    pub total: u64,
}

/// Body of `GET /v1/analytics/overview`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsOverviewResponse {
    pub total_emails: u64,
    pub queued: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
    pub quota_used: u64,
    pub quota_limit: u64,
    pub quota_percentage: f64,
}

impl From<AnalyticsOverview> for AnalyticsOverviewResponse {
    fn from(overview: AnalyticsOverview) -> Self {
        Self {
            total_emails: overview.counts.total,
            queued: overview.counts.queued,
            processing: overview.counts.processing,
            sent: overview.counts.sent,
            failed: overview.counts.failed,
            quota_used: overview.quota_used,
            quota_limit: overview.quota_limit,
            quota_percentage: overview.quota_percentage,
        }
    }
}
