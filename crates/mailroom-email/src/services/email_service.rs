//! Ingestion and read-side operations on the job ledger

use base64::Engine;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use mailroom_auth::{AuthPrincipal, TenantStore};
use mailroom_core::{DispatchQueue, JobId, UtcDateTime};

use crate::errors::EmailError;
use crate::job::{Attachment, EmailJob, JobStatus, Recipient};
use crate::ledger::{JobLedger, ListJobsQuery, StatusCounts};
use crate::providers::ProviderKind;

/// Service for admitting send requests and reading job state
pub struct EmailService {
    ledger: Arc<dyn JobLedger>,
    tenants: Arc<dyn TenantStore>,
    queue: Arc<dyn DispatchQueue>,
}

/// A validated-shape send request, recipients still split by kind
#[derive(Debug, Clone)]
pub struct SendEmailRequest {
    pub from_email: String,
    pub from_name: Option<String>,
    pub to: Vec<Recipient>,
    pub cc: Vec<Recipient>,
    pub bcc: Vec<Recipient>,
    pub subject: String,
    pub html_content: Option<String>,
    pub text_content: Option<String>,
    pub attachments: Vec<Attachment>,
    pub template_id: Option<Uuid>,
    pub template_variables: HashMap<String, String>,
    pub provider: ProviderKind,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub send_immediately: bool,
    pub scheduled_at: Option<UtcDateTime>,
}

/// What the caller gets back synchronously
#[derive(Debug, Clone)]
pub struct SendEmailResponse {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: UtcDateTime,
}

/// Per-tenant delivery statistics and quota usage
#[derive(Debug, Clone)]
pub struct AnalyticsOverview {
    pub counts: StatusCounts,
    pub quota_used: u64,
    pub quota_limit: u64,
    pub quota_percentage: f64,
}

impl EmailService {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        tenants: Arc<dyn TenantStore>,
        queue: Arc<dyn DispatchQueue>,
    ) -> Self {
        Self {
            ledger,
            tenants,
            queue,
        }
    }

    /// Admit a send request into the pipeline.
    ///
    /// Exactly one ledger write and at most one enqueue per call, and
    /// never an internal retry. Quota admission happens before any
    /// persistence, so a rejected request leaves no trace.
    pub async fn ingest(
        &self,
        principal: &AuthPrincipal,
        request: SendEmailRequest,
    ) -> Result<SendEmailResponse, EmailError> {
        validate(&request)?;

        self.tenants.try_admit(principal.tenant_id()).await?;

        let now = Utc::now();
        let recipients: Vec<Recipient> = request
            .to
            .into_iter()
            .chain(request.cc)
            .chain(request.bcc)
            .collect();

        let job = EmailJob {
            id: Uuid::new_v4(),
            tenant_id: principal.tenant_id(),
            api_key_id: principal.api_key_id(),
            from_email: request.from_email,
            from_name: request.from_name,
            recipients,
            subject: request.subject,
            html_body: request.html_content,
            text_body: request.text_content,
            attachments: request.attachments,
            template_id: request.template_id,
            template_variables: request.template_variables,
            provider: request.provider,
            status: JobStatus::Queued,
            provider_message_id: None,
            error_message: None,
            created_at: now,
            // Scheduled sends are persisted but never enqueued; they
            // get a queued_at only if a scheduler ever picks them up
            queued_at: request.send_immediately.then_some(now),
            processing_started_at: None,
            sent_at: None,
            failed_at: None,
            send_immediately: request.send_immediately,
            scheduled_at: request.scheduled_at,
            tags: request.tags,
            metadata: request.metadata,
        };

        let response = SendEmailResponse {
            id: job.id,
            status: job.status,
            created_at: job.created_at,
        };

        let immediate = job.send_immediately;
        debug!("Persisting job {} for tenant {}", job.id, job.tenant_id);
        self.ledger.insert(job).await?;

        if immediate {
            self.queue.enqueue(response.id).await?;
            info!("Job {} queued for delivery", response.id);
        } else {
            info!("Job {} accepted for scheduled delivery", response.id);
        }

        Ok(response)
    }

    /// List the tenant's jobs, newest first.
    pub async fn list_jobs(
        &self,
        principal: &AuthPrincipal,
        query: ListJobsQuery,
    ) -> Result<Vec<EmailJob>, EmailError> {
        self.ledger.list(principal.tenant_id(), &query).await
    }

    /// Fetch one job; absent and cross-tenant ids both read as not found.
    pub async fn get_job(
        &self,
        principal: &AuthPrincipal,
        id: JobId,
    ) -> Result<EmailJob, EmailError> {
        self.ledger
            .find_for_tenant(id, principal.tenant_id())
            .await?
            .ok_or_else(|| EmailError::JobNotFound(id.to_string()))
    }

    /// Delivery statistics plus live quota usage for the tenant.
    pub async fn analytics_overview(
        &self,
        principal: &AuthPrincipal,
    ) -> Result<AnalyticsOverview, EmailError> {
        let counts = self.ledger.status_counts(principal.tenant_id()).await?;

        // Re-read for a current quota counter; the principal's copy is
        // a snapshot from authentication time
        let tenant = self
            .tenants
            .find_active(principal.tenant_id())
            .await?
            .unwrap_or_else(|| principal.tenant.clone());

        let quota_percentage = if tenant.quota_limit > 0 {
            (tenant.used_this_period as f64 / tenant.quota_limit as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(AnalyticsOverview {
            counts,
            quota_used: tenant.used_this_period,
            quota_limit: tenant.quota_limit,
            quota_percentage,
        })
    }
}

fn validate(request: &SendEmailRequest) -> Result<(), EmailError> {
    if !is_email(&request.from_email) {
        return Err(EmailError::validation(
            "from_email",
            "a valid sender address is required",
        ));
    }

    let recipient_count = request.to.len() + request.cc.len() + request.bcc.len();
    if recipient_count == 0 {
        return Err(EmailError::validation(
            "recipients",
            "at least one recipient is required",
        ));
    }
    for recipient in request.to.iter().chain(&request.cc).chain(&request.bcc) {
        if !is_email(&recipient.email) {
            return Err(EmailError::validation(
                "recipients",
                format!("invalid recipient address: {}", recipient.email),
            ));
        }
    }

    if request.html_content.is_none() && request.text_content.is_none() {
        return Err(EmailError::validation(
            "body",
            "either html_content or text_content is required",
        ));
    }

    for attachment in &request.attachments {
        if attachment.filename.is_empty() {
            return Err(EmailError::validation(
                "attachments",
                "attachment filename cannot be empty",
            ));
        }
        if base64::engine::general_purpose::STANDARD
            .decode(&attachment.content)
            .is_err()
        {
            return Err(EmailError::validation(
                "attachments",
                format!("attachment '{}' is not valid base64", attachment.filename),
            ));
        }
    }

    Ok(())
}

fn is_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RecipientKind;

    fn base_request() -> SendEmailRequest {
        SendEmailRequest {
            from_email: "noreply@example.com".to_string(),
            from_name: None,
            to: vec![Recipient {
                email: "jane@example.com".to_string(),
                name: None,
                kind: RecipientKind::To,
            }],
            cc: vec![],
            bcc: vec![],
            subject: "Hello".to_string(),
            html_content: Some("<p>Hi</p>".to_string()),
            text_content: None,
            attachments: vec![],
            template_id: None,
            template_variables: HashMap::new(),
            provider: ProviderKind::Smtp,
            tags: vec![],
            metadata: HashMap::new(),
            send_immediately: true,
            scheduled_at: None,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        assert!(validate(&base_request()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_recipients() {
        let mut request = base_request();
        request.to.clear();
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, EmailError::Validation { ref field, .. } if field == "recipients"));
    }

    #[test]
    fn test_validate_rejects_missing_body() {
        let mut request = base_request();
        request.html_content = None;
        request.text_content = None;
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, EmailError::Validation { ref field, .. } if field == "body"));
    }

    #[test]
    fn test_validate_rejects_bad_sender() {
        let mut request = base_request();
        request.from_email = "not-an-address".to_string();
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, EmailError::Validation { ref field, .. } if field == "from_email"));
    }

    #[test]
    fn test_validate_rejects_bad_attachment_payload() {
        let mut request = base_request();
        request.attachments.push(Attachment {
            filename: "x.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            content: "%%% not base64 %%%".to_string(),
            size: 3,
        });
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, EmailError::Validation { ref field, .. } if field == "attachments"));
    }
}
