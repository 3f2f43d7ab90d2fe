//! Job ledger: the source of truth for job state
//!
//! Every send request gets exactly one ledger record at ingestion; the
//! worker re-reads and transitions it by id. The trait is the seam to
//! a durable store; the in-memory implementation backs tests and
//! single-process deployments.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use utoipa::IntoParams;
use uuid::Uuid;

use mailroom_core::{JobId, UtcDateTime};

use crate::errors::EmailError;
use crate::job::{EmailJob, JobStatus};

/// Filters for listing a tenant's jobs, newest first.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListJobsQuery {
    pub fn normalize(&self) -> (usize, usize) {
        let limit = self.limit.unwrap_or(100).min(100).max(1) as usize;
        let offset = self.offset.unwrap_or(0) as usize;
        (limit, offset)
    }
}

/// Per-tenant counts by delivery status.
#[derive(Debug, Clone, Default)]
pub struct StatusCounts {
    pub total: u64,
    pub queued: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
}

#[async_trait]
pub trait JobLedger: Send + Sync {
    async fn insert(&self, job: EmailJob) -> Result<(), EmailError>;

    /// Fetch a job scoped to its owning tenant. Cross-tenant ids are
    /// indistinguishable from absent ones.
    async fn find_for_tenant(
        &self,
        id: JobId,
        tenant_id: Uuid,
    ) -> Result<Option<EmailJob>, EmailError>;

    /// List a tenant's jobs, newest first, with optional status filter.
    async fn list(&self, tenant_id: Uuid, query: &ListJobsQuery)
        -> Result<Vec<EmailJob>, EmailError>;

    /// Conditional Queued -> Processing transition.
    ///
    /// Exactly one claimant can win a Queued job; terminal and absent
    /// jobs yield `None`. A job found already Processing is returned
    /// as-is: the only way one appears at claim time in a single-worker
    /// deployment is a restart that killed its previous claimant.
    /// Scaling beyond one worker requires a per-job lease instead.
    async fn claim_for_processing(
        &self,
        id: JobId,
        now: UtcDateTime,
    ) -> Result<Option<EmailJob>, EmailError>;

    /// Record successful delivery. No-op when the job is already
    /// terminal; terminal states are never overwritten.
    async fn mark_sent(
        &self,
        id: JobId,
        provider_message_id: String,
        now: UtcDateTime,
    ) -> Result<(), EmailError>;

    /// Record terminal delivery failure. No-op when already terminal.
    async fn mark_failed(
        &self,
        id: JobId,
        error_message: String,
        now: UtcDateTime,
    ) -> Result<(), EmailError>;

    /// Ids of non-terminal jobs that were on the immediate path:
    /// Queued jobs that had been enqueued, plus interrupted Processing
    /// jobs. Startup reconciliation re-enqueues exactly these.
    async fn list_recoverable(&self) -> Result<Vec<JobId>, EmailError>;

    /// Per-status counts for a tenant's analytics overview.
    async fn status_counts(&self, tenant_id: Uuid) -> Result<StatusCounts, EmailError>;
}

/// In-memory ledger for single-process deployments.
#[derive(Default)]
pub struct InMemoryJobLedger {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, EmailJob>,
    /// Insertion order; jobs are created in `created_at` order, so
    /// newest-first is this reversed.
    order: Vec<JobId>,
}

impl InMemoryJobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: drop a job record entirely, simulating external
    /// deletion between enqueue and processing.
    pub async fn remove(&self, id: JobId) {
        let mut inner = self.inner.lock().await;
        inner.jobs.remove(&id);
        inner.order.retain(|j| *j != id);
    }
}

#[async_trait]
impl JobLedger for InMemoryJobLedger {
    async fn insert(&self, job: EmailJob) -> Result<(), EmailError> {
        let mut inner = self.inner.lock().await;
        inner.order.push(job.id);
        inner.jobs.insert(job.id, job);
        Ok(())
    }

    async fn find_for_tenant(
        &self,
        id: JobId,
        tenant_id: Uuid,
    ) -> Result<Option<EmailJob>, EmailError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .get(&id)
            .filter(|j| j.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        query: &ListJobsQuery,
    ) -> Result<Vec<EmailJob>, EmailError> {
        let (limit, offset) = query.normalize();
        let inner = self.inner.lock().await;

        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|j| j.tenant_id == tenant_id)
            .filter(|j| query.status.is_none_or(|s| j.status == s))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn claim_for_processing(
        &self,
        id: JobId,
        now: UtcDateTime,
    ) -> Result<Option<EmailJob>, EmailError> {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };

        match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Processing;
                job.processing_started_at = Some(now);
                Ok(Some(job.clone()))
            }
            JobStatus::Processing => Ok(Some(job.clone())),
            JobStatus::Sent | JobStatus::Failed => Ok(None),
        }
    }

    async fn mark_sent(
        &self,
        id: JobId,
        provider_message_id: String,
        now: UtcDateTime,
    ) -> Result<(), EmailError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(&id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Sent;
                job.sent_at = Some(now);
                job.provider_message_id = Some(provider_message_id);
            }
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: JobId,
        error_message: String,
        now: UtcDateTime,
    ) -> Result<(), EmailError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(&id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Failed;
                job.failed_at = Some(now);
                job.error_message = Some(error_message);
            }
        }
        Ok(())
    }

    async fn list_recoverable(&self) -> Result<Vec<JobId>, EmailError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|j| match j.status {
                JobStatus::Queued => j.queued_at.is_some(),
                JobStatus::Processing => true,
                JobStatus::Sent | JobStatus::Failed => false,
            })
            .map(|j| j.id)
            .collect())
    }

    async fn status_counts(&self, tenant_id: Uuid) -> Result<StatusCounts, EmailError> {
        let inner = self.inner.lock().await;
        let mut counts = StatusCounts::default();
        for job in inner.jobs.values().filter(|j| j.tenant_id == tenant_id) {
            counts.total += 1;
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Sent => counts.sent += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;
    use chrono::Utc;

    fn job_for(tenant_id: Uuid, status: JobStatus) -> EmailJob {
        EmailJob {
            id: Uuid::new_v4(),
            tenant_id,
            api_key_id: Uuid::new_v4(),
            from_email: "noreply@example.com".to_string(),
            from_name: None,
            recipients: vec![],
            subject: "Test".to_string(),
            html_body: None,
            text_body: Some("hi".to_string()),
            attachments: vec![],
            template_id: None,
            template_variables: HashMap::new(),
            provider: ProviderKind::Smtp,
            status,
            provider_message_id: None,
            error_message: None,
            created_at: Utc::now(),
            queued_at: Some(Utc::now()),
            processing_started_at: None,
            sent_at: None,
            failed_at: None,
            send_immediately: true,
            scheduled_at: None,
            tags: vec![],
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_claim_single_winner() {
        let ledger = InMemoryJobLedger::new();
        let job = job_for(Uuid::new_v4(), JobStatus::Queued);
        let id = job.id;
        ledger.insert(job).await.unwrap();

        let first = ledger.claim_for_processing(id, Utc::now()).await.unwrap();
        assert_eq!(first.unwrap().status, JobStatus::Processing);

        // A second claim resumes the interrupted job rather than
        // resetting its processing timestamp
        let second = ledger
            .claim_for_processing(id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.status, JobStatus::Processing);

        ledger
            .mark_sent(id, "smtp_x".to_string(), Utc::now())
            .await
            .unwrap();
        let after_terminal = ledger.claim_for_processing(id, Utc::now()).await.unwrap();
        assert!(after_terminal.is_none());
    }

    #[tokio::test]
    async fn test_claim_absent_job_is_none() {
        let ledger = InMemoryJobLedger::new();
        let claimed = ledger
            .claim_for_processing(Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn test_terminal_states_never_overwritten() {
        let ledger = InMemoryJobLedger::new();
        let tenant_id = Uuid::new_v4();
        let job = job_for(tenant_id, JobStatus::Processing);
        let id = job.id;
        ledger.insert(job).await.unwrap();

        ledger
            .mark_failed(id, "boom".to_string(), Utc::now())
            .await
            .unwrap();
        ledger
            .mark_sent(id, "smtp_x".to_string(), Utc::now())
            .await
            .unwrap();

        let job = ledger.find_for_tenant(id, tenant_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.sent_at.is_none());
        assert!(job.provider_message_id.is_none());
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_status_filter() {
        let ledger = InMemoryJobLedger::new();
        let tenant_id = Uuid::new_v4();

        let first = job_for(tenant_id, JobStatus::Failed);
        let second = job_for(tenant_id, JobStatus::Sent);
        let third = job_for(tenant_id, JobStatus::Failed);
        let (first_id, third_id) = (first.id, third.id);
        for job in [first, second, third] {
            ledger.insert(job).await.unwrap();
        }
        // Another tenant's failure must not leak in
        ledger
            .insert(job_for(Uuid::new_v4(), JobStatus::Failed))
            .await
            .unwrap();

        let failed = ledger
            .list(
                tenant_id,
                &ListJobsQuery {
                    status: Some(JobStatus::Failed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].id, third_id);
        assert_eq!(failed[1].id, first_id);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let ledger = InMemoryJobLedger::new();
        let tenant_id = Uuid::new_v4();
        for _ in 0..5 {
            ledger
                .insert(job_for(tenant_id, JobStatus::Queued))
                .await
                .unwrap();
        }

        let page = ledger
            .list(
                tenant_id,
                &ListJobsQuery {
                    status: None,
                    limit: Some(2),
                    offset: Some(4),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_cross_tenant_fetch_is_absent() {
        let ledger = InMemoryJobLedger::new();
        let job = job_for(Uuid::new_v4(), JobStatus::Queued);
        let id = job.id;
        ledger.insert(job).await.unwrap();

        assert!(ledger
            .find_for_tenant(id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_recoverable_excludes_scheduled_and_terminal() {
        let ledger = InMemoryJobLedger::new();
        let tenant_id = Uuid::new_v4();

        let enqueued = job_for(tenant_id, JobStatus::Queued);
        let interrupted = job_for(tenant_id, JobStatus::Processing);
        let mut scheduled = job_for(tenant_id, JobStatus::Queued);
        scheduled.queued_at = None;
        scheduled.send_immediately = false;
        let done = job_for(tenant_id, JobStatus::Sent);

        let expected = vec![enqueued.id, interrupted.id];
        for job in [enqueued, interrupted, scheduled, done] {
            ledger.insert(job).await.unwrap();
        }

        let recoverable = ledger.list_recoverable().await.unwrap();
        assert_eq!(recoverable, expected);
    }
}
