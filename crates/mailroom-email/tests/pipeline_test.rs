//! End-to-end pipeline tests: ingestion, dispatch, delivery, read-back

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use mailroom_auth::{ApiKey, AuthPrincipal, InMemoryTenantStore, Tenant, TenantStore};
use mailroom_core::{AppSettings, JobId};
use mailroom_email::{
    DeliveryWorker, EmailService, InMemoryJobLedger, JobLedger, JobStatus, ListJobsQuery,
    ProviderKind, ProviderRegistry, Recipient, RecipientKind, SendEmailRequest,
};
use mailroom_queue::MpscDispatchQueue;

struct Pipeline {
    ledger: Arc<InMemoryJobLedger>,
    tenants: Arc<InMemoryTenantStore>,
    service: EmailService,
    worker: DeliveryWorker,
    queue: MpscDispatchQueue,
    receiver: Option<mailroom_queue::MpscDispatchReceiver>,
}

async fn pipeline_with_quota(quota_limit: u64) -> (Pipeline, AuthPrincipal) {
    let ledger = Arc::new(InMemoryJobLedger::new());
    let tenants = Arc::new(InMemoryTenantStore::new());
    let (queue, receiver) = MpscDispatchQueue::create_channel(64);

    let tenant = Tenant::new("acme", quota_limit);
    tenants.insert(tenant.clone()).await.unwrap();

    let principal = AuthPrincipal {
        api_key: ApiKey {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "test key".to_string(),
            key_hash: "irrelevant".to_string(),
            key_prefix: "mk_test".to_string(),
            permissions: vec!["emails:send".to_string()],
            is_active: true,
            last_used_at: None,
            created_at: Utc::now(),
        },
        tenant,
    };

    let service = EmailService::new(ledger.clone(), tenants.clone(), Arc::new(queue.clone()));
    let worker = DeliveryWorker::new(
        ledger.clone(),
        Arc::new(ProviderRegistry::with_defaults()),
        &AppSettings::default(),
    );

    (
        Pipeline {
            ledger,
            tenants,
            service,
            worker,
            queue,
            receiver: Some(receiver),
        },
        principal,
    )
}

fn send_request(provider: ProviderKind) -> SendEmailRequest {
    SendEmailRequest {
        from_email: "noreply@example.com".to_string(),
        from_name: Some("Acme".to_string()),
        to: vec![Recipient {
            email: "jane@example.com".to_string(),
            name: Some("Jane Doe".to_string()),
            kind: RecipientKind::To,
        }],
        cc: vec![],
        bcc: vec![],
        subject: "Welcome".to_string(),
        html_content: Some("<p>Hello Jane</p>".to_string()),
        text_content: None,
        attachments: vec![],
        template_id: None,
        template_variables: HashMap::new(),
        provider,
        tags: vec!["onboarding".to_string()],
        metadata: HashMap::new(),
        send_immediately: true,
        scheduled_at: None,
    }
}

async fn wait_until_terminal(
    ledger: &InMemoryJobLedger,
    id: JobId,
    tenant_id: Uuid,
) -> mailroom_email::EmailJob {
    for _ in 0..200 {
        if let Some(job) = ledger.find_for_tenant(id, tenant_id).await.unwrap() {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal status", id);
}

#[tokio::test]
async fn test_valid_send_reaches_sent() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;
    let receiver = pipeline.receiver.take().unwrap();
    tokio::spawn(pipeline.worker.run(Box::new(receiver)));

    let accepted = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Smtp))
        .await
        .unwrap();
    assert_eq!(accepted.status, JobStatus::Queued);

    let job = wait_until_terminal(&pipeline.ledger, accepted.id, principal.tenant_id()).await;
    assert_eq!(job.status, JobStatus::Sent);
    assert!(job.provider_message_id.unwrap().starts_with("smtp_"));
    assert!(job.error_message.is_none());
    assert!(job.sent_at.unwrap() >= job.queued_at.unwrap());
    assert!(job.processing_started_at.is_some());
}

#[tokio::test]
async fn test_unconfigured_provider_fails_job() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;
    let receiver = pipeline.receiver.take().unwrap();
    tokio::spawn(pipeline.worker.run(Box::new(receiver)));

    let accepted = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Sendgrid))
        .await
        .unwrap();

    let job = wait_until_terminal(&pipeline.ledger, accepted.id, principal.tenant_id()).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.provider_message_id.is_none());
    assert!(job.error_message.unwrap().contains("SendGrid"));
    assert!(job.failed_at.is_some());
}

#[tokio::test]
async fn test_invalid_request_leaves_no_trace() {
    let (pipeline, principal) = pipeline_with_quota(100).await;

    let mut request = send_request(ProviderKind::Smtp);
    request.to.clear();

    let result = pipeline.service.ingest(&principal, request).await;
    assert!(result.is_err());

    let jobs = pipeline
        .service
        .list_jobs(&principal, ListJobsQuery::default())
        .await
        .unwrap();
    assert!(jobs.is_empty());

    // Rejection happened before quota admission
    let tenant = pipeline
        .tenants
        .find_active(principal.tenant_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tenant.used_this_period, 0);
}

#[tokio::test]
async fn test_repeated_fetch_is_identical_before_processing() {
    // No worker is running, so the job stays exactly as ingested
    let (pipeline, principal) = pipeline_with_quota(100).await;

    let accepted = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Smtp))
        .await
        .unwrap();

    let first = pipeline
        .service
        .get_job(&principal, accepted.id)
        .await
        .unwrap();
    let second = pipeline
        .service
        .get_job(&principal, accepted.id)
        .await
        .unwrap();

    assert_eq!(first.status, JobStatus::Queued);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap(),
    );
}

#[tokio::test]
async fn test_quota_boundary_admits_exactly_one() {
    let (pipeline, principal) = pipeline_with_quota(1).await;

    let (first, second) = tokio::join!(
        pipeline
            .service
            .ingest(&principal, send_request(ProviderKind::Smtp)),
        pipeline
            .service
            .ingest(&principal, send_request(ProviderKind::Smtp)),
    );

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let jobs = pipeline
        .service
        .list_jobs(&principal, ListJobsQuery::default())
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);

    let tenant = pipeline
        .tenants
        .find_active(principal.tenant_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tenant.used_this_period, 1);
}

#[tokio::test]
async fn test_list_filters_by_status_newest_first() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;
    let receiver = pipeline.receiver.take().unwrap();
    tokio::spawn(pipeline.worker.run(Box::new(receiver)));

    // One success between two failures
    let first_failed = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Sendgrid))
        .await
        .unwrap();
    let sent = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Smtp))
        .await
        .unwrap();
    let second_failed = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::AwsSes))
        .await
        .unwrap();

    for id in [first_failed.id, sent.id, second_failed.id] {
        wait_until_terminal(&pipeline.ledger, id, principal.tenant_id()).await;
    }

    let failed = pipeline
        .service
        .list_jobs(
            &principal,
            ListJobsQuery {
                status: Some(JobStatus::Failed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].id, second_failed.id);
    assert_eq!(failed[1].id, first_failed.id);
}

#[tokio::test]
async fn test_reconcile_completes_interrupted_jobs() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;

    // Accepted before a simulated restart: the queue contents are gone
    // but the ledger records survive
    let orphaned = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Smtp))
        .await
        .unwrap();
    let receiver = pipeline.receiver.take().unwrap();
    drop(receiver);

    let (queue, fresh_receiver) = MpscDispatchQueue::create_channel(64);
    let count = pipeline.worker.reconcile(&queue).await.unwrap();
    assert_eq!(count, 1);

    tokio::spawn(pipeline.worker.run(Box::new(fresh_receiver)));
    drop(queue);

    let job = wait_until_terminal(&pipeline.ledger, orphaned.id, principal.tenant_id()).await;
    assert_eq!(job.status, JobStatus::Sent);
}

#[tokio::test]
async fn test_deleted_job_is_dropped_silently() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;

    let accepted = pipeline
        .service
        .ingest(&principal, send_request(ProviderKind::Smtp))
        .await
        .unwrap();

    // Deleted externally after enqueue, before the worker picks it up
    pipeline.ledger.remove(accepted.id).await;

    let receiver = pipeline.receiver.take().unwrap();
    let worker = pipeline.worker;
    let handle = tokio::spawn(worker.run(Box::new(receiver)));

    // Closing the sender ends the loop once the queue drains
    drop(pipeline.queue);
    drop(pipeline.service);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop when the queue closes")
        .unwrap();

    assert!(pipeline
        .ledger
        .find_for_tenant(accepted.id, principal.tenant_id())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_scheduled_send_is_persisted_but_not_dispatched() {
    let (mut pipeline, principal) = pipeline_with_quota(100).await;

    let mut request = send_request(ProviderKind::Smtp);
    request.send_immediately = false;
    request.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));

    let accepted = pipeline.service.ingest(&principal, request).await.unwrap();

    let job = pipeline
        .service
        .get_job(&principal, accepted.id)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.queued_at.is_none());
    assert!(job.scheduled_at.is_some());

    // Nothing was placed on the dispatch queue
    let mut receiver = pipeline.receiver.take().unwrap();
    drop(pipeline.queue);
    drop(pipeline.service);
    assert!(mailroom_core::DispatchReceiver::recv(&mut receiver)
        .await
        .is_err());
}
