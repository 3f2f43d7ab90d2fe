//! Delivery worker: the single consumer of the dispatch queue

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use mailroom_core::{AppSettings, DispatchQueue, DispatchReceiver, JobId, QueueError};

use crate::errors::EmailError;
use crate::job::EmailJob;
use crate::ledger::JobLedger;
use crate::providers::{DeliveryReceipt, ProviderRegistry};

/// Drains the dispatch queue and drives each job through
/// Processing to a terminal Sent or Failed.
pub struct DeliveryWorker {
    ledger: Arc<dyn JobLedger>,
    providers: Arc<ProviderRegistry>,
    queue_wait: Duration,
    provider_timeout: Duration,
    backoff: Duration,
}

impl DeliveryWorker {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        providers: Arc<ProviderRegistry>,
        settings: &AppSettings,
    ) -> Self {
        Self {
            ledger,
            providers,
            queue_wait: Duration::from_secs(settings.queue_wait_secs),
            provider_timeout: Duration::from_secs(settings.provider_timeout_secs),
            backoff: Duration::from_secs(settings.worker_backoff_secs),
        }
    }

    /// Restart recovery: the queue is in-memory, so ids in flight are
    /// lost with the process. Re-enqueue every non-terminal job the
    /// ledger still holds before the loop starts consuming.
    pub async fn reconcile(&self, queue: &dyn DispatchQueue) -> Result<usize, EmailError> {
        let ids = self.ledger.list_recoverable().await?;
        let count = ids.len();

        for id in ids {
            queue.enqueue(id).await?;
        }

        if count > 0 {
            info!("Reconciled {} interrupted job(s) back onto the queue", count);
        }
        Ok(count)
    }

    /// Non-terminating consumer loop.
    ///
    /// The queue wait is bounded so the task stays responsive without
    /// a dedicated cancellation signal; a failure handling one item is
    /// logged and followed by a fixed backoff, never a crash.
    pub async fn run(self, mut receiver: Box<dyn DispatchReceiver>) {
        info!(
            "Delivery worker started (queue wait {:?}, provider timeout {:?})",
            self.queue_wait, self.provider_timeout
        );

        loop {
            let job_id = match timeout(self.queue_wait, receiver.recv()).await {
                Err(_elapsed) => continue,
                Ok(Err(QueueError::ChannelClosed)) => {
                    info!("Dispatch queue closed, delivery worker stopping");
                    return;
                }
                Ok(Err(e)) => {
                    error!("Error receiving from dispatch queue: {}", e);
                    tokio::time::sleep(self.backoff).await;
                    continue;
                }
                Ok(Ok(job_id)) => job_id,
            };

            if let Err(e) = self.process(job_id).await {
                error!("Error processing job {}: {}", job_id, e);
                tokio::time::sleep(self.backoff).await;
            }
        }
    }

    /// Handle one dequeued id. Unclaimable ids (deleted jobs, jobs
    /// already terminal) are dropped without an error.
    pub async fn process(&self, job_id: JobId) -> Result<(), EmailError> {
        let Some(job) = self.ledger.claim_for_processing(job_id, Utc::now()).await? else {
            debug!("Dropping job id {}: not claimable", job_id);
            return Ok(());
        };

        match self.deliver(&job).await {
            Ok(receipt) => {
                info!(
                    "Job {} sent via {} (message id {})",
                    job.id, job.provider, receipt.message_id
                );
                self.ledger
                    .mark_sent(job.id, receipt.message_id, Utc::now())
                    .await
            }
            Err(e) => {
                warn!("Job {} failed: {}", job.id, e);
                self.ledger
                    .mark_failed(job.id, e.to_string(), Utc::now())
                    .await
            }
        }
    }

    /// Resolve the transport and attempt delivery, bounded by the
    /// provider timeout. A hung transport becomes a delivery failure
    /// instead of wedging the loop.
    async fn deliver(&self, job: &EmailJob) -> Result<DeliveryReceipt, EmailError> {
        let provider = self
            .providers
            .get(job.provider)
            .ok_or_else(|| EmailError::UnsupportedProvider(job.provider.to_string()))?;

        match timeout(self.provider_timeout, provider.deliver(job)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(EmailError::ProviderTimeout {
                seconds: self.provider_timeout.as_secs(),
            }),
        }
    }
}
