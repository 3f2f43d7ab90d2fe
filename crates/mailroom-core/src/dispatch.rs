//! Core dispatch queue abstraction - mailroom-queue implements this
//!
//! The queue hands off job identifiers only. The ledger is the source
//! of truth for job state; consumers re-read the job by id after
//! receiving it.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::JobId;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to enqueue job: {0}")]
    SendError(String),
    #[error("Failed to receive job: {0}")]
    ReceiveError(String),
    #[error("Queue channel closed")]
    ChannelClosed,
}

/// Core trait for dispatch queue operations
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// Push a job id onto the queue
    async fn enqueue(&self, job_id: JobId) -> Result<(), QueueError>;
}

/// Core trait for draining the dispatch queue
#[async_trait]
pub trait DispatchReceiver: Send {
    /// Receive the next job id
    async fn recv(&mut self) -> Result<JobId, QueueError>;
}
