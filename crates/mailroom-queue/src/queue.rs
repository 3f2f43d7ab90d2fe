use mailroom_core::async_trait::async_trait;
use mailroom_core::{DispatchQueue, DispatchReceiver, JobId, QueueError};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Bounded FIFO dispatch queue backed by a tokio mpsc channel.
///
/// The queue is not persisted; ids in flight are lost on restart. The
/// worker's startup reconciliation re-derives them from the ledger,
/// which stays the source of truth for job state.
#[derive(Clone)]
pub struct MpscDispatchQueue {
    job_sender: mpsc::Sender<JobId>,
}

/// Wrapper for mpsc::Receiver to implement the DispatchReceiver trait
pub struct MpscDispatchReceiver {
    receiver: mpsc::Receiver<JobId>,
}

#[async_trait]
impl DispatchReceiver for MpscDispatchReceiver {
    async fn recv(&mut self) -> Result<JobId, QueueError> {
        debug!("DispatchReceiver::recv - waiting for job id");

        let job_id = self.receiver.recv().await.ok_or_else(|| {
            error!("Dispatch channel closed");
            QueueError::ChannelClosed
        })?;

        debug!("Received job id {}", job_id);
        Ok(job_id)
    }
}

#[async_trait]
impl DispatchQueue for MpscDispatchQueue {
    async fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        debug!("DispatchQueue::enqueue - pushing job id {}", job_id);

        self.job_sender.send(job_id).await.map_err(|e| {
            error!("Failed to enqueue job {}: {}", job_id, e);
            QueueError::SendError(e.to_string())
        })
    }
}

impl MpscDispatchQueue {
    pub fn new(job_sender: mpsc::Sender<JobId>) -> Self {
        Self { job_sender }
    }

    /// Create a queue/receiver pair. The receiver side belongs to the
    /// single delivery worker.
    pub fn create_channel(buffer_size: usize) -> (MpscDispatchQueue, MpscDispatchReceiver) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (
            MpscDispatchQueue::new(sender),
            MpscDispatchReceiver { receiver },
        )
    }
}
