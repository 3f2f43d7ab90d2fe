//! Implementation of the dispatch queue using tokio channels
//! This crate implements the DispatchQueue trait from mailroom-core
//! using a bounded mpsc channel: FIFO hand-off of job ids from
//! ingestion to the single delivery worker.

pub mod queue;

pub use queue::*;

// Re-export core traits for convenience
pub use mailroom_core::{DispatchQueue, DispatchReceiver, QueueError};
