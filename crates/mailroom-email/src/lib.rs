//! Asynchronous transactional email pipeline
//!
//! Ingestion validates and admits send requests, persists them to the
//! job ledger with status `queued`, and hands the job id to the
//! dispatch queue. A single delivery worker drains the queue, claims
//! each job, invokes the selected provider transport, and records the
//! terminal outcome (`sent` or `failed`) on the ledger.

pub mod errors;
pub mod handlers;
pub mod job;
pub mod ledger;
pub mod providers;
pub mod services;
pub mod worker;

pub use errors::EmailError;
pub use handlers::AppState;
pub use job::{Attachment, EmailJob, JobStatus, Recipient, RecipientKind};
pub use ledger::{InMemoryJobLedger, JobLedger, ListJobsQuery, StatusCounts};
pub use providers::{
    DeliveryReceipt, EmailProvider, ProviderKind, ProviderRegistry, SmtpProvider,
};
pub use services::{EmailService, SendEmailRequest, SendEmailResponse};
pub use worker::DeliveryWorker;
