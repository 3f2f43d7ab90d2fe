//! Simulated SMTP transport for development and testing

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::EmailError;
use crate::job::EmailJob;
use crate::providers::{DeliveryReceipt, EmailProvider, ProviderKind};

const SIMULATED_LATENCY: Duration = Duration::from_millis(100);

/// Development transport: always succeeds after a short simulated
/// network delay and fabricates a message id.
#[derive(Debug, Default)]
pub struct SmtpProvider;

impl SmtpProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn deliver(&self, _job: &EmailJob) -> Result<DeliveryReceipt, EmailError> {
        tokio::time::sleep(SIMULATED_LATENCY).await;

        Ok(DeliveryReceipt {
            message_id: format!("smtp_{}", Uuid::new_v4()),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Smtp
    }
}
