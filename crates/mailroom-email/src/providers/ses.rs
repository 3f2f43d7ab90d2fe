//! Amazon SES transport stub

use async_trait::async_trait;

use crate::errors::EmailError;
use crate::job::EmailJob;
use crate::providers::{DeliveryReceipt, EmailProvider, ProviderKind};

/// Declared transport boundary for AWS SES. Delivery fails with
/// NotSupported until credentials are wired in.
#[derive(Debug, Default)]
pub struct SesProvider;

impl SesProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailProvider for SesProvider {
    async fn deliver(&self, _job: &EmailJob) -> Result<DeliveryReceipt, EmailError> {
        Err(EmailError::NotSupported(
            "AWS SES integration requires credentials".to_string(),
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::AwsSes
    }
}
