//! SendGrid transport stub

use async_trait::async_trait;

use crate::errors::EmailError;
use crate::job::EmailJob;
use crate::providers::{DeliveryReceipt, EmailProvider, ProviderKind};

/// Declared transport boundary for SendGrid. Delivery fails with
/// NotSupported until an API key is wired in.
#[derive(Debug, Default)]
pub struct SendgridProvider;

impl SendgridProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailProvider for SendgridProvider {
    async fn deliver(&self, _job: &EmailJob) -> Result<DeliveryReceipt, EmailError> {
        Err(EmailError::NotSupported(
            "SendGrid integration requires an API key".to_string(),
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Sendgrid
    }
}
