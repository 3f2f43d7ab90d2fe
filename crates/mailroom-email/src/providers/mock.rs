//! Mock email provider for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::EmailError;
use crate::job::EmailJob;
use crate::providers::{DeliveryReceipt, EmailProvider, ProviderKind};

/// Mock provider with call counting and configurable failure.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub deliver_count: Arc<AtomicUsize>,
    pub should_fail: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            deliver_count: Arc::new(AtomicUsize::new(0)),
            should_fail: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn deliver_call_count(&self) -> usize {
        self.deliver_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn deliver(&self, _job: &EmailJob) -> Result<DeliveryReceipt, EmailError> {
        self.deliver_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(EmailError::ProviderError(
                "Mock delivery failure".to_string(),
            ));
        }

        Ok(DeliveryReceipt {
            message_id: format!("mock_{}", Uuid::new_v4()),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Smtp
    }
}
