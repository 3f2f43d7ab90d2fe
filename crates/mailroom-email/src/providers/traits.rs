//! Email provider trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::EmailError;
use crate::job::EmailJob;

/// Supported delivery transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Simulated transport for development and testing
    Smtp,
    /// SendGrid transactional API
    Sendgrid,
    /// Amazon Simple Email Service
    AwsSes,
    /// Postmark transactional API
    Postmark,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Smtp
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Smtp => write!(f, "smtp"),
            ProviderKind::Sendgrid => write!(f, "sendgrid"),
            ProviderKind::AwsSes => write!(f, "aws_ses"),
            ProviderKind::Postmark => write!(f, "postmark"),
        }
    }
}

/// Receipt returned by a transport after a successful delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Provider's message id
    pub message_id: String,
}

/// Delivery transport abstraction
///
/// One implementation per transport; the worker only sees this trait,
/// so adding a transport never touches the worker or ingestion.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Attempt delivery of a job, returning the provider's message id
    async fn deliver(&self, job: &EmailJob) -> Result<DeliveryReceipt, EmailError>;

    /// The transport this adapter implements
    fn kind(&self) -> ProviderKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display_matches_serde() {
        assert_eq!(ProviderKind::AwsSes.to_string(), "aws_ses");
        assert_eq!(
            serde_json::to_string(&ProviderKind::AwsSes).unwrap(),
            "\"aws_ses\""
        );
    }

    #[test]
    fn test_default_is_smtp() {
        assert_eq!(ProviderKind::default(), ProviderKind::Smtp);
    }
}
