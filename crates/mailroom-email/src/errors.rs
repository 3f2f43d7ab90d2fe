//! Error types for the email pipeline

use thiserror::Error;

use mailroom_auth::AuthError;
use mailroom_core::problemdetails::Problem;
use mailroom_core::QueueError;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Email not found: {0}")]
    JobNotFound(String),

    #[error("Unsupported email provider: {0}")]
    UnsupportedProvider(String),

    /// Transport declared but not configured with real credentials
    #[error("Provider not supported: {0}")]
    NotSupported(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider call timed out after {seconds}s")]
    ProviderTimeout { seconds: u64 },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl EmailError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EmailError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map pipeline errors to the synchronous HTTP error contract.
    /// Provider failures never appear here: they surface out-of-band
    /// on the job record, not as responses.
    pub fn to_problem(&self) -> Problem {
        match self {
            EmailError::Validation { field, message } => {
                mailroom_core::error_builder::unprocessable_entity()
                    .detail(message.clone())
                    .value("field", field.clone())
                    .build()
            }
            EmailError::JobNotFound(msg) => mailroom_core::error_builder::not_found()
                .detail(msg.clone())
                .build(),
            EmailError::Auth(auth) => auth.to_problem(),
            _ => mailroom_core::error_builder::internal_server_error().build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_422() {
        let problem = EmailError::validation("recipients", "at least one recipient is required")
            .to_problem();
        assert_eq!(problem.status_code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.body.get("field").unwrap(), "recipients");
    }

    #[test]
    fn test_quota_maps_to_429() {
        let problem = EmailError::Auth(AuthError::QuotaExceeded { limit: 100 }).to_problem();
        assert_eq!(problem.status_code, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_queue_failure_is_opaque_500() {
        let problem = EmailError::Queue(QueueError::ChannelClosed).to_problem();
        assert_eq!(problem.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        // No implementation detail leaks to the caller
        assert!(!problem
            .body
            .get("detail")
            .unwrap()
            .to_string()
            .contains("channel"));
    }
}
