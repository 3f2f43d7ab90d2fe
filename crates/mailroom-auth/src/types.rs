//! Credential and tenant models

use axum::http::StatusCode;
use mailroom_core::error_builder::ErrorBuilder;
use mailroom_core::problemdetails::Problem;
use mailroom_core::UtcDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Fixed, recognizable prefix every API-key secret carries.
pub const KEY_PREFIX: &str = "mk_";

/// An API key bound to a tenant. The plaintext secret is never stored;
/// `key_hash` holds its SHA-256 hex digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub key_hash: String,
    /// First characters of the secret, kept for display purposes only
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_used_at: Option<UtcDateTime>,
    pub created_at: UtcDateTime,
}

/// A tenant of the platform with its monthly send allowance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Monthly email quota
    pub quota_limit: u64,
    /// Emails admitted this period; reset is handled externally
    pub used_this_period: u64,
    pub created_at: UtcDateTime,
}

impl Tenant {
    pub fn new(name: impl Into<String>, quota_limit: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_active: true,
            quota_limit,
            used_this_period: 0,
            created_at: chrono::Utc::now(),
        }
    }
}

/// The principal bound to a request after successful authentication.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub api_key: ApiKey,
    pub tenant: Tenant,
}

impl AuthPrincipal {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn api_key_id(&self) -> Uuid {
        self.api_key.id
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing, malformed, unknown or inactive credential. One variant
    /// on purpose: the response must not reveal which.
    #[error("Invalid or inactive API key")]
    Unauthenticated,

    #[error("Email quota exceeded. Current limit: {limit}")]
    QuotaExceeded { limit: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn to_problem(&self) -> Problem {
        match self {
            AuthError::Unauthenticated => ErrorBuilder::new(StatusCode::UNAUTHORIZED)
                .type_("https://mailroom.sh/probs/unauthorized")
                .title("Unauthorized")
                .detail(self.to_string())
                .value("error_code", "UNAUTHORIZED")
                .build(),
            AuthError::QuotaExceeded { .. } => {
                mailroom_core::error_builder::quota_exceeded()
                    .detail(self.to_string())
                    .build()
            }
            AuthError::NotFound(msg) => mailroom_core::error_builder::not_found()
                .detail(msg.clone())
                .build(),
            AuthError::Validation(msg) => ErrorBuilder::new(StatusCode::BAD_REQUEST)
                .type_("https://mailroom.sh/probs/validation-error")
                .title("Validation Error")
                .detail(msg.clone())
                .value("error_code", "VALIDATION_ERROR")
                .build(),
            AuthError::Store(_) => mailroom_core::error_builder::internal_server_error().build(),
        }
    }
}
