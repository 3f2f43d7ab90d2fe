//! API key lifecycle and authentication

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use mailroom_core::UtcDateTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::{CredentialStore, TenantStore};
use crate::types::{ApiKey, AuthError, AuthPrincipal, KEY_PREFIX};

// Response DTOs
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "mk_4xKpQ")]
    pub key_prefix: String,
    #[schema(example = json!(["email:send", "email:read"]))]
    pub permissions: Vec<String>,
    pub is_active: bool,
    #[schema(value_type = Option<String>, format = "date-time", example = "2024-01-01T00:00:00Z")]
    pub last_used_at: Option<UtcDateTime>,
    #[schema(value_type = String, format = "date-time", example = "2024-01-01T00:00:00Z")]
    pub created_at: UtcDateTime,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            permissions: key.permissions,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    /// The plaintext secret. Only returned on creation; it is never
    /// recoverable afterwards.
    pub api_key: String,
    #[schema(example = "Store this key securely - it won't be shown again")]
    pub message: String,
    #[schema(value_type = String, format = "date-time", example = "2024-01-01T00:00:00Z")]
    pub created_at: UtcDateTime,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyListResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: u64,
}

// Request DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    #[schema(example = "production-backend")]
    pub name: String,
}

const DEFAULT_PERMISSIONS: [&str; 2] = ["email:send", "email:read"];

pub struct ApiKeyService {
    credentials: Arc<dyn CredentialStore>,
    tenants: Arc<dyn TenantStore>,
}

impl ApiKeyService {
    pub fn new(credentials: Arc<dyn CredentialStore>, tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            credentials,
            tenants,
        }
    }

    /// Create a new API key for a tenant. The plaintext secret appears
    /// only in the returned response.
    pub async fn create_api_key(
        &self,
        tenant_id: Uuid,
        request: CreateApiKeyRequest,
    ) -> Result<CreateApiKeyResponse, AuthError> {
        if request.name.trim().is_empty() {
            return Err(AuthError::Validation(
                "API key name cannot be empty".to_string(),
            ));
        }

        let secret = generate_secret();
        let now = Utc::now();

        let key = ApiKey {
            id: Uuid::new_v4(),
            tenant_id,
            name: request.name,
            key_hash: hash_secret(&secret),
            key_prefix: secret.chars().take(8).collect(),
            permissions: DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
            is_active: true,
            last_used_at: None,
            created_at: now,
        };

        let response = CreateApiKeyResponse {
            id: key.id,
            name: key.name.clone(),
            api_key: secret,
            message: "Store this key securely - it won't be shown again".to_string(),
            created_at: now,
        };

        self.credentials.insert(key).await?;
        Ok(response)
    }

    /// List a tenant's active API keys. Neither the secret nor its
    /// digest ever leaves the store.
    pub async fn list_api_keys(&self, tenant_id: Uuid) -> Result<ApiKeyListResponse, AuthError> {
        let keys = self.credentials.list_active(tenant_id).await?;
        let total = keys.len() as u64;
        Ok(ApiKeyListResponse {
            api_keys: keys.into_iter().map(ApiKeyResponse::from).collect(),
            total,
        })
    }

    /// Revoke an API key (soft delete). 404s for unknown ids and ids
    /// owned by other tenants alike.
    pub async fn revoke_api_key(&self, tenant_id: Uuid, key_id: Uuid) -> Result<(), AuthError> {
        if self.credentials.deactivate(key_id, tenant_id).await? {
            Ok(())
        } else {
            Err(AuthError::NotFound("API key not found".to_string()))
        }
    }

    /// Authenticate a bearer secret and return the bound principal.
    ///
    /// Absence and inactivity both map to `Unauthenticated` so the
    /// response leaks nothing about which records exist.
    pub async fn authenticate(&self, token: &str) -> Result<AuthPrincipal, AuthError> {
        if !token.starts_with(KEY_PREFIX) {
            return Err(AuthError::Unauthenticated);
        }

        let key = self
            .credentials
            .find_active_by_hash(&hash_secret(token))
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let tenant = self
            .tenants
            .find_active(key.tenant_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        // Best-effort side effect, the auth decision stands regardless
        if let Err(e) = self.credentials.touch_last_used(key.id).await {
            warn!("Failed to update last_used_at for key {}: {}", key.id, e);
        }

        Ok(AuthPrincipal {
            api_key: key,
            tenant,
        })
    }
}

fn generate_secret() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..43)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("{}{}", KEY_PREFIX, random_part)
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
